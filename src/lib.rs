//! Mirrorator: a dependency-closure package mirror
//!
//! This crate mirrors the part of a package repository reachable from a seed
//! list of package names. For every package it reads the upstream "simple"
//! listing, downloads the source archives, scans them for declared
//! dependencies and follows those until the whole closure is mirrored. A
//! static "simple" index tree is written alongside the archives so the
//! mirror can be served in place of the upstream repository.

pub mod archive;
pub mod config;
pub mod crawler;
pub mod names;
pub mod output;
pub mod requirements;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Mirrorator operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Listing fetch failed for package {package}: HTTP {status}")]
    ListingFetchFailed { package: String, status: u16 },

    #[error("Archive fetch failed for {url}: {reason}")]
    ArchiveFetchFailed { url: String, reason: String },

    #[error("Unsupported archive format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to extract {}: {message}", path.display())]
    ExtractionFailed { path: PathBuf, message: String },

    #[error("Failed to parse declaration file {file}: {message}")]
    DeclarationParseFailed { file: String, message: String },

    #[error("Cannot read seed list {}: {source}", path.display())]
    SeedInputMissing {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Package alias index unavailable: {message}")]
    AliasSourceUnavailable { message: String },

    #[error("Deadline exceeded while processing package {package}")]
    DeadlineExceeded { package: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Refusing to write outside the mirror root: {path}")]
    UnsafePath { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Mirrorator operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Mirrorator;
pub use names::{normalize, AliasTable};
