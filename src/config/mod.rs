//! Configuration module for Mirrorator
//!
//! This module handles loading, parsing, and validating the TOML
//! configuration file, and reading the seed package list.
//!
//! # Example
//!
//! ```no_run
//! use mirrorator::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirrorator.toml")).unwrap();
//! println!("Mirroring from {}", config.upstream.host);
//! ```

mod parser;
mod seeds;
mod types;
mod validation;

// Re-export types
pub use types::{AliasConfig, Config, HttpConfig, MirrorConfig, UpstreamConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use seeds::{load_seeds, parse_seeds};
