//! Crawler module for dependency-closure mirroring
//!
//! This module contains the core mirroring logic, including:
//! - Listing retrieval and archive link filtering
//! - Archive downloads with per-package deadlines
//! - The breadth-first package frontier
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod listing;

pub use coordinator::Mirrorator;
pub use fetcher::{
    archive_url, build_http_client, fetch_archive, fetch_listing, listing_url, ArchiveFetch, Listing, PackageBudget,
};
pub use frontier::Frontier;
pub use listing::{
    extract_hrefs, filter_archive_links, is_contained, parse_listing, ArchiveLink, LOCAL_PACKAGE_PREFIX,
};

use crate::config::{load_seeds, Config};
use crate::names::prepare_aliases;
use crate::output::MirrorStatistics;
use crate::MirrorError;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Runs a complete mirror operation
///
/// This is the main entry point for a mirror run. It will:
/// 1. Read the seed package list
/// 2. Build the HTTP client
/// 3. Refresh (or reuse) the package alias index
/// 4. Crawl the dependency closure of the seeds
/// 5. Write the global indexes and the requirement report
///
/// # Arguments
///
/// * `config` - The mirror configuration
/// * `cancel` - Stops the crawl between packages and aborts in-flight fetches
///
/// # Returns
///
/// * `Ok(MirrorStatistics)` - Crawl finished (possibly cancelled part-way)
/// * `Err(MirrorError)` - Seeds or aliases unavailable, or the mirror root is unwritable
pub async fn run_mirror(config: Config, cancel: CancellationToken) -> Result<MirrorStatistics, MirrorError> {
    let seeds = load_seeds(Path::new(&config.mirror.packages_file))?;
    tracing::info!("Loaded {} seed packages from {}", seeds.len(), config.mirror.packages_file);

    let client = build_http_client(&config.http).map_err(|source| MirrorError::Http {
        url: config.upstream.host.clone(),
        source,
    })?;

    let aliases = prepare_aliases(&client, &config).await?;
    tracing::info!("Loaded {} package aliases", aliases.len());

    let mut mirrorator = Mirrorator::with_client(config, client, aliases, seeds).with_cancellation(cancel);
    mirrorator.run().await
}
