//! Crawler coordinator - main mirror orchestration logic
//!
//! This module contains the main crawl loop that coordinates:
//! - Draining the frontier one package at a time
//! - Resolving names through the alias table
//! - Fetching listings and archives
//! - Extracting requirements and queueing newly discovered packages
//! - Writing the index tree and the requirement report
//!
//! Failures are isolated to the smallest unit they affect. A failed
//! archive is skipped and the package continues; a failed package is logged
//! and the crawl continues. Only configuration-level problems stop a run.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_archive, fetch_listing, ArchiveFetch, Listing, PackageBudget};
use crate::crawler::frontier::Frontier;
use crate::names::AliasTable;
use crate::output::{write_requirement_report, IndexWriter, MirrorStatistics, RequirementTree};
use crate::requirements::{extract_requirements, RequirementSet};
use crate::MirrorError;
use reqwest::Client;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// What processing one package produced
#[derive(Debug)]
enum PackageOutcome {
    /// The upstream has no listing for the package
    Unavailable,

    /// The listing was mirrored; requirements of all its archives
    Mirrored(RequirementSet),
}

/// Dependency-closure mirror crawler
#[derive(Debug)]
pub struct Mirrorator {
    config: Config,
    client: Client,
    aliases: AliasTable,
    frontier: Frontier,
    writer: IndexWriter,
    requirement_tree: RequirementTree,
    stats: MirrorStatistics,
    cancel: CancellationToken,
}

impl Mirrorator {
    /// Creates a crawler with its own HTTP client
    ///
    /// # Arguments
    ///
    /// * `config` - The mirror configuration
    /// * `aliases` - Canonical package names, keyed by normalized name
    /// * `seeds` - Package names to start from, in queue order
    pub fn new(config: Config, aliases: AliasTable, seeds: Vec<String>) -> Result<Self, MirrorError> {
        let client = build_http_client(&config.http).map_err(|source| MirrorError::Http {
            url: config.upstream.host.clone(),
            source,
        })?;
        Ok(Self::with_client(config, client, aliases, seeds))
    }

    /// Creates a crawler that shares an existing HTTP client
    pub fn with_client(config: Config, client: Client, aliases: AliasTable, seeds: Vec<String>) -> Self {
        let writer = IndexWriter::new(&config.mirror.root);
        Self {
            config,
            client,
            aliases,
            frontier: Frontier::new(seeds),
            writer,
            requirement_tree: RequirementTree::new(),
            stats: MirrorStatistics::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` to stop the crawl from outside
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The crawl frontier
    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// The index writer and everything it has recorded
    pub fn writer(&self) -> &IndexWriter {
        &self.writer
    }

    /// Requirements discovered per package
    pub fn requirement_tree(&self) -> &RequirementTree {
        &self.requirement_tree
    }

    /// Statistics gathered so far
    pub fn statistics(&self) -> &MirrorStatistics {
        &self.stats
    }

    /// Runs the crawl until the frontier is empty
    ///
    /// The global indexes and the requirement report are written at the
    /// end even when the crawl was cancelled part-way, so the mirror is
    /// always left in a consistent, resumable state.
    pub async fn run(&mut self) -> Result<MirrorStatistics, MirrorError> {
        tracing::info!(
            "Mirroring {} seed packages into {}",
            self.frontier.pending(),
            self.writer.root().display()
        );
        let start_time = Instant::now();

        loop {
            if self.cancel.is_cancelled() {
                tracing::warn!("Crawl cancelled, {} packages left in queue", self.frontier.pending());
                break;
            }
            let Some(name) = self.frontier.next_unseen() else {
                break;
            };

            let package = self.aliases.resolve(&name).to_string();
            tracing::info!("Processing package {}", package);

            match self.process_package(&package).await {
                Ok(PackageOutcome::Unavailable) => {
                    tracing::warn!(" --- Package index unavailable: {}", package);
                    self.stats.packages_unavailable += 1;
                }
                Ok(PackageOutcome::Mirrored(requirements)) => {
                    self.stats.packages_processed += 1;
                    self.enqueue_requirements(&package, &requirements);
                }
                Err(MirrorError::Cancelled) => {
                    tracing::warn!("Crawl cancelled while processing {}", package);
                    self.stats.packages_failed += 1;
                    break;
                }
                Err(e) => {
                    tracing::error!("Failed processing package {}: {}", package, e);
                    self.stats.packages_failed += 1;
                }
            }
        }

        self.stats.packages_seen = self.frontier.seen().len() as u64;
        self.finalize()?;

        tracing::info!(
            "Mirror completed: {} packages mirrored, {} of {} archives downloaded in {:?}",
            self.stats.packages_processed,
            self.stats.archives_downloaded,
            self.stats.archives_total(),
            start_time.elapsed()
        );

        Ok(self.stats.clone())
    }

    /// Mirrors one package: listing, archives, requirements, package index
    async fn process_package(&mut self, package: &str) -> Result<PackageOutcome, MirrorError> {
        let budget = PackageBudget::new(
            package,
            Duration::from_secs(self.config.http.package_deadline_secs),
            self.cancel.clone(),
        );

        let listing = budget
            .run(fetch_listing(&self.client, &self.config.upstream, package))
            .await?;

        let (raw, links) = match listing {
            Listing::Unavailable => return Ok(PackageOutcome::Unavailable),
            Listing::Found { raw, links } => (raw, links),
        };

        self.writer.write_original_listing(package, &raw)?;
        tracing::debug!("{} archive links listed for {}", links.len(), package);

        let root = PathBuf::from(&self.config.mirror.root);
        let mut requirements = RequirementSet::new();

        for link in &links {
            let fetched = match budget
                .run(fetch_archive(&self.client, &self.config.upstream.host, &root, link))
                .await
            {
                Ok(fetched) => fetched,
                Err(e @ (MirrorError::Cancelled | MirrorError::DeadlineExceeded { .. })) => return Err(e),
                Err(e) => {
                    tracing::warn!("Failed fetching {}: {}", link.local_path(), e);
                    self.stats.archives_failed += 1;
                    continue;
                }
            };

            match &fetched {
                ArchiveFetch::AlreadyPresent(_) => self.stats.archives_present += 1,
                ArchiveFetch::Downloaded { bytes, .. } => {
                    self.stats.archives_downloaded += 1;
                    self.stats.bytes_downloaded += bytes;
                }
            }

            let path = fetched.path().to_path_buf();
            match read_requirements(path.clone()).await {
                Ok(found) => requirements.extend(found),
                Err(e) => {
                    tracing::warn!("Failed reading requirements from {}: {}", path.display(), e);
                    self.stats.extraction_failures += 1;
                }
            }
        }

        self.writer.write_package_index(package, &links)?;
        if !links.is_empty() {
            self.writer.write_global_indexes()?;
        }

        Ok(PackageOutcome::Mirrored(requirements))
    }

    /// Canonicalizes discovered requirements and queues the unseen ones
    fn enqueue_requirements(&mut self, package: &str, requirements: &RequirementSet) {
        let canonical: BTreeSet<String> = requirements
            .iter()
            .filter_map(|name| self.aliases.canonicalize(name))
            .collect();

        if canonical.is_empty() {
            return;
        }

        let queued = canonical
            .iter()
            .filter(|name| self.frontier.push(name))
            .count();
        tracing::info!(
            "Adding new requirements from {}: {} ({} new)",
            package,
            canonical.iter().cloned().collect::<Vec<_>>().join(", "),
            queued
        );

        self.requirement_tree.insert(package.to_string(), canonical);
    }

    /// Writes the repository-wide indexes and the requirement report
    fn finalize(&self) -> Result<(), MirrorError> {
        self.writer.write_global_indexes()?;
        tracing::info!(
            "Wrote global indexes: {} packages, {} archives",
            self.writer.packages().len(),
            self.writer.entries().len()
        );

        let report_path = Path::new(&self.config.mirror.report_path);
        write_requirement_report(&self.requirement_tree, report_path)?;
        tracing::info!("Wrote requirement tree to {}", report_path.display());

        Ok(())
    }
}

/// Extracts requirements off the async runtime
async fn read_requirements(path: PathBuf) -> Result<RequirementSet, MirrorError> {
    let error_path = path.clone();
    tokio::task::spawn_blocking(move || extract_requirements(&path))
        .await
        .map_err(|e| MirrorError::ExtractionFailed {
            path: error_path,
            message: e.to_string(),
        })?
}
