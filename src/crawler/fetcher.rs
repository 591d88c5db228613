//! HTTP fetcher implementation
//!
//! This module handles all network access of a crawl:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Fetching per-package listing pages
//! - Downloading archives into the mirror tree, skipping ones already present
//! - Bounding each package's network calls by a deadline and a
//!   cancellation token

use crate::config::{HttpConfig, UpstreamConfig};
use crate::crawler::listing::{is_contained, parse_listing, ArchiveLink};
use crate::MirrorError;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Result of fetching a package listing
#[derive(Debug)]
pub enum Listing {
    /// The upstream has no such package (HTTP 404)
    Unavailable,

    /// The listing page was retrieved
    Found {
        /// Unmodified response body
        raw: Vec<u8>,
        /// Filtered, rewritten and sorted archive links
        links: Vec<ArchiveLink>,
    },
}

/// Result of materializing one archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveFetch {
    /// The destination already existed; no request was made
    AlreadyPresent(PathBuf),

    /// The archive was downloaded
    Downloaded { path: PathBuf, bytes: u64 },
}

impl ArchiveFetch {
    /// Local path of the archive
    pub fn path(&self) -> &Path {
        match self {
            Self::AlreadyPresent(path) | Self::Downloaded { path, .. } => path,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use mirrorator::config::HttpConfig;
/// use mirrorator::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// URL of a package's listing page
pub fn listing_url(host: &str, package: &str) -> String {
    format!("{}/simple/{}/", host.trim_end_matches('/'), package)
}

/// URL of an archive on the upstream
pub fn archive_url(host: &str, link: &ArchiveLink) -> String {
    format!("{}/{}", host.trim_end_matches('/'), link.local_path())
}

/// Fetches and filters the listing page of one package
///
/// # Returns
///
/// * `Ok(Listing::Unavailable)` - The upstream answered 404
/// * `Ok(Listing::Found)` - The raw page and its eligible archive links
/// * `Err(MirrorError::ListingFetchFailed)` - Any other non-success status
/// * `Err(MirrorError::Http)` - The request itself failed
pub async fn fetch_listing(
    client: &Client,
    upstream: &UpstreamConfig,
    package: &str,
) -> Result<Listing, MirrorError> {
    let url = listing_url(&upstream.host, package);
    tracing::debug!("Fetching listing {}", url);

    let response = client.get(&url).send().await.map_err(|source| MirrorError::Http {
        url: url.clone(),
        source,
    })?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(Listing::Unavailable);
    }
    if !status.is_success() {
        return Err(MirrorError::ListingFetchFailed {
            package: package.to_string(),
            status: status.as_u16(),
        });
    }

    let raw = response
        .bytes()
        .await
        .map_err(|source| MirrorError::Http { url, source })?
        .to_vec();

    let links = parse_listing(&String::from_utf8_lossy(&raw), upstream);
    Ok(Listing::Found { raw, links })
}

/// Materializes an archive under the mirror root
///
/// If the destination already exists nothing is requested, whatever its
/// content. Otherwise the body is streamed into a `.part` sibling that is
/// renamed into place once the transfer has completed. The `.part` file is
/// removed if the transfer fails or the future is dropped mid-transfer.
pub async fn fetch_archive(
    client: &Client,
    host: &str,
    root: &Path,
    link: &ArchiveLink,
) -> Result<ArchiveFetch, MirrorError> {
    if !is_contained(link.local_path()) {
        return Err(MirrorError::UnsafePath {
            path: link.local_path().to_string(),
        });
    }

    let dest = root.join(link.local_path());
    if tokio::fs::try_exists(&dest).await? {
        tracing::info!("Skipping download of {}", link.local_path());
        return Ok(ArchiveFetch::AlreadyPresent(dest));
    }

    let url = archive_url(host, link);
    tracing::info!("Downloading {} -> {}", url, dest.display());

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let partial = PartialFile::new(partial_path(&dest));
    let bytes = download(client, &url, partial.path()).await?;
    tokio::fs::rename(partial.path(), &dest).await?;

    Ok(ArchiveFetch::Downloaded { path: dest, bytes })
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Removes an in-progress download file when dropped
#[derive(Debug)]
struct PartialFile {
    path: PathBuf,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        // Already gone once renamed into place.
        if std::fs::remove_file(&self.path).is_ok() {
            tracing::debug!("Removed incomplete download {}", self.path.display());
        }
    }
}

async fn download(client: &Client, url: &str, path: &Path) -> Result<u64, MirrorError> {
    let failed = |reason: String| MirrorError::ArchiveFetchFailed {
        url: url.to_string(),
        reason,
    };

    let mut file = tokio::fs::File::create(path).await?;

    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(failed(format!("HTTP {}", status.as_u16())));
    }

    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

/// Deadline and cancellation applied to every network call of one package
#[derive(Debug, Clone)]
pub struct PackageBudget {
    package: String,
    deadline: Instant,
    cancel: CancellationToken,
}

impl PackageBudget {
    /// Starts a budget of `limit` for `package`
    pub fn new(package: &str, limit: Duration, cancel: CancellationToken) -> Self {
        Self {
            package: package.to_string(),
            deadline: Instant::now() + limit,
            cancel,
        }
    }

    /// Runs a network call, aborting it on cancellation or deadline expiry
    pub async fn run<T, F>(&self, call: F) -> Result<T, MirrorError>
    where
        F: Future<Output = Result<T, MirrorError>>,
    {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(MirrorError::Cancelled),
            result = tokio::time::timeout_at(self.deadline, call) => match result {
                Ok(result) => result,
                Err(_) => Err(MirrorError::DeadlineExceeded {
                    package: self.package.clone(),
                }),
            },
        }
    }
}
