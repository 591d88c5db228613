//! Package alias index caching
//!
//! The full upstream package listing is downloaded once and cached on disk.
//! It is refreshed when the cached copy is missing or older than the
//! configured maximum age, and is read into an [`AliasTable`] before the
//! crawl starts.

use crate::config::Config;
use crate::names::AliasTable;
use crate::MirrorError;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::path::Path;

/// Checks whether the cached alias index must be downloaded again
///
/// # Returns
///
/// * `true` - If the file is missing, unreadable, or older than `max_age`
/// * `false` - If the cached copy is still fresh
pub fn needs_refresh(path: &Path, max_age: Duration) -> bool {
    let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(_) => return true,
    };

    let age = Utc::now() - DateTime::<Utc>::from(modified);
    age > max_age
}

/// Downloads the upstream package listing and stores it at `path`
///
/// Every anchor on `<host>/simple/` names one package. The names are
/// written sorted, one per line.
///
/// # Returns
///
/// The number of names written
pub async fn download_alias_index(
    client: &Client,
    host: &str,
    path: &Path,
) -> Result<usize, MirrorError> {
    let url = format!("{}/simple/", host.trim_end_matches('/'));
    tracing::info!("Downloading package index from {}", url);

    let body = client
        .get(&url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|source| MirrorError::Http {
            url: url.clone(),
            source,
        })?
        .text()
        .await
        .map_err(|source| MirrorError::Http { url, source })?;

    let names = extract_anchor_names(&body);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut content = String::new();
    for name in &names {
        content.push_str(name);
        content.push('\n');
    }
    std::fs::write(path, content)?;

    Ok(names.len())
}

/// Extracts the text of every anchor tag, trimmed and sorted
fn extract_anchor_names(html: &str) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a") else {
        return BTreeSet::new();
    };

    document
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Reads a cached alias index into an [`AliasTable`]
pub fn load_alias_table(path: &Path) -> Result<AliasTable, MirrorError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content.lines().map(str::trim).collect())
}

/// Makes sure a usable alias table is available before crawling
///
/// Downloads the index when the cached copy is stale. A failed download
/// falls back to a stale copy if one exists; without any copy the run
/// cannot start.
pub async fn prepare_aliases(client: &Client, config: &Config) -> Result<AliasTable, MirrorError> {
    let path = Path::new(&config.aliases.index_path);
    let max_age = Duration::hours(config.aliases.max_age_hours as i64);

    if needs_refresh(path, max_age) {
        match download_alias_index(client, &config.upstream.host, path).await {
            Ok(count) => tracing::info!("Stored {} package names in {}", count, path.display()),
            Err(e) if path.is_file() => {
                tracing::warn!("Failed to refresh package index, using stale copy: {}", e);
            }
            Err(e) => {
                return Err(MirrorError::AliasSourceUnavailable {
                    message: e.to_string(),
                });
            }
        }
    }

    let table = load_alias_table(path).map_err(|e| MirrorError::AliasSourceUnavailable {
        message: format!("{}: {}", path.display(), e),
    })?;
    tracing::info!("Read {} packages from index", table.len());

    Ok(table)
}
