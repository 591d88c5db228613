//! Package listing parser
//!
//! A listing page advertises every file the upstream holds for one package.
//! Only source archives are mirrored, so links are filtered:
//!
//! **Keep:**
//! - hrefs starting with the remote package-storage prefix
//! - whose path contains the source marker (`/source/`)
//!
//! **Drop:**
//! - pre-release builds (`-alpha-` in the path)
//! - anything that would land outside the mirror root
//!
//! Surviving links are rewritten to the mirror's local layout, stripped of
//! their fragment, and sorted so the result does not depend on page order.

use crate::config::UpstreamConfig;
use scraper::{Html, Selector};
use std::path::{Component, Path};

/// Local directory (relative to the mirror root) holding archive bytes
pub const LOCAL_PACKAGE_PREFIX: &str = "packages/";

/// One mirrored source archive, addressed by its path under the mirror root
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchiveLink {
    local_path: String,
}

impl ArchiveLink {
    /// Creates a link from a mirror-relative path such as
    /// `packages/source/f/foo/foo-1.0.tar.gz`
    pub fn new(local_path: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
        }
    }

    /// Path relative to the mirror root
    pub fn local_path(&self) -> &str {
        &self.local_path
    }

    /// Root-relative href used in generated indexes
    pub fn href(&self) -> String {
        format!("/{}", self.local_path)
    }

    /// Base file name of the archive
    pub fn file_name(&self) -> &str {
        self.local_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.local_path)
    }
}

/// Extracts the value of every `href` attribute on the page
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// Filters and rewrites hrefs into sorted, unique [`ArchiveLink`]s
pub fn filter_archive_links<S: AsRef<str>>(hrefs: &[S], upstream: &UpstreamConfig) -> Vec<ArchiveLink> {
    let mut links: Vec<ArchiveLink> = hrefs
        .iter()
        .filter_map(|href| rewrite_link(href.as_ref(), upstream))
        .collect();

    links.sort();
    links.dedup();
    links
}

/// Parses a listing page into the archive links worth mirroring
pub fn parse_listing(html: &str, upstream: &UpstreamConfig) -> Vec<ArchiveLink> {
    filter_archive_links(&extract_hrefs(html), upstream)
}

fn rewrite_link(href: &str, upstream: &UpstreamConfig) -> Option<ArchiveLink> {
    let relative = href.strip_prefix(upstream.package_prefix.as_str())?;
    let relative = relative.split('#').next().unwrap_or(relative);
    let local_path = format!("{}{}", LOCAL_PACKAGE_PREFIX, relative);

    if !local_path.contains(upstream.source_marker.as_str()) {
        return None;
    }

    if !upstream.prerelease_marker.is_empty() && local_path.contains(upstream.prerelease_marker.as_str()) {
        tracing::trace!("Skipping pre-release archive {}", href);
        return None;
    }

    if !is_contained(&local_path) {
        tracing::warn!("Skipping archive link escaping the mirror root: {}", href);
        return None;
    }

    Some(ArchiveLink::new(local_path))
}

/// True if the relative path stays below the directory it is joined onto
pub fn is_contained(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}
