//! Mirror index writer
//!
//! Produces the static "simple" index tree next to the mirrored archives:
//!
//! | Path | Content |
//! |------|---------|
//! | `simple/<package>/index-orig.html` | upstream listing, verbatim |
//! | `simple/<package>/index.html` | one root-relative link per archive |
//! | `simple/index.html` | one link per mirrored package |
//! | `index.html` | one line per (package, archive) pair |
//!
//! Global files are replaced atomically (temp file + rename) so a reader
//! never sees a partially written index.

use crate::crawler::{is_contained, ArchiveLink};
use crate::MirrorError;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes and tracks the mirror's index artifacts
#[derive(Debug)]
pub struct IndexWriter {
    root: PathBuf,
    entries: Vec<(String, ArchiveLink)>,
}

impl IndexWriter {
    /// Creates a writer for the mirror rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Vec::new(),
        }
    }

    /// Mirror root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every (package, archive) pair listed so far, in processing order
    pub fn entries(&self) -> &[(String, ArchiveLink)] {
        &self.entries
    }

    /// Distinct packages that produced at least one archive, sorted
    pub fn packages(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|(package, _)| package.as_str()).collect()
    }

    /// Stores the unmodified upstream listing of a package
    pub fn write_original_listing(&self, package: &str, raw: &[u8]) -> Result<(), MirrorError> {
        let path = self.package_dir(package)?.join("index-orig.html");
        write_file(&path, raw)
    }

    /// Writes the rewritten listing of a package and records its archives
    pub fn write_package_index(&mut self, package: &str, links: &[ArchiveLink]) -> Result<(), MirrorError> {
        let path = self.package_dir(package)?.join("index.html");
        write_file(&path, format_package_index(links).as_bytes())?;

        self.entries
            .extend(links.iter().map(|link| (package.to_string(), link.clone())));
        Ok(())
    }

    /// Rewrites both repository-wide indexes from the recorded entries
    pub fn write_global_indexes(&self) -> Result<(), MirrorError> {
        write_atomic(
            &self.root.join("index.html"),
            format_flat_index(&self.entries).as_bytes(),
        )?;
        write_atomic(
            &self.root.join("simple").join("index.html"),
            format_simple_index(&self.packages()).as_bytes(),
        )
    }

    fn package_dir(&self, package: &str) -> Result<PathBuf, MirrorError> {
        if package.is_empty() || package.contains(|c: char| c == '/' || c == '\\') || !is_contained(package) {
            return Err(MirrorError::UnsafePath {
                path: package.to_string(),
            });
        }
        Ok(self.root.join("simple").join(package))
    }
}

/// Formats the per-package listing: one link per line, in link order
pub fn format_package_index(links: &[ArchiveLink]) -> String {
    links
        .iter()
        .map(|link| format!("<a href=\"{}\">{}</a>\n", link.href(), link.file_name()))
        .collect()
}

/// Formats the flat listing of every (package, archive) pair
pub fn format_flat_index(entries: &[(String, ArchiveLink)]) -> String {
    entries
        .iter()
        .map(|(package, link)| {
            format!(
                "{}: <a href=\"{}\">{}</a><br>\n",
                package,
                link.href(),
                link.file_name()
            )
        })
        .collect()
}

/// Formats the top-level "simple" index: one link per package directory
pub fn format_simple_index<I, S>(packages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    packages
        .into_iter()
        .map(|package| {
            let package = package.as_ref();
            format!("<a href=\"/simple/{}/\">{}</a><br>\n", package, package)
        })
        .collect()
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), MirrorError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), MirrorError> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    write_file(&temp, contents)?;
    fs::rename(&temp, path)?;
    Ok(())
}
