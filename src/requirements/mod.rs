//! Requirement extraction
//!
//! Finds the dependency declarations inside a source archive and turns them
//! into package names. Two kinds of declaration file are understood:
//! - `setup.py` build scripts, scanned at syntax-tree level
//! - `requirements.txt` plain lists
//!
//! Every matching file in the archive contributes; results are unioned.
//! Names are returned as written, without normalization.

mod requirements_txt;
mod setup_py;

pub use requirements_txt::parse_requirements_txt;
pub use setup_py::parse_setup_py;

use crate::archive::Archive;
use crate::names::package_name_prefix;
use crate::MirrorError;
use std::collections::BTreeSet;
use std::path::Path;

/// Package names declared by one archive
pub type RequirementSet = BTreeSet<String>;

/// Extracts declared requirement strings from `setup.py` source
///
/// Never fails: damaged parts of a script declare nothing.
pub fn extract_declared_requirements(source: &[u8]) -> BTreeSet<String> {
    match parse_setup_py(source) {
        Ok(requirements) => requirements,
        Err(e) => {
            tracing::debug!("Ignoring setup.py: {}", e);
            BTreeSet::new()
        }
    }
}

/// Opens the archive at `path` and extracts its requirements
///
/// # Returns
///
/// * `Ok(RequirementSet)` - Declared package names (possibly empty)
/// * `Err(MirrorError)` - The archive format is unsupported or unreadable
pub fn extract_requirements(path: &Path) -> Result<RequirementSet, MirrorError> {
    let mut archive = Archive::open(path)?;
    extract_from_archive(&mut archive)
}

/// Scans every entry of an open archive for declaration files
pub fn extract_from_archive(archive: &mut Archive) -> Result<RequirementSet, MirrorError> {
    let mut raw = BTreeSet::new();

    for entry in archive.list()? {
        if entry.is_dir {
            continue;
        }

        let name = entry.name.to_lowercase();
        if name.ends_with("setup.py") {
            let source = archive.read_entry(&entry)?;
            let found = extract_declared_requirements(&source);
            tracing::trace!("{}: {} declared in {}", archive.path().display(), found.len(), entry.name);
            raw.extend(found);
        } else if name.ends_with("requirements.txt") {
            let content = archive.read_entry(&entry)?;
            raw.extend(parse_requirements_txt(&String::from_utf8_lossy(&content)));
        }
    }

    Ok(to_package_names(&raw))
}

/// Reduces raw requirement strings to their package-name prefixes
pub fn to_package_names<'a>(raw: impl IntoIterator<Item = &'a String>) -> RequirementSet {
    raw.into_iter()
        .map(|requirement| package_name_prefix(requirement))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
