use crate::MirrorError;
use std::collections::BTreeSet;
use std::path::Path;

/// Reads the seed package list
///
/// One package name per line. Blank lines and lines starting with `#` are
/// ignored. Names are deduplicated and returned sorted.
///
/// # Returns
///
/// * `Ok(Vec<String>)` - The seed names
/// * `Err(MirrorError::SeedInputMissing)` - The file could not be read
pub fn load_seeds(path: &Path) -> Result<Vec<String>, MirrorError> {
    let content = std::fs::read_to_string(path).map_err(|source| MirrorError::SeedInputMissing {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(parse_seeds(&content))
}

/// Parses seed names from the contents of a seed list
pub fn parse_seeds(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
