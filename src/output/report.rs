//! Requirement tree report
//!
//! One line per package that declared dependencies, sorted by package:
//!
//! ```text
//! alpha <- beta, gamma
//! ```

use crate::MirrorError;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Package name mapped to the (canonicalized) names it requires
pub type RequirementTree = BTreeMap<String, BTreeSet<String>>;

/// Formats the requirement tree report
pub fn format_requirement_report(tree: &RequirementTree) -> String {
    let mut report = String::new();
    for (package, requirements) in tree {
        let requirements: Vec<&str> = requirements.iter().map(String::as_str).collect();
        report.push_str(&format!("{} <- {}\n", package, requirements.join(", ")));
    }
    report
}

/// Writes the requirement tree report to `path`
pub fn write_requirement_report(tree: &RequirementTree, path: &Path) -> Result<(), MirrorError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format_requirement_report(tree))?;
    Ok(())
}
