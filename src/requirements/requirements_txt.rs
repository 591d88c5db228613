use std::collections::BTreeSet;

/// Collects the raw requirement lines of a `requirements.txt`
///
/// Lines are trimmed; blank lines and `#` comments are dropped. Everything
/// else is kept verbatim, version specifiers included.
pub fn parse_requirements_txt(content: &str) -> BTreeSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
