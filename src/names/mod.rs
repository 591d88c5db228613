//! Package name handling
//!
//! Package names arrive from seed files, listing pages and dependency
//! declarations in many spellings (`Zope.Interface`, `zope-interface`,
//! `zope_interface`). All identity comparisons go through [`normalize`];
//! the [`AliasTable`] maps a normalized key back to the spelling the
//! upstream repository uses.

mod aliases;

pub use aliases::{download_alias_index, load_alias_table, needs_refresh, prepare_aliases};

use std::collections::HashMap;

/// Normalizes a package name into its identity key
///
/// The name is lower-cased and every character that is not an ASCII letter
/// or digit is dropped. Non-ASCII characters are discarded, not
/// transliterated.
///
/// # Examples
///
/// ```
/// use mirrorator::names::normalize;
///
/// assert_eq!(normalize("Foo-Bar"), "foobar");
/// assert_eq!(normalize("FOO_BAR"), "foobar");
/// ```
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Extracts the package name from a requirement string
///
/// Takes the leading run of characters up to the first space, `<`, `>` or
/// `=`, which drops any version specifier: `"foo>=1.0"` becomes `"foo"`.
pub fn package_name_prefix(requirement: &str) -> &str {
    let end = requirement
        .find(|c| matches!(c, ' ' | '<' | '>' | '='))
        .unwrap_or(requirement.len());
    &requirement[..end]
}

/// Mapping from normalized key to the canonical display name
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    names: HashMap<String, String>,
}

impl AliasTable {
    /// Creates an empty alias table
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `name` as the canonical spelling for its normalized key
    ///
    /// Names that normalize to the empty key are ignored. A later name with
    /// the same key replaces an earlier one.
    pub fn insert(&mut self, name: &str) {
        let key = normalize(name);
        if !key.is_empty() {
            self.names.insert(key, name.to_string());
        }
    }

    /// Looks up the canonical name for a normalized key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    /// Resolves a name to its canonical display form
    ///
    /// Returns `name` unchanged when the table has no entry for it.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.get(&normalize(name)).unwrap_or(name)
    }

    /// Canonicalizes a discovered requirement name
    ///
    /// Requirement names are always normalized first. The canonical spelling
    /// is used when known, otherwise the normalized key itself. Returns
    /// `None` for names with no alphanumeric characters.
    pub fn canonicalize(&self, name: &str) -> Option<String> {
        let key = normalize(name);
        if key.is_empty() {
            return None;
        }
        Some(self.get(&key).map(str::to_string).unwrap_or(key))
    }

    /// Number of known canonical names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the table holds no names
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for AliasTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut table = Self::new();
        for name in iter {
            table.insert(name.as_ref());
        }
        table
    }
}
