//! Extension allow-list.

use std::collections::BTreeSet;
use std::path::Path;

/// Case-insensitive allow-list of file extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
    allowed: BTreeSet<String>,
}

impl ExtensionFilter {
    /// Build a filter. Entries are trimmed, a leading dot is optional, and
    /// blank entries are dropped.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = extensions
            .into_iter()
            .filter_map(|ext| {
                let ext = ext.as_ref().trim();
                let ext = ext.strip_prefix('.').unwrap_or(ext);
                (!ext.is_empty()).then(|| ext.to_lowercase())
            })
            .collect();
        Self { allowed }
    }

    /// Whether `path` has an allowed extension. An empty filter allows nothing.
    pub fn allows(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.allowed.contains(&ext.to_lowercase()))
    }

    /// Whether no extension is allowed.
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Allowed extensions, lowercase and sorted.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }
}
