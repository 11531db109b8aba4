//! Dependency maps before and after version resolution

use std::collections::BTreeMap;

/// Package name to version range, as written in a package manifest
pub type RangeMap = BTreeMap<String, String>;

/// Package name to absolute version.
///
/// Ordered by name, so two sets with the same pairs compare and address
/// identically however they were built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DependencySet {
    versions: BTreeMap<String, String>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, version: impl Into<String>) {
        self.versions.insert(name.into(), version.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.versions.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.versions
            .iter()
            .map(|(name, version)| (name.as_str(), version.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for DependencySet {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, version) in iter {
            set.insert(name, version);
        }
        set
    }
}

/// Drops everything from the first whitespace on, after leading whitespace.
///
/// Some manifests carry ranges like `"^1.2.0 "`; like yarn, the trailing part
/// is ignored.
pub fn normalize_range(range: &str) -> &str {
    let range = range.trim_start();
    match range.find(char::is_whitespace) {
        Some(end) => &range[..end],
        None => range,
    }
}

pub fn normalize(ranges: &RangeMap) -> RangeMap {
    ranges
        .iter()
        .map(|(name, range)| (name.clone(), normalize_range(range).to_string()))
        .collect()
}
