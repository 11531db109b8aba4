//! Addresses of a dependency set in the cache bucket and the packager

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::dependencies::DependencySet;

/// Characters JavaScript's `encodeURIComponent` leaves alone
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Default cache layout version
pub const DEFAULT_SCHEMA_VERSION: u32 = 1;

fn encode(component: &str) -> String {
    utf8_percent_encode(component, URI_COMPONENT).to_string()
}

/// Path of a set's manifest in the cache bucket:
/// `v{schema}/combinations/{pairs}.json`.
///
/// The bucket's CDN rejects paths with leading slashes even when escaped, so
/// scoped names lose their `@` and their `/` becomes `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheAddress(String);

impl CacheAddress {
    pub fn new(set: &DependencySet, schema_version: u32) -> Self {
        let pairs: Vec<String> = set
            .iter()
            .map(|(name, version)| {
                let name = name.replacen('/', "-", 1).replacen('@', "", 1);
                format!("{}@{}", encode(&name), version)
            })
            .collect();
        Self(format!("v{}/combinations/{}.json", schema_version, pairs.join("%2B")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path segment naming a set for the build trigger: encoded `name@version`
/// pairs joined with `+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryAddress(String);

impl QueryAddress {
    pub fn new(set: &DependencySet) -> Self {
        let pairs: Vec<String> = set
            .iter()
            .map(|(name, version)| encode(&format!("{}@{}", name, version)))
            .collect();
        Self(pairs.join("+"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
