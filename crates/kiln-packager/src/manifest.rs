//! Packager manifest format

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Every file of a resolved dependency set. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manifest {
    /// Absolute path (under `/node_modules`) to file
    pub contents: BTreeMap<String, ManifestFile>,
    pub dependencies: Vec<ManifestDependency>,
    pub dependency_aliases: BTreeMap<String, serde_json::Value>,
    pub dependency_dependencies: BTreeMap<String, TransitiveDependency>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestFile {
    pub content: String,
    /// Specifiers the packager found in the file
    pub requires: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDependency {
    pub name: String,
    pub version: String,
}

/// A package pulled in by another package
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitiveDependency {
    pub semver: String,
    pub resolved: String,
    pub parents: Vec<String>,
    pub entries: Vec<String>,
}

/// Build-trigger answer: where the artifact will appear in the bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagerPointer {
    pub url: String,
}

/// Error body returned by the packager
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

impl Manifest {
    /// Number of files in the manifest.
    pub fn file_count(&self) -> usize {
        self.contents.len()
    }
}
