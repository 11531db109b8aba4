//! Package.json parsing

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use kiln_worker::PackageInfo;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum PackageJsonError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid package.json: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageJson {
    pub name: String,
    pub version: String,
    pub main: Option<String>,
    pub module: Option<String>,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageJson {
    /// Entry file named by the manifest, preferring `module` over `main`.
    pub fn entry(&self) -> Option<&str> {
        self.module
            .as_deref()
            .or(self.main.as_deref())
            .filter(|entry| !entry.is_empty())
    }

    /// Dependency lists in the shape the transpiler consults.
    pub fn package_info(&self) -> PackageInfo {
        PackageInfo {
            dependencies: self.dependencies.clone(),
            dev_dependencies: self.dev_dependencies.clone(),
        }
    }
}

/// Parse a package.json file
pub fn parse_package_json(path: &Path) -> Result<PackageJson, PackageJsonError> {
    let content = fs::read_to_string(path).map_err(|source| PackageJsonError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_package_json_str(&content)
}

/// Parse package.json from string content
pub fn parse_package_json_str(content: &str) -> Result<PackageJson, PackageJsonError> {
    Ok(serde_json::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_package_json() {
        let json = r#"{
            "name": "test-package",
            "version": "1.0.0",
            "main": "index.js",
            "types": "index.d.ts"
        }"#;

        let pkg = parse_package_json_str(json).unwrap();
        assert_eq!(pkg.name, "test-package");
        assert_eq!(pkg.version, "1.0.0");
        assert_eq!(pkg.entry(), Some("index.js"));
    }

    #[test]
    fn test_module_field_wins() {
        let pkg = parse_package_json_str(r#"{"main": "lib/index.js", "module": "es/index.js"}"#).unwrap();
        assert_eq!(pkg.entry(), Some("es/index.js"));

        let pkg = parse_package_json_str(r#"{"main": ""}"#).unwrap();
        assert_eq!(pkg.entry(), None);
    }

    #[test]
    fn test_parse_dependencies() {
        let json = r#"{
            "name": "test",
            "version": "1.0.0",
            "dependencies": {
                "lodash": "^4.17.21",
                "express": "~4.18.2"
            },
            "devDependencies": {
                "@babel/core": "^7.0.0"
            },
            "config": {"port": 3000, "offset": -0.5}
        }"#;

        let pkg = parse_package_json_str(json).unwrap();
        assert_eq!(pkg.dependencies.len(), 2);
        assert_eq!(pkg.dependencies.get("lodash"), Some(&"^4.17.21".to_string()));
        assert_eq!(pkg.package_info().dev_dependencies.len(), 1);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_package_json_str("{\"name\": "),
            Err(PackageJsonError::Parse(_))
        ));
    }
}
