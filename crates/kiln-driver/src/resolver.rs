//! Node-style module resolution inside a [`VirtualFs`]

use crate::package_json::parse_package_json_str;
use crate::vfs::{dirname, join, normalize_path, VirtualFs};

const EXTENSIONS: [&str; 4] = ["js", "mjs", "cjs", "json"];

/// Represents a resolved module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedModule {
    /// Project file
    LocalFile(String),
    /// Built-in module (fs, path, http, etc.), provided by the runtime
    Builtin(String),
    /// File inside an installed package
    Package(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("module not found: {specifier} from {from} (tried {target} with js, mjs, cjs, json and index files)")]
    NotFound {
        specifier: String,
        from: String,
        target: String,
    },

    #[error("package '{name}' is not installed")]
    PackageNotFound { name: String },
}

/// Module resolver handles import path resolution
pub struct ModuleResolver {
    /// Where installed packages live
    dependency_root: String,
}

impl ModuleResolver {
    pub fn new(dependency_root: &str) -> Self {
        Self {
            dependency_root: normalize_path(dependency_root),
        }
    }

    /// Resolve an import specifier to a module
    pub fn resolve(&self, vfs: &VirtualFs, specifier: &str, from_file: &str) -> Result<ResolvedModule, ResolveError> {
        let bare = specifier.strip_prefix("node:").unwrap_or(specifier);
        if Self::is_builtin(bare) {
            return Ok(ResolvedModule::Builtin(bare.to_string()));
        }

        if specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".." {
            let target = join(dirname(from_file), specifier);
            return self.resolve_file(vfs, &target, specifier, from_file);
        }

        if specifier.starts_with('/') {
            return self.resolve_file(vfs, &normalize_path(specifier), specifier, from_file);
        }

        self.resolve_package(vfs, specifier, from_file)
    }

    /// Check if a specifier is a built-in module
    fn is_builtin(specifier: &str) -> bool {
        matches!(
            specifier,
            "fs" | "path" | "http" | "https" | "os" | "process" | "events"
                | "url" | "crypto" | "util" | "stream" | "buffer"
                | "child_process" | "net" | "tls" | "dns" | "querystring"
                | "assert" | "zlib"
        )
    }

    fn resolve_file(
        &self,
        vfs: &VirtualFs,
        target: &str,
        specifier: &str,
        from_file: &str,
    ) -> Result<ResolvedModule, ResolveError> {
        let found = Self::probe(vfs, target).ok_or_else(|| ResolveError::NotFound {
            specifier: specifier.to_string(),
            from: from_file.to_string(),
            target: target.to_string(),
        })?;

        if self.is_package_path(&found) {
            Ok(ResolvedModule::Package(found))
        } else {
            Ok(ResolvedModule::LocalFile(found))
        }
    }

    /// `target` itself, then with each extension, then as a directory.
    fn probe(vfs: &VirtualFs, target: &str) -> Option<String> {
        if vfs.is_file(target) {
            return Some(target.to_string());
        }
        for ext in &EXTENSIONS {
            let with_ext = format!("{}.{}", target, ext);
            if vfs.is_file(&with_ext) {
                return Some(with_ext);
            }
        }

        if vfs.is_dir(target) {
            let manifest_path = join(target, "package.json");
            if let Some(entry) = vfs
                .read(&manifest_path)
                .and_then(|content| parse_package_json_str(content).ok())
                .and_then(|manifest| manifest.entry().map(str::to_string))
            {
                let entry_target = join(target, &entry);
                if entry_target != target {
                    if let Some(found) = Self::probe(vfs, &entry_target) {
                        return Some(found);
                    }
                }
            }

            for ext in &EXTENSIONS {
                let index_path = format!("{}/index.{}", target, ext);
                if vfs.is_file(&index_path) {
                    return Some(index_path);
                }
            }
        }

        None
    }

    /// Resolves `pkg`, `pkg/sub`, `@scope/pkg` and `@scope/pkg/sub`.
    fn resolve_package(&self, vfs: &VirtualFs, specifier: &str, from_file: &str) -> Result<ResolvedModule, ResolveError> {
        let (name, subpath) = Self::parse_package_specifier(specifier);
        let package_dir = join(&self.dependency_root, name);

        if !vfs.is_dir(&package_dir) {
            return Err(ResolveError::PackageNotFound { name: name.to_string() });
        }

        let target = match subpath {
            Some(subpath) => join(&package_dir, subpath),
            None => package_dir,
        };
        self.resolve_file(vfs, &target, specifier, from_file)
    }

    /// Split a specifier into package name and subpath
    fn parse_package_specifier(specifier: &str) -> (&str, Option<&str>) {
        let name_end = if specifier.starts_with('@') {
            specifier
                .match_indices('/')
                .nth(1)
                .map(|(index, _)| index)
        } else {
            specifier.find('/')
        };

        match name_end {
            Some(index) => (&specifier[..index], Some(&specifier[index + 1..])),
            None => (specifier, None),
        }
    }

    fn is_package_path(&self, path: &str) -> bool {
        path.starts_with(&format!("{}/", self.dependency_root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vfs() -> VirtualFs {
        let mut vfs = VirtualFs::new();
        vfs.insert("/src/index.js", "");
        vfs.insert("/src/util.mjs", "");
        vfs.insert("/src/data.json", "{}");
        vfs.insert("/src/components/index.js", "");
        vfs.insert("/node_modules/react/package.json", r#"{"main": "index.js"}"#);
        vfs.insert("/node_modules/react/index.js", "");
        vfs.insert("/node_modules/@scope/pkg/package.json", r#"{"module": "es/main"}"#);
        vfs.insert("/node_modules/@scope/pkg/es/main.js", "");
        vfs.insert("/node_modules/@scope/pkg/lib/extra.js", "");
        vfs
    }

    #[test]
    fn test_builtin_detection() {
        assert!(ModuleResolver::is_builtin("fs"));
        assert!(ModuleResolver::is_builtin("path"));
        assert!(!ModuleResolver::is_builtin("./local"));
        assert!(!ModuleResolver::is_builtin("my-package"));

        let resolver = ModuleResolver::new("/node_modules");
        assert_eq!(
            resolver.resolve(&vfs(), "node:fs", "/src/index.js"),
            Ok(ResolvedModule::Builtin("fs".into()))
        );
    }

    #[test]
    fn test_relative_resolution() {
        let resolver = ModuleResolver::new("/node_modules");
        let vfs = vfs();

        assert_eq!(
            resolver.resolve(&vfs, "./util", "/src/index.js"),
            Ok(ResolvedModule::LocalFile("/src/util.mjs".into()))
        );
        assert_eq!(
            resolver.resolve(&vfs, "./data.json", "/src/index.js"),
            Ok(ResolvedModule::LocalFile("/src/data.json".into()))
        );
        assert_eq!(
            resolver.resolve(&vfs, "./components", "/src/index.js"),
            Ok(ResolvedModule::LocalFile("/src/components/index.js".into()))
        );
        assert_eq!(
            resolver.resolve(&vfs, "../index", "/src/components/index.js"),
            Ok(ResolvedModule::LocalFile("/src/index.js".into()))
        );
    }

    #[test]
    fn test_package_resolution() {
        let resolver = ModuleResolver::new("/node_modules");
        let vfs = vfs();

        assert_eq!(
            resolver.resolve(&vfs, "react", "/src/index.js"),
            Ok(ResolvedModule::Package("/node_modules/react/index.js".into()))
        );
        assert_eq!(
            resolver.resolve(&vfs, "@scope/pkg", "/src/index.js"),
            Ok(ResolvedModule::Package("/node_modules/@scope/pkg/es/main.js".into()))
        );
        assert_eq!(
            resolver.resolve(&vfs, "@scope/pkg/lib/extra", "/src/index.js"),
            Ok(ResolvedModule::Package("/node_modules/@scope/pkg/lib/extra.js".into()))
        );
    }

    #[test]
    fn test_missing_modules() {
        let resolver = ModuleResolver::new("/node_modules");
        let vfs = vfs();

        assert_eq!(
            resolver.resolve(&vfs, "lodash", "/src/index.js"),
            Err(ResolveError::PackageNotFound { name: "lodash".into() })
        );
        assert!(matches!(
            resolver.resolve(&vfs, "./missing", "/src/index.js"),
            Err(ResolveError::NotFound { .. })
        ));
    }

    #[test]
    fn test_parse_package_specifier() {
        assert_eq!(ModuleResolver::parse_package_specifier("lodash/fp"), ("lodash", Some("fp")));
        assert_eq!(ModuleResolver::parse_package_specifier("@a/b"), ("@a/b", None));
        assert_eq!(ModuleResolver::parse_package_specifier("@a/b/c/d"), ("@a/b", Some("c/d")));
    }
}
