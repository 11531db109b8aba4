//! In-memory view of project files plus fetched dependency files

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use kiln_packager::Manifest;

/// Files keyed by absolute, normalized `/`-separated paths.
#[derive(Debug, Clone, Default)]
pub struct VirtualFs {
    files: BTreeMap<String, String>,
}

impl VirtualFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every UTF-8 file under `root`, skipping hidden entries and any
    /// local `node_modules`. Paths are relative to `root`, rooted at `/`.
    pub fn from_dir(root: &Path) -> io::Result<Self> {
        let mut vfs = Self::new();
        vfs.load_dir(root, root)?;
        Ok(vfs)
    }

    fn load_dir(&mut self, root: &Path, dir: &Path) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') || name == "node_modules" {
                continue;
            }

            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.load_dir(root, &path)?;
                continue;
            }

            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            if let Ok(relative) = path.strip_prefix(root) {
                let key = relative
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                self.insert(&format!("/{}", key), content);
            }
        }
        Ok(())
    }

    /// Adds every file of `manifest`; its paths are already absolute.
    pub fn overlay_manifest(&mut self, manifest: &Manifest) {
        for (path, file) in &manifest.contents {
            self.insert(path, file.content.clone());
        }
    }

    pub fn insert(&mut self, path: &str, content: impl Into<String>) {
        self.files.insert(normalize_path(path), content.into());
    }

    pub fn read(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// True if any file lives below `path`.
    pub fn is_dir(&self, path: &str) -> bool {
        let prefix = dir_prefix(path);
        self.files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix))
    }

    /// Every file below `dir`, at any depth.
    pub fn files_in_directory<'a>(&'a self, dir: &str) -> impl Iterator<Item = &'a str> + 'a {
        let prefix = dir_prefix(dir);
        self.files
            .range(prefix.clone()..)
            .take_while(move |(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn dir_prefix(dir: &str) -> String {
    let dir = normalize_path(dir);
    if dir.ends_with('/') {
        dir
    } else {
        format!("{}/", dir)
    }
}

/// Directory part of `path`, `/` for top-level files.
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(index) => &path[..index],
    }
}

/// Joins `relative` onto `base` and normalizes the result.
pub fn join(base: &str, relative: &str) -> String {
    if relative.starts_with('/') {
        normalize_path(relative)
    } else {
        normalize_path(&format!("{}/{}", base, relative))
    }
}

/// Resolves `.` and `..` segments and collapses repeated slashes.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_and_join() {
        assert_eq!(normalize_path("/src/./a/../b.js"), "/src/b.js");
        assert_eq!(normalize_path("//x//y"), "/x/y");
        assert_eq!(join("/src/lib", "../util.js"), "/src/util.js");
        assert_eq!(join("/src", "/abs.js"), "/abs.js");
        assert_eq!(dirname("/src/a.js"), "/src");
        assert_eq!(dirname("/a.js"), "/");
    }

    #[test]
    fn test_directories() {
        let mut vfs = VirtualFs::new();
        vfs.insert("/src/locale/en.js", "");
        vfs.insert("/src/locale/nested/fr.js", "");
        vfs.insert("/src/localeX.js", "");

        assert!(vfs.is_dir("/src/locale"));
        assert!(!vfs.is_dir("/src/locale/en.js"));
        let files: Vec<&str> = vfs.files_in_directory("/src/locale").collect();
        assert_eq!(files, vec!["/src/locale/en.js", "/src/locale/nested/fr.js"]);
    }

    #[test]
    fn test_from_dir_skips_hidden_and_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/x")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("src/index.js"), "export default 1;").unwrap();
        fs::write(dir.path().join("node_modules/x/index.js"), "").unwrap();
        fs::write(dir.path().join(".git/HEAD"), "").unwrap();

        let vfs = VirtualFs::from_dir(dir.path()).unwrap();
        assert_eq!(vfs.len(), 1);
        assert_eq!(vfs.read("/src/index.js"), Some("export default 1;"));
    }
}
