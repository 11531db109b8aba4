//! Collision-free names for generated bindings

use std::collections::HashSet;

/// Prefix of every binding the rewriter introduces
pub const NAME_PREFIX: &str = "$kiln__";

/// Hands out binding names that are unique within one rewrite.
///
/// A name is taken as-is when unused, otherwise `_` is appended until it is.
/// Identifiers already present in the source are reserved up front.
#[derive(Debug, Default, Clone)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `name` as taken without allocating it.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.used.insert(name.into());
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// Returns `base`, or `base` suffixed with underscores, and marks it taken.
    pub fn allocate(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        while self.used.contains(&name) {
            name.push('_');
        }
        self.used.insert(name.clone());
        name
    }

    /// Binding name for the value required from `specifier`,
    /// e.g. `./lib/util.js` gives `$kiln__util`.
    pub fn for_specifier(&mut self, specifier: &str) -> String {
        let base: String = module_basename(specifier)
            .chars()
            .filter(|ch| ch.is_alphanumeric() || *ch == '_' || *ch == '$')
            .collect();
        self.allocate(&format!("{}{}", NAME_PREFIX, base))
    }
}

/// Last path segment of a specifier without a `.js` extension.
fn module_basename(specifier: &str) -> &str {
    let trimmed = specifier.trim_end_matches('/');
    let base = trimmed.rsplit('/').next().unwrap_or(trimmed);
    base.strip_suffix(".js").unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename_and_sanitizing() {
        let mut names = NameAllocator::new();
        assert_eq!(names.for_specifier("./lib/util.js"), "$kiln__util");
        assert_eq!(names.for_specifier("lodash.debounce"), "$kiln__lodashdebounce");
        assert_eq!(names.for_specifier("@scope/some-pkg/"), "$kiln__somepkg");
    }

    #[test]
    fn test_collisions_get_underscores() {
        let mut names = NameAllocator::new();
        names.reserve("$kiln__a");

        assert_eq!(names.for_specifier("./a"), "$kiln__a_");
        assert_eq!(names.for_specifier("../other/a.js"), "$kiln__a__");
        assert_eq!(names.allocate("$kiln__default"), "$kiln__default");
        assert!(names.is_used("$kiln__default"));
    }
}
