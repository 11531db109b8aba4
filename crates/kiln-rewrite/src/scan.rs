//! Fast regex scans that avoid a full parse
//!
//! These are approximations: they look at line and statement starts only and
//! may be fooled by module syntax inside strings or comments.

use std::sync::LazyLock;

use regex::Regex;

use crate::Dependency;

/// `import`/`export` at the start of a line or statement
static ES_MODULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)(?:^|[;{}])[ \t]*(?:import(?:\s+[\w$]|\s*[*{"'])|export(?:\s*[*{]|\s+(?:default|var|let|const|function|class|async)\b))"#,
    )
    .expect("module syntax pattern is valid")
});

static DYNAMIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^.\w$])import\s*\(").expect("dynamic import pattern is valid")
});

static REQUIRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[^.\w$])require\s*\(\s*(?:"([^"\n]*)"|'([^'\n]*)'|`([^`]*)`)\s*\)"#)
        .expect("require pattern is valid")
});

/// True if `code` looks like it uses `import`/`export` statements.
pub fn is_es_module(code: &str) -> bool {
    ES_MODULE.is_match(code)
}

/// True if `code` needs the worker: module syntax or dynamic `import()`.
///
/// Code for which this is false is plain CommonJS and can be passed through.
pub fn needs_transpile(code: &str) -> bool {
    is_es_module(code) || DYNAMIC_IMPORT.is_match(code)
}

/// Collects `require(...)` calls with a literal or template argument.
pub fn extract_requires(code: &str) -> Vec<Dependency> {
    let mut dependencies: Vec<Dependency> = Vec::new();

    for captures in REQUIRE.captures_iter(code) {
        let dependency = if let Some(template) = captures.get(3) {
            Dependency::from_template(template.as_str())
        } else if let Some(literal) = captures.get(1).or_else(|| captures.get(2)) {
            Dependency::literal(literal.as_str())
        } else {
            continue;
        };

        if !dependencies.contains(&dependency) {
            dependencies.push(dependency);
        }
    }

    dependencies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_module_syntax() {
        assert!(is_es_module("import React from 'react';"));
        assert!(is_es_module("'use strict';\nexport default 1;"));
        assert!(is_es_module("export { a };"));
        assert!(is_es_module("import './side-effect';"));
        assert!(is_es_module("foo();import{a}from'b'"));
    }

    #[test]
    fn test_commonjs_is_not_module() {
        assert!(!is_es_module("const important = require('x');\nmodule.exports = important;"));
        assert!(!is_es_module("exports.default = 1;"));
        assert!(!is_es_module("const x = import('y');"));
        assert!(needs_transpile("const x = import('y');"));
        assert!(!needs_transpile("module.exports = { importer: 1 };"));
    }

    #[test]
    fn test_extract_requires() {
        let code = "var a = require('a');\nvar b = require(\"./b\");\nobj.require('no');\nrequire(`./dir/${x}`);\nrequire('a');";
        assert_eq!(
            extract_requires(code),
            vec![
                Dependency::literal("a"),
                Dependency::literal("./b"),
                Dependency { path: "./dir".into(), is_glob: true },
            ]
        );
    }
}
