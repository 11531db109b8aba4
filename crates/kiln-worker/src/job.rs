//! The work a transform worker performs

use kiln_lexer::{Lexer, TokenKind};
use kiln_rewrite::{collect_dependencies, rewrite};
use tracing::warn;

use crate::protocol::{RuntimeVersion, TaskOutput, TaskPayload};

/// Job run on a worker thread for every task.
///
/// Implementations must be pure with respect to their input: the same payload
/// always produces the same output.
pub trait TransformJob: Send + Sync + 'static {
    fn run(&self, payload: &TaskPayload) -> Result<TaskOutput, String>;
}

const STRICT_PROLOGUE: &str = "\"use strict\";\n";

/// Default job: module rewrite, strict prologue and dependency extraction.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleTransform;

impl TransformJob for ModuleTransform {
    fn run(&self, payload: &TaskPayload) -> Result<TaskOutput, String> {
        if payload.features.macros {
            warn!(path = payload.path.as_str(), "macro packages are not expanded");
        }

        let mut code = rewrite(&payload.code).map_err(|err| format!("{}: {}", payload.path, err))?;

        if payload.target_version == RuntimeVersion::Modern
            && payload.config.strict_mode
            && !has_strict_directive(&code)
        {
            code.insert_str(0, STRICT_PROLOGUE);
        }

        let tokens = Lexer::new(&code).tokenize();
        let dependencies = collect_dependencies(&tokens)
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(TaskOutput {
            transpiled_code: code,
            dependencies,
        })
    }
}

/// True if the directive prologue of `code` already contains `"use strict"`.
fn has_strict_directive(code: &str) -> bool {
    Lexer::new(code)
        .tokenize()
        .into_iter()
        .take_while(|token| matches!(token.kind, TokenKind::StringLiteral | TokenKind::Semicolon))
        .any(|token| token.kind == TokenKind::StringLiteral && token.value == "use strict")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FeatureFlags, ModuleDependency, TranspileConfig};

    fn payload(code: &str, target_version: RuntimeVersion) -> TaskPayload {
        TaskPayload {
            code: code.to_string(),
            config: TranspileConfig::default(),
            path: "/src/index.js".to_string(),
            target_version,
            features: FeatureFlags::default(),
        }
    }

    #[test]
    fn test_rewrites_and_collects_dependencies() {
        let output = ModuleTransform
            .run(&payload("import a from './a';\nconst b = require(`./b/${x}`);\nimport('./c');", RuntimeVersion::Legacy))
            .unwrap();

        assert!(output.transpiled_code.starts_with("var $kiln__a = require(\"./a\");"));
        assert_eq!(
            output.dependencies,
            vec![
                ModuleDependency { path: "./a".into(), is_glob: false },
                ModuleDependency { path: "./b".into(), is_glob: true },
                ModuleDependency { path: "./c".into(), is_glob: false },
            ]
        );
    }

    #[test]
    fn test_require_inside_template_is_reported() {
        let output = ModuleTransform
            .run(&payload("const s = `${require('./a')}`;\nmodule.exports = s;", RuntimeVersion::Legacy))
            .unwrap();

        assert_eq!(output.dependencies, vec![ModuleDependency { path: "./a".into(), is_glob: false }]);
    }

    #[test]
    fn test_regex_with_quote_inside_template_is_rewritten() {
        let output = ModuleTransform
            .run(&payload("const s = `${name.replace(/'/g, \"\")}`;\nexport { s };", RuntimeVersion::Legacy))
            .unwrap();

        assert!(output.transpiled_code.contains("exports.s = s;"));
    }

    #[test]
    fn test_strict_prologue_for_modern_target() {
        let output = ModuleTransform.run(&payload("foo();", RuntimeVersion::Modern)).unwrap();
        assert_eq!(output.transpiled_code, "\"use strict\";\nfoo();");

        let output = ModuleTransform
            .run(&payload("'use strict';\nfoo();", RuntimeVersion::Modern))
            .unwrap();
        assert_eq!(output.transpiled_code, "'use strict';\nfoo();");

        let output = ModuleTransform.run(&payload("foo();", RuntimeVersion::Legacy)).unwrap();
        assert_eq!(output.transpiled_code, "foo();");
    }

    #[test]
    fn test_parse_failure_is_reported() {
        let err = ModuleTransform
            .run(&payload("const s = 'open", RuntimeVersion::Legacy))
            .unwrap_err();
        assert!(err.starts_with("/src/index.js: "));
    }
}
