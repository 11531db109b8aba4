//! # Kiln Rewrite
//!
//! Converts ECMAScript module syntax into CommonJS in a single pass over the
//! top-level statements. Only `import`/`export` statements are touched; all
//! other source text is copied through unchanged.
//!
//! ```text
//! import Foo, { Bar } from './b';        var $kiln__b = require("./b");
//!                                   ->   var Foo = $kiln__interopRequireDefault($kiln__b).default;
//!                                        var Bar = $kiln__b.Bar;
//! ```
//!
//! The module also hosts the fast scanners used to decide whether a file
//! needs rewriting at all, and the dependency extraction shared with the
//! transpile workers.

mod assign;
mod codegen;
mod deps;
mod error;
mod names;
mod transform;
pub mod scan;

pub use codegen::CodeGenerator;
pub use deps::{collect_dependencies, Dependency};
pub use error::RewriteError;
pub use names::{NameAllocator, NAME_PREFIX};
pub use scan::{extract_requires, is_es_module, needs_transpile};
pub use transform::ModuleRewriter;

use kiln_ast::Span;
use kiln_lexer::Lexer;
use kiln_parser::Parser;

/// Rewrites the module syntax of `source` to CommonJS.
///
/// The output is a pure function of the input. Import and re-export
/// statements whose specifier is not a string literal are left as they are.
pub fn rewrite(source: &str) -> Result<String, RewriteError> {
    let tokens = Lexer::new(source).tokenize();
    let program = Parser::new(tokens.clone())
        .parse_program()
        .map_err(|errors| match errors.into_iter().next() {
            Some(err) => RewriteError::from(err),
            None => RewriteError::Parse {
                message: "Failed to parse module".to_string(),
                span: Span::new(0, source.len()),
            },
        })?;

    let program = ModuleRewriter::new(&tokens).rewrite(program);
    Ok(CodeGenerator::new(source).generate(&program))
}

// =============================================================================
// Tests
// =============================================================================
