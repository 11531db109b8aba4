//! # Kiln Parser
//!
//! Top-level module parser for JavaScript. Import and export statements are
//! parsed into typed nodes; all other code is carried as verbatim source
//! ranges, so printing an unmodified program reproduces its input exactly.

use kiln_ast::*;
use kiln_lexer::{Lexer, Token, TokenKind};

// Module declarations
mod error;
mod parser;
mod pattern;
mod skip;
mod helpers;

use skip::SkippedDecl;

// Re-export public types
pub use error::{ParseError, ParseResult};
pub use parser::Parser;

/// Lexes and parses `source` in one step.
pub fn parse(source: &str) -> Result<Program, Vec<ParseError>> {
    let tokens = Lexer::new(source).tokenize();
    Parser::new(tokens).parse_program()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn names(decl: &ExportDecl) -> Vec<&str> {
        decl.names.iter().map(|name| name.value.name.as_str()).collect()
    }

    #[test]
    fn test_parse_import_specifiers() {
        let source = "import Foo, { Bar, baz as qux, \"a-b\" as ab } from './b';\nFoo();";
        let program = parse(source).unwrap();
        assert_eq!(program.len(), 2);

        let Some(Stmt::Import(decl)) = program.get(0) else {
            panic!("expected import");
        };
        assert_eq!(decl.source.literal(), Some("./b"));
        assert_eq!(decl.span.text(source), "import Foo, { Bar, baz as qux, \"a-b\" as ab } from './b';");
        assert_eq!(decl.specifiers.len(), 4);
        assert!(matches!(&decl.specifiers[0], ImportSpecifier::Default(local) if local.value.name == "Foo"));
        match &decl.specifiers[2] {
            ImportSpecifier::Named { imported, local } => {
                assert_eq!(imported.as_str(), "baz");
                assert_eq!(local.value.name, "qux");
            }
            other => panic!("unexpected specifier: {:?}", other),
        }
        match &decl.specifiers[3] {
            ImportSpecifier::Named { imported, .. } => assert!(!imported.is_identifier()),
            other => panic!("unexpected specifier: {:?}", other),
        }
    }

    #[test]
    fn test_parse_namespace_and_side_effect_imports() {
        let program = parse("import * as ns from \"x\"\nimport 'polyfill'").unwrap();
        assert_eq!(program.len(), 3);
        assert!(matches!(
            program.get(0),
            Some(Stmt::Import(ImportDecl { specifiers, .. })) if matches!(specifiers[0], ImportSpecifier::Namespace(_))
        ));
        assert!(matches!(
            program.get(2),
            Some(Stmt::Import(ImportDecl { specifiers, .. })) if specifiers.is_empty()
        ));
    }

    #[test]
    fn test_parse_export_destructuring_names() {
        let source = "export const { a, b: [c, ...d], e = 1 } = obj, f = 2;";
        let program = parse(source).unwrap();

        let Some(Stmt::ExportDecl(decl)) = program.get(0) else {
            panic!("expected export declaration");
        };
        assert_eq!(decl.kind, DeclKind::Var);
        assert_eq!(names(decl), vec!["a", "c", "d", "e", "f"]);
        assert_eq!(decl.decl.text(source), "const { a, b: [c, ...d], e = 1 } = obj, f = 2;");
    }

    #[test]
    fn test_parse_export_function_and_class() {
        let source = "export async function load() { return 1; }\nexport class Store extends Base {}";
        let program = parse(source).unwrap();

        let Some(Stmt::ExportDecl(func)) = program.get(0) else {
            panic!("expected function export");
        };
        assert_eq!(func.kind, DeclKind::Function);
        assert_eq!(func.decl.text(source), "async function load() { return 1; }");
        assert_eq!(names(func), vec!["load"]);

        let Some(Stmt::ExportDecl(class)) = program.get(2) else {
            panic!("expected class export");
        };
        assert_eq!(class.kind, DeclKind::Class);
        assert_eq!(names(class), vec!["Store"]);
    }

    #[test]
    fn test_parse_export_default_anonymous_function() {
        let source = "export default function(){ return 1; }";
        let program = parse(source).unwrap();

        match program.get(0) {
            Some(Stmt::ExportDefault(ExportDefault::Decl { kind, name, decl, keyword_end, .. })) => {
                assert_eq!(*kind, DeclKind::Function);
                assert!(name.is_none());
                assert_eq!(decl.text(source), "function(){ return 1; }");
                assert_eq!(&source[..*keyword_end], "export default function");
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_parse_export_default_expression_stops_at_line_end() {
        let source = "export default a + b\nconsole.log(1)";
        let program = parse(source).unwrap();

        match program.get(0) {
            Some(Stmt::ExportDefault(ExportDefault::Expr { expr, .. })) => {
                assert_eq!(expr.text(source), "a + b");
            }
            other => panic!("unexpected statement: {:?}", other),
        }
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn test_parse_reexports() {
        let program = parse("export * as ns from 'm';\nexport { a as default, b } from 'n';").unwrap();

        match program.get(0) {
            Some(Stmt::ExportAll(all)) => {
                assert_eq!(all.alias.as_ref().map(|alias| alias.as_str()), Some("ns"));
                assert_eq!(all.source.literal(), Some("m"));
            }
            other => panic!("unexpected statement: {:?}", other),
        }
        match program.get(2) {
            Some(Stmt::ExportNamed(named)) => {
                assert_eq!(named.specifiers.len(), 2);
                assert_eq!(named.specifiers[0].exported.as_str(), "default");
                assert_eq!(named.specifiers[1].local.as_str(), "b");
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_nested_and_dynamic_imports_stay_verbatim() {
        let source = "function f() { import('x'); }\nconst m = import.meta;\nimport a from 'a';";
        let program = parse(source).unwrap();

        assert_eq!(program.len(), 2);
        assert!(matches!(program.get(0), Some(Stmt::Verbatim(_))));
        assert!(matches!(program.get(1), Some(Stmt::Import(_))));
    }

    #[test]
    fn test_verbatim_gaps_cover_source() {
        let source = "// header\nimport a from 'a';\nconst x = 1;\nexport { x };\n";
        let program = parse(source).unwrap();

        let mut cursor = 0;
        for stmt in program.iter() {
            let span = match stmt {
                Stmt::Verbatim(fragment) => match fragment.pieces.as_slice() {
                    [Piece::Source(span)] => *span,
                    other => panic!("unexpected pieces: {:?}", other),
                },
                other => other.source_span().unwrap(),
            };
            assert_eq!(span.start, cursor);
            cursor = span.end;
        }
        assert_eq!(cursor, source.len());
    }

    #[test]
    fn test_dynamic_reexport_source() {
        let program = parse("export * from someModule;").unwrap();
        assert!(matches!(
            program.get(0),
            Some(Stmt::ExportAll(ExportAll { source: ModuleSource::Dynamic, .. }))
        ));
    }

    #[test]
    fn test_parse_errors() {
        let errors = parse("import { a from 'x';").unwrap_err();
        assert!(!errors.is_empty());

        let errors = parse("const s = 'unterminated\n").unwrap_err();
        assert_eq!(errors[0].message, "Unterminated string literal");
    }
}
