//! Statement definitions for the AST

use super::*;

/// Top-level statement.
///
/// Parsed variants describe module syntax found in the source; synthesized
/// variants are produced by the rewriter and carry only what the code
/// generator needs to print them.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Source text between module statements, copied through unchanged
    Verbatim(Fragment),

    /// import ... from "module"
    Import(ImportDecl),

    /// export * [as name] from "module"
    ExportAll(ExportAll),

    /// export { ... } [from "module"]
    ExportNamed(ExportNamed),

    /// export <declaration>
    ExportDecl(ExportDecl),

    /// export default ...
    ExportDefault(ExportDefault),

    /// `var binding = require("source");` or a bare `require("source");`
    Require {
        binding: Option<String>,
        source: String,
    },

    /// `var name = init;`
    VarBinding { name: String, init: Expr },

    /// `exports.<exported> = value;`
    ExportAssign { exported: String, value: Expr },

    /// Copies every own key of `binding` except `default`/`__esModule` onto exports
    ExportAllKeys { binding: String },

    /// A declaration kept from the source (export keyword stripped)
    Declaration { kind: DeclKind, text: Fragment },

    /// Marks the export surface as module-shaped
    ModuleMarker,

    /// Helper that normalizes a required value into `{ default }` shape
    InteropHelper { name: String },
}

/// Expression forms the rewriter can synthesize
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),

    /// `object.property` (computed access when the property is not an identifier)
    Member { object: String, property: String },

    /// `require("source")`
    Require(String),

    /// `helper(binding).default`
    InteropDefault { helper: String, binding: String },

    /// Expression text taken from the source
    Source(Fragment),
}

impl Stmt {
    /// True for statements the rewriter created rather than parsed.
    pub fn is_synthesized(&self) -> bool {
        matches!(
            self,
            Stmt::Require { .. }
                | Stmt::VarBinding { .. }
                | Stmt::ExportAssign { .. }
                | Stmt::ExportAllKeys { .. }
                | Stmt::Declaration { .. }
                | Stmt::ModuleMarker
                | Stmt::InteropHelper { .. }
        )
    }

    pub fn is_export(&self) -> bool {
        matches!(
            self,
            Stmt::ExportAll(_) | Stmt::ExportNamed(_) | Stmt::ExportDecl(_) | Stmt::ExportDefault(_)
        )
    }

    /// Span of a parsed module statement.
    pub fn source_span(&self) -> Option<Span> {
        match self {
            Stmt::Import(decl) => Some(decl.span),
            Stmt::ExportAll(decl) => Some(decl.span),
            Stmt::ExportNamed(decl) => Some(decl.span),
            Stmt::ExportDecl(decl) => Some(decl.span),
            Stmt::ExportDefault(ExportDefault::Decl { span, .. })
            | Stmt::ExportDefault(ExportDefault::Expr { span, .. }) => Some(*span),
            _ => None,
        }
    }

    /// Source-backed text this statement carries, if any.
    pub fn fragment_mut(&mut self) -> Option<&mut Fragment> {
        match self {
            Stmt::Verbatim(fragment) => Some(fragment),
            Stmt::Declaration { text, .. } => Some(text),
            Stmt::VarBinding {
                init: Expr::Source(fragment),
                ..
            } => Some(fragment),
            Stmt::ExportAssign {
                value: Expr::Source(fragment),
                ..
            } => Some(fragment),
            _ => None,
        }
    }
}
