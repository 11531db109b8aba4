//! Module system definitions for the AST

use super::*;

/// Specifier of an import or re-export
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleSource {
    /// A plain string literal, e.g. `'./a'`
    Literal(String),

    /// Anything else the parser tolerated (left untouched by rewrites)
    Dynamic,
}

impl ModuleSource {
    pub fn literal(&self) -> Option<&str> {
        match self {
            ModuleSource::Literal(value) => Some(value),
            ModuleSource::Dynamic => None,
        }
    }
}

/// Name on the module surface: `foo` or `"foo-bar"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleExportName {
    Ident(String),
    Str(String),
}

impl ModuleExportName {
    pub fn as_str(&self) -> &str {
        match self {
            ModuleExportName::Ident(name) | ModuleExportName::Str(name) => name,
        }
    }

    /// True if the name can be written as a dotted property access.
    pub fn is_identifier(&self) -> bool {
        is_identifier_name(self.as_str())
    }
}

/// ASCII-conservative identifier check used when printing property accesses.
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '$')
}

/// Import declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: ModuleSource,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    /// import name from "module"
    Default(Node<Ident>),

    /// import * as name from "module"
    Namespace(Node<Ident>),

    /// import { name } from "module" or import { name as alias } from "module"
    Named {
        imported: ModuleExportName,
        local: Node<Ident>,
    },
}

/// export * from "module" / export * as name from "module"
#[derive(Debug, Clone, PartialEq)]
pub struct ExportAll {
    pub source: ModuleSource,
    pub alias: Option<ModuleExportName>,
    pub span: Span,
}

/// export { a, b as c } [from "module"]
#[derive(Debug, Clone, PartialEq)]
pub struct ExportNamed {
    pub specifiers: Vec<ExportSpecifier>,
    pub source: Option<ModuleSource>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
    pub local: ModuleExportName,
    pub exported: ModuleExportName,
}

/// Kind of a declaration carried through the rewrite as text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Function,
    Class,
}

/// export const/let/var/function/class ...
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDecl {
    pub kind: DeclKind,
    /// The declaration without the `export` keyword
    pub decl: Span,
    /// Every identifier bound by the declaration, in source order
    pub names: Vec<Node<Ident>>,
    pub span: Span,
}

/// export default ...
#[derive(Debug, Clone, PartialEq)]
pub enum ExportDefault {
    /// export default function [name]() {} / export default class [name] {}
    Decl {
        kind: DeclKind,
        name: Option<Node<Ident>>,
        /// The declaration without `export default`
        decl: Span,
        /// Byte offset just past `function`, `function*` or `class`
        keyword_end: usize,
        span: Span,
    },

    /// export default <expression>
    Expr { expr: Span, span: Span },
}
