//! ES module to CommonJS statement rewriting

use kiln_ast::*;
use kiln_lexer::{Token, TokenKind};
use tracing::debug;

use crate::assign::rewrite_default_assignments;
use crate::names::{NameAllocator, NAME_PREFIX};

/// Rewrites the module statements of one program, in a single forward walk.
///
/// Holds the per-module one-shot state: whether the `__esModule` marker was
/// already emitted, and the name of the interop helper once one is needed.
pub struct ModuleRewriter<'a> {
    tokens: &'a [Token],
    names: NameAllocator,
    marker_inserted: bool,
    interop_helper: Option<String>,
    /// Declared names of `export default function/class` bindings
    default_bindings: Vec<String>,
    /// `export { a as b }` assignments, emitted once every binding exists
    local_exports: Vec<Stmt>,
}

impl<'a> ModuleRewriter<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        let mut names = NameAllocator::new();
        reserve_identifiers(&mut names, tokens);

        Self {
            tokens,
            names,
            marker_inserted: false,
            interop_helper: None,
            default_bindings: Vec::new(),
            local_exports: Vec::new(),
        }
    }

    pub fn rewrite(mut self, mut program: Program) -> Program {
        let mut index = 0;

        while index < program.len() {
            let Some(stmt) = program.get(index).cloned() else {
                break;
            };
            index = match stmt {
                Stmt::ExportAll(decl) => self.rewrite_export_all(&mut program, index, decl),
                Stmt::ExportNamed(decl) => self.rewrite_export_named(&mut program, index, decl),
                Stmt::ExportDecl(decl) => self.rewrite_export_decl(&mut program, index, decl),
                Stmt::ExportDefault(decl) => self.rewrite_export_default(&mut program, index, decl),
                Stmt::Import(decl) => self.rewrite_import(&mut program, index, decl),
                _ => index + 1,
            };
        }

        for export in std::mem::take(&mut self.local_exports) {
            program.push(export);
        }

        if let Some(helper) = self.interop_helper.take() {
            program.push(Stmt::InteropHelper { name: helper });
        }

        for name in std::mem::take(&mut self.default_bindings) {
            let count = rewrite_default_assignments(&mut program, self.tokens, &name);
            if count > 0 {
                debug!(name = name.as_str(), count, "rewrote default export reassignments");
            }
        }

        program
    }

    /// Inserts the `__esModule` marker before `index` the first time it is called.
    ///
    /// Returns the position of the statement that was at `index`.
    fn mark_module(&mut self, program: &mut Program, index: usize) -> usize {
        if self.marker_inserted {
            return index;
        }
        self.marker_inserted = true;
        program.insert(index, Stmt::ModuleMarker).end
    }

    fn interop_helper(&mut self) -> String {
        if let Some(name) = &self.interop_helper {
            return name.clone();
        }
        let name = self
            .names
            .allocate(&format!("{}interopRequireDefault", NAME_PREFIX));
        self.interop_helper = Some(name.clone());
        name
    }

    /// export * from "x" / export * as ns from "x"
    fn rewrite_export_all(&mut self, program: &mut Program, index: usize, decl: ExportAll) -> usize {
        let Some(source) = decl.source.literal() else {
            return index + 1;
        };
        let index = self.mark_module(program, index);

        let replacement = match decl.alias {
            Some(alias) => vec![Stmt::ExportAssign {
                exported: alias.as_str().to_string(),
                value: Expr::Require(source.to_string()),
            }],
            None => {
                let binding = self.names.for_specifier(source);
                vec![
                    Stmt::Require {
                        binding: Some(binding.clone()),
                        source: source.to_string(),
                    },
                    Stmt::ExportAllKeys { binding },
                ]
            }
        };

        program.replace_with(index, replacement).end
    }

    /// export { a as b } [from "x"]
    ///
    /// Local export lists may precede the declarations they name, so their
    /// assignments move to the end of the module.
    fn rewrite_export_named(&mut self, program: &mut Program, index: usize, decl: ExportNamed) -> usize {
        let source = match &decl.source {
            Some(source) => match source.literal() {
                Some(literal) => Some(literal.to_string()),
                None => return index + 1,
            },
            None => None,
        };
        let index = self.mark_module(program, index);

        let mut replacement = Vec::with_capacity(decl.specifiers.len() + 1);
        match source {
            Some(source) => {
                let binding = self.names.for_specifier(&source);
                replacement.push(Stmt::Require {
                    binding: Some(binding.clone()),
                    source,
                });
                for specifier in &decl.specifiers {
                    replacement.push(Stmt::ExportAssign {
                        exported: specifier.exported.as_str().to_string(),
                        value: Expr::Member {
                            object: binding.clone(),
                            property: specifier.local.as_str().to_string(),
                        },
                    });
                }
            }
            None => {
                for specifier in &decl.specifiers {
                    self.local_exports.push(Stmt::ExportAssign {
                        exported: specifier.exported.as_str().to_string(),
                        value: Expr::Ident(specifier.local.as_str().to_string()),
                    });
                }
            }
        }

        program.replace_with(index, replacement).end
    }

    /// export const/let/var/function/class ...
    fn rewrite_export_decl(&mut self, program: &mut Program, index: usize, decl: ExportDecl) -> usize {
        let index = self.mark_module(program, index);

        let mut replacement = Vec::with_capacity(decl.names.len() + 1);
        replacement.push(Stmt::Declaration {
            kind: decl.kind,
            text: Fragment::from_span(decl.decl),
        });
        for name in &decl.names {
            replacement.push(Stmt::ExportAssign {
                exported: name.value.name.clone(),
                value: Expr::Ident(name.value.name.clone()),
            });
        }

        program.replace_with(index, replacement).end
    }

    /// export default ...
    fn rewrite_export_default(&mut self, program: &mut Program, index: usize, decl: ExportDefault) -> usize {
        let index = self.mark_module(program, index);

        let replacement = match decl {
            ExportDefault::Decl {
                kind,
                name,
                decl,
                keyword_end,
                ..
            } => {
                let mut text = Fragment::from_span(decl);
                let name = match name {
                    Some(name) => {
                        self.default_bindings.push(name.value.name.clone());
                        name.value.name
                    }
                    None => {
                        let name = self.names.allocate(&format!("{}default", NAME_PREFIX));
                        text.insert_at(keyword_end, &format!(" {}", name));
                        name
                    }
                };

                let export = Stmt::ExportAssign {
                    exported: "default".to_string(),
                    value: Expr::Ident(name),
                };
                let declaration = Stmt::Declaration { kind, text };
                // Function declarations are hoisted, classes are not
                match kind {
                    DeclKind::Class => vec![declaration, export],
                    _ => vec![export, declaration],
                }
            }
            ExportDefault::Expr { expr, .. } => {
                let name = self.names.allocate(&format!("{}default", NAME_PREFIX));
                vec![
                    Stmt::VarBinding {
                        name: name.clone(),
                        init: Expr::Source(Fragment::from_span(expr)),
                    },
                    Stmt::ExportAssign {
                        exported: "default".to_string(),
                        value: Expr::Ident(name),
                    },
                ]
            }
        };

        program.replace_with(index, replacement).end
    }

    /// import ... from "x"
    fn rewrite_import(&mut self, program: &mut Program, index: usize, decl: ImportDecl) -> usize {
        let Some(source) = decl.source.literal() else {
            return index + 1;
        };

        if decl.specifiers.is_empty() {
            program.replace(
                index,
                Stmt::Require {
                    binding: None,
                    source: source.to_string(),
                },
            );
            return index + 1;
        }

        let binding = self.names.for_specifier(source);
        program.replace(
            index,
            Stmt::Require {
                binding: Some(binding.clone()),
                source: source.to_string(),
            },
        );

        // Inserted in reverse at the same position so they end up in source order
        let insert_at = index + 1;
        for specifier in decl.specifiers.iter().rev() {
            let stmt = match specifier {
                ImportSpecifier::Default(local) => Stmt::VarBinding {
                    name: local.value.name.clone(),
                    init: Expr::InteropDefault {
                        helper: self.interop_helper(),
                        binding: binding.clone(),
                    },
                },
                ImportSpecifier::Named { imported, local } => Stmt::VarBinding {
                    name: local.value.name.clone(),
                    init: Expr::Member {
                        object: binding.clone(),
                        property: imported.as_str().to_string(),
                    },
                },
                ImportSpecifier::Namespace(local) => Stmt::VarBinding {
                    name: local.value.name.clone(),
                    init: Expr::Ident(binding.clone()),
                },
            };
            program.insert(insert_at, stmt);
        }

        insert_at + decl.specifiers.len()
    }
}

fn reserve_identifiers(names: &mut NameAllocator, tokens: &[Token]) {
    for token in tokens {
        if token.kind == TokenKind::Identifier {
            names.reserve(token.value.as_str());
        }
        reserve_identifiers(names, &token.substitutions);
    }
}
