//! Core Parser struct and main parsing methods

use super::*;

/// Top-level module parser.
///
/// Scans the token stream at bracket depth zero. `import` and `export`
/// statements found there are parsed into typed nodes; every byte between
/// them is kept as a verbatim source range.
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) current: usize,
}

impl Parser {
    /// Creates a new parser from a token stream
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map_or(true, |token| token.kind != TokenKind::Eof) {
            let end = tokens.last().map_or(0, |token| token.span.end);
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span::new(end, end),
                value: String::new(),
                newline_before: false,
                substitutions: Vec::new(),
            });
        }
        Self { tokens, current: 0 }
    }

    /// Parses a complete program
    pub fn parse_program(&mut self) -> Result<Program, Vec<ParseError>> {
        let mut errors: Vec<ParseError> = self
            .tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Error)
            .map(|token| ParseError::new(token.value.clone(), token.span))
            .collect();
        if !errors.is_empty() {
            return Err(errors);
        }

        let end = self.tokens.last().map_or(0, |token| token.span.end);
        let mut program = Program::new(Span::new(0, end));
        let mut cursor = 0;
        let mut depth = 0usize;

        while !self.is_at_end() {
            if depth == 0 && self.at_module_statement() {
                let start = self.current_token().span.start;
                match self.parse_module_item() {
                    Ok(stmt) => {
                        if start > cursor {
                            program.push(Stmt::Verbatim(Fragment::from_span(Span::new(
                                cursor, start,
                            ))));
                        }
                        program.push(stmt);
                        cursor = self.last_end();
                    }
                    Err(err) => {
                        errors.push(err);
                        self.synchronize();
                    }
                }
                continue;
            }

            let kind = self.current_token().kind;
            if kind.is_open_bracket() {
                depth += 1;
            } else if kind.is_close_bracket() {
                depth = depth.saturating_sub(1);
            }
            self.advance();
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        if end > cursor {
            program.push(Stmt::Verbatim(Fragment::from_span(Span::new(cursor, end))));
        }
        Ok(program)
    }

    /// `import` not used as `import(...)`/`import.meta`, or any `export`.
    fn at_module_statement(&self) -> bool {
        match self.current_token().kind {
            TokenKind::Import => !matches!(
                self.peek_kind(1),
                Some(TokenKind::LParen) | Some(TokenKind::Dot)
            ),
            TokenKind::Export => true,
            _ => false,
        }
    }

    /// Skips past a statement that failed to parse.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous_token().kind == TokenKind::Semicolon
                || self.current_token().newline_before
            {
                return;
            }
            self.advance();
        }
    }

    // =========================================================================
    // Module Items
    // =========================================================================

    pub(crate) fn parse_module_item(&mut self) -> ParseResult<Stmt> {
        match self.current_token().kind {
            TokenKind::Import => Ok(Stmt::Import(self.parse_import_decl()?)),
            TokenKind::Export => self.parse_export_decl(),
            kind => Err(self.error(format!("Expected import or export, found {:?}", kind))),
        }
    }

    // =========================================================================
    // Import/Export
    // =========================================================================

    pub(crate) fn parse_import_decl(&mut self) -> ParseResult<ImportDecl> {
        let start = self.consume(TokenKind::Import)?.span.start;
        let mut specifiers = Vec::new();

        // import "module"
        if self.check(&TokenKind::StringLiteral) {
            let source = self.parse_module_source()?;
            self.consume_semicolon();
            return Ok(ImportDecl {
                specifiers,
                source,
                span: Span::new(start, self.last_end()),
            });
        }

        // import name [, ...]
        let mut expect_more = true;
        if self.check(&TokenKind::Identifier) {
            specifiers.push(ImportSpecifier::Default(self.parse_identifier()?));
            expect_more = self.check(&TokenKind::Comma);
            if expect_more {
                self.advance();
            }
        }

        if expect_more {
            match self.current_token().kind {
                // import * as name
                TokenKind::Star => {
                    self.advance();
                    self.expect_word("as")?;
                    let local = self.parse_identifier()?;
                    specifiers.push(ImportSpecifier::Namespace(local));
                }
                // import { a, b as c }
                TokenKind::LBrace => self.parse_named_imports(&mut specifiers)?,
                kind => {
                    return Err(self.error(format!("Unexpected {:?} in import declaration", kind)));
                }
            }
        }

        let source = self.parse_from_clause()?;
        self.consume_semicolon();

        Ok(ImportDecl {
            specifiers,
            source,
            span: Span::new(start, self.last_end()),
        })
    }

    fn parse_named_imports(&mut self, specifiers: &mut Vec<ImportSpecifier>) -> ParseResult<()> {
        self.consume(TokenKind::LBrace)?;

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let plain = self.check(&TokenKind::Identifier);
            let imported = self.parse_module_export_name()?;

            let local = if self.current_token().is_word("as") {
                self.advance();
                self.parse_identifier()?
            } else if plain {
                Node::new(Ident::new(imported.value.as_str()), imported.span)
            } else {
                return Err(ParseError::new(
                    format!("Expected 'as' after import name '{}'", imported.value.as_str()),
                    imported.span,
                ));
            };

            specifiers.push(ImportSpecifier::Named {
                imported: imported.value,
                local,
            });

            if !self.check(&TokenKind::RBrace) {
                self.consume(TokenKind::Comma)?;
            }
        }

        self.consume(TokenKind::RBrace)?;
        Ok(())
    }

    pub(crate) fn parse_export_decl(&mut self) -> ParseResult<Stmt> {
        let start = self.consume(TokenKind::Export)?.span.start;

        match self.current_token().kind {
            // export * [as name] from "module"
            TokenKind::Star => {
                self.advance();
                let alias = if self.current_token().is_word("as") {
                    self.advance();
                    Some(self.parse_module_export_name()?.value)
                } else {
                    None
                };
                let source = self.parse_from_clause()?;
                self.consume_semicolon();
                Ok(Stmt::ExportAll(ExportAll {
                    source,
                    alias,
                    span: Span::new(start, self.last_end()),
                }))
            }

            // export { a, b as c } [from "module"]
            TokenKind::LBrace => {
                let specifiers = self.parse_export_specifiers()?;
                let source = if self.current_token().is_word("from") {
                    Some(self.parse_from_clause()?)
                } else {
                    None
                };
                self.consume_semicolon();
                Ok(Stmt::ExportNamed(ExportNamed {
                    specifiers,
                    source,
                    span: Span::new(start, self.last_end()),
                }))
            }

            TokenKind::Default => self.parse_export_default(start),

            // export var/let/const ...
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let decl_start = self.advance().span.start;
                let mut names = Vec::new();
                self.parse_var_declarators(&mut names)?;
                self.consume_semicolon();
                let end = self.last_end();
                Ok(Stmt::ExportDecl(ExportDecl {
                    kind: DeclKind::Var,
                    decl: Span::new(decl_start, end),
                    names,
                    span: Span::new(start, end),
                }))
            }

            // export [async] function name() {} / export class Name {}
            TokenKind::Function | TokenKind::Class | TokenKind::Identifier => {
                let decl_start = self.current_token().span.start;
                let (kind, skipped) = self.parse_hoistable_declaration()?;
                let Some(name) = skipped.name else {
                    return Err(ParseError::new(
                        "Exported declarations require a name",
                        Span::new(decl_start, self.last_end()),
                    ));
                };
                let end = self.last_end();
                Ok(Stmt::ExportDecl(ExportDecl {
                    kind,
                    decl: Span::new(decl_start, end),
                    names: vec![name],
                    span: Span::new(start, end),
                }))
            }

            kind => Err(self.error(format!("Unexpected {:?} after export", kind))),
        }
    }

    fn parse_export_specifiers(&mut self) -> ParseResult<Vec<ExportSpecifier>> {
        self.consume(TokenKind::LBrace)?;
        let mut specifiers = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let local = self.parse_module_export_name()?.value;
            let exported = if self.current_token().is_word("as") {
                self.advance();
                self.parse_module_export_name()?.value
            } else {
                local.clone()
            };
            specifiers.push(ExportSpecifier { local, exported });

            if !self.check(&TokenKind::RBrace) {
                self.consume(TokenKind::Comma)?;
            }
        }

        self.consume(TokenKind::RBrace)?;
        Ok(specifiers)
    }

    fn parse_export_default(&mut self, start: usize) -> ParseResult<Stmt> {
        self.consume(TokenKind::Default)?;
        let decl_start = self.current_token().span.start;

        if matches!(self.current_token().kind, TokenKind::Function | TokenKind::Class)
            || self.at_async_function()
        {
            let (kind, skipped) = self.parse_hoistable_declaration()?;
            let end = self.last_end();
            return Ok(Stmt::ExportDefault(ExportDefault::Decl {
                kind,
                name: skipped.name,
                decl: Span::new(decl_start, end),
                keyword_end: skipped.keyword_end,
                span: Span::new(start, end),
            }));
        }

        self.skip_expression(false)?;
        let expr = Span::new(decl_start, self.last_end());
        self.consume_semicolon();

        Ok(Stmt::ExportDefault(ExportDefault::Expr {
            expr,
            span: Span::new(start, self.last_end()),
        }))
    }

    /// Parses `[async] function ...` or `class ...`.
    fn parse_hoistable_declaration(&mut self) -> ParseResult<(DeclKind, SkippedDecl)> {
        if self.at_async_function() {
            self.advance();
        }
        match self.current_token().kind {
            TokenKind::Function => Ok((DeclKind::Function, self.skip_function()?)),
            TokenKind::Class => Ok((DeclKind::Class, self.skip_class()?)),
            kind => Err(self.error(format!("Expected declaration, found {:?}", kind))),
        }
    }

    /// `async function` with no line break between the two words.
    fn at_async_function(&self) -> bool {
        self.current_token().is_word("async")
            && self
                .tokens
                .get(self.current + 1)
                .map_or(false, |next| next.kind == TokenKind::Function && !next.newline_before)
    }

    fn expect_word(&mut self, word: &str) -> ParseResult<()> {
        if self.current_token().is_word(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "Expected '{}', found {:?}",
                word,
                self.current_token().kind
            )))
        }
    }
}
