//! Helper methods and utilities

use super::*;

impl Parser {
    pub(crate) fn parse_identifier(&mut self) -> ParseResult<Node<Ident>> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Node::new(Ident::new(token.value.clone()), token.span))
    }

    /// Parses a name on the module surface: an identifier name (keywords
    /// included, e.g. `default`) or a string literal.
    pub(crate) fn parse_module_export_name(&mut self) -> ParseResult<Node<ModuleExportName>> {
        let token = self.current_token().clone();
        let name = if token.kind == TokenKind::StringLiteral {
            ModuleExportName::Str(token.value)
        } else if token.is_identifier_name() {
            ModuleExportName::Ident(token.value)
        } else {
            return Err(self.error(format!("Expected export name, found {:?}", token.kind)));
        };
        self.advance();
        Ok(Node::new(name, token.span))
    }

    /// Parses the `from "module"` clause of an import or re-export.
    pub(crate) fn parse_from_clause(&mut self) -> ParseResult<ModuleSource> {
        if !self.current_token().is_word("from") {
            return Err(self.error(format!(
                "Expected 'from', found {:?}",
                self.current_token().kind
            )));
        }
        self.advance();
        self.parse_module_source()
    }

    pub(crate) fn parse_module_source(&mut self) -> ParseResult<ModuleSource> {
        if self.check(&TokenKind::StringLiteral) {
            let value = self.advance().value.clone();
            self.skip_import_attributes()?;
            return Ok(ModuleSource::Literal(value));
        }
        if self.is_at_end() {
            return Err(self.error("Expected module specifier".to_string()));
        }
        self.skip_expression(false)?;
        Ok(ModuleSource::Dynamic)
    }

    /// Skips `with { ... }` / `assert { ... }` after a module specifier.
    fn skip_import_attributes(&mut self) -> ParseResult<()> {
        let token = self.current_token();
        let is_attributes = !token.newline_before
            && (token.kind == TokenKind::With || token.is_word("assert"))
            && self.peek_kind(1) == Some(&TokenKind::LBrace);
        if is_attributes {
            self.advance();
            self.skip_balanced()?;
        }
        Ok(())
    }

    // =========================================================================
    // Utility Methods (Token Manipulation)
    // =========================================================================

    pub(crate) fn current_token(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    pub(crate) fn previous_token(&self) -> &Token {
        &self.tokens[(self.current.saturating_sub(1)).min(self.tokens.len() - 1)]
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous_token()
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        !self.is_at_end() && &self.current_token().kind == kind
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + offset).map(|token| &token.kind)
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.current_token().kind == TokenKind::Eof
    }

    pub(crate) fn consume(&mut self, kind: TokenKind) -> ParseResult<&Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!(
                "Expected {:?}, found {:?}",
                kind,
                self.current_token().kind
            )))
        }
    }

    pub(crate) fn consume_semicolon(&mut self) {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// End offset of the last consumed token.
    pub(crate) fn last_end(&self) -> usize {
        if self.current == 0 {
            return 0;
        }
        self.previous_token().span.end
    }

    pub(crate) fn error(&self, message: String) -> ParseError {
        ParseError {
            message,
            span: self.current_token().span,
        }
    }
}
