//! Binding pattern parsing
//!
//! Patterns are only walked to collect the identifiers they bind; default
//! values and computed keys are skipped.

use super::*;

impl Parser {
    /// Parses `pattern [= init], ...` after `var`/`let`/`const`.
    pub(crate) fn parse_var_declarators(&mut self, names: &mut Vec<Node<Ident>>) -> ParseResult<()> {
        loop {
            self.parse_binding_pattern(names)?;
            if self.check(&TokenKind::Assign) {
                self.advance();
                self.skip_expression(true)?;
            }

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        Ok(())
    }

    pub(crate) fn parse_binding_pattern(&mut self, names: &mut Vec<Node<Ident>>) -> ParseResult<()> {
        match self.current_token().kind {
            TokenKind::Identifier => {
                names.push(self.parse_identifier()?);
                Ok(())
            }
            TokenKind::LBrace => self.parse_object_pattern(names),
            TokenKind::LBracket => self.parse_array_pattern(names),
            kind => Err(self.error(format!("Expected binding pattern, found {:?}", kind))),
        }
    }

    fn parse_object_pattern(&mut self, names: &mut Vec<Node<Ident>>) -> ParseResult<()> {
        self.consume(TokenKind::LBrace)?;

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.check(&TokenKind::DotDotDot) {
                self.advance();
                self.parse_binding_pattern(names)?;
            } else {
                let key = self.current_token().clone();
                match key.kind {
                    TokenKind::LBracket => {
                        self.skip_balanced()?;
                        self.consume(TokenKind::Colon)?;
                        self.parse_binding_pattern(names)?;
                    }
                    TokenKind::StringLiteral | TokenKind::NumberLiteral => {
                        self.advance();
                        self.consume(TokenKind::Colon)?;
                        self.parse_binding_pattern(names)?;
                    }
                    _ if key.is_identifier_name() => {
                        self.advance();
                        if self.check(&TokenKind::Colon) {
                            self.advance();
                            self.parse_binding_pattern(names)?;
                        } else if key.kind == TokenKind::Identifier {
                            // Shorthand `{ a }` binds the key itself
                            names.push(Node::new(Ident::new(key.value), key.span));
                        } else {
                            return Err(ParseError::new(
                                format!("Unexpected keyword '{}' in binding", key.value),
                                key.span,
                            ));
                        }
                    }
                    kind => {
                        return Err(self.error(format!("Unexpected {:?} in object pattern", kind)));
                    }
                }
                self.parse_default_value()?;
            }

            if !self.check(&TokenKind::RBrace) {
                self.consume(TokenKind::Comma)?;
            }
        }

        self.consume(TokenKind::RBrace)?;
        Ok(())
    }

    fn parse_array_pattern(&mut self, names: &mut Vec<Node<Ident>>) -> ParseResult<()> {
        self.consume(TokenKind::LBracket)?;

        while !self.check(&TokenKind::RBracket) && !self.is_at_end() {
            // Hole
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }

            if self.check(&TokenKind::DotDotDot) {
                self.advance();
                self.parse_binding_pattern(names)?;
            } else {
                self.parse_binding_pattern(names)?;
                self.parse_default_value()?;
            }

            if !self.check(&TokenKind::RBracket) {
                self.consume(TokenKind::Comma)?;
            }
        }

        self.consume(TokenKind::RBracket)?;
        Ok(())
    }

    fn parse_default_value(&mut self) -> ParseResult<()> {
        if self.check(&TokenKind::Assign) {
            self.advance();
            self.skip_expression(true)?;
        }
        Ok(())
    }
}
