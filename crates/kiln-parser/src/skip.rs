//! Skipping over code the parser does not model
//!
//! Everything below the module surface is consumed as balanced token runs.
//! Expression ends are found with a semicolon-insertion heuristic: a token
//! that starts a new line ends the expression when the previous token can
//! end one and the new token cannot continue it.

use super::*;

/// What was learned while skipping a function or class declaration
#[derive(Debug, Clone)]
pub(crate) struct SkippedDecl {
    pub name: Option<Node<Ident>>,
    /// Byte offset just past `function`, `function*` or `class`
    pub keyword_end: usize,
}

impl Parser {
    /// Skips from an opening delimiter to its matching closing delimiter.
    pub(crate) fn skip_balanced(&mut self) -> ParseResult<()> {
        let open = self.current_token().clone();
        let Some(closing) = open.kind.closing() else {
            return Err(self.error(format!("Expected opening delimiter, found {:?}", open.kind)));
        };

        let mut stack = vec![closing];
        self.advance();

        while let Some(&expected) = stack.last() {
            if self.is_at_end() {
                return Err(ParseError::new(
                    format!("Unclosed delimiter, expected {:?}", expected),
                    open.span,
                ));
            }
            let kind = self.current_token().kind;
            if let Some(close) = kind.closing() {
                stack.push(close);
            } else if kind.is_close_bracket() {
                if kind != expected {
                    return Err(self.error(format!(
                        "Mismatched delimiter: expected {:?}, found {:?}",
                        expected, kind
                    )));
                }
                stack.pop();
            }
            self.advance();
        }

        Ok(())
    }

    /// Skips one expression (an assignment expression when `stop_at_comma`).
    ///
    /// Stops before `;`, before an unmatched closing delimiter, at end of
    /// input, or where a semicolon would be inserted.
    pub(crate) fn skip_expression(&mut self, stop_at_comma: bool) -> ParseResult<()> {
        let start = self.current;

        while !self.is_at_end() {
            let token = self.current_token();
            let kind = token.kind;

            if self.current > start
                && token.newline_before
                && self.previous_token().kind.ends_expression()
                && !kind.continues_expression()
            {
                break;
            }

            match kind {
                TokenKind::Semicolon => break,
                TokenKind::Comma if stop_at_comma => break,
                _ if kind.is_close_bracket() => break,
                _ if kind.is_open_bracket() => self.skip_balanced()?,
                TokenKind::Function => {
                    self.skip_function()?;
                }
                TokenKind::Class => {
                    self.skip_class()?;
                }
                _ => {
                    self.advance();
                }
            }
        }

        if self.current == start {
            return Err(self.error(format!(
                "Expected expression, found {:?}",
                self.current_token().kind
            )));
        }
        Ok(())
    }

    /// Skips `function [*] [name] (params) { body }`.
    pub(crate) fn skip_function(&mut self) -> ParseResult<SkippedDecl> {
        let mut keyword_end = self.consume(TokenKind::Function)?.span.end;
        if self.check(&TokenKind::Star) {
            keyword_end = self.advance().span.end;
        }

        let name = if self.check(&TokenKind::Identifier) {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        self.expect_balanced(TokenKind::LParen)?;
        self.expect_balanced(TokenKind::LBrace)?;

        Ok(SkippedDecl { name, keyword_end })
    }

    /// Skips `class [name] [extends expr] { body }`.
    pub(crate) fn skip_class(&mut self) -> ParseResult<SkippedDecl> {
        let keyword_end = self.consume(TokenKind::Class)?.span.end;

        let name = if self.check(&TokenKind::Identifier) {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        if self.check(&TokenKind::Extends) {
            self.advance();
            // Heritage runs up to the class body
            while !self.check(&TokenKind::LBrace) {
                if self.is_at_end() {
                    return Err(self.error("Expected class body".to_string()));
                }
                match self.current_token().kind {
                    TokenKind::LParen | TokenKind::LBracket => self.skip_balanced()?,
                    TokenKind::Function => {
                        self.skip_function()?;
                    }
                    _ => {
                        self.advance();
                    }
                }
            }
        }

        self.expect_balanced(TokenKind::LBrace)?;

        Ok(SkippedDecl { name, keyword_end })
    }

    fn expect_balanced(&mut self, open: TokenKind) -> ParseResult<()> {
        if !self.check(&open) {
            return Err(self.error(format!(
                "Expected {:?}, found {:?}",
                open,
                self.current_token().kind
            )));
        }
        self.skip_balanced()
    }
}
