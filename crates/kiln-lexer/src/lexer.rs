use kiln_ast::Span;
use crate::token::{keyword_kind, Token, TokenKind};

/// The lexer/tokenizer for JavaScript module and script source.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current_pos: usize,
    current_char: Option<char>,
    /// Kind of the last significant token, used to tell `/` from a regex
    last_kind: Option<TokenKind>,
    saw_newline: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer from source code.
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.char_indices();
        let current_char = chars.next().map(|(_, c)| c);
        let mut lexer = Self {
            source,
            chars,
            current_pos: 0,
            current_char,
            last_kind: None,
            saw_newline: false,
        };
        lexer.skip_hashbang();
        lexer
    }

    /// Tokenizes the entire source code and returns all tokens.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Gets the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.saw_newline = false;
        if let Some(error_token) = self.skip_whitespace_and_comments() {
            return error_token;
        }

        let start = self.current_pos;
        let mut token = match self.current_char {
            None => Token::new(TokenKind::Eof, Span::new(start, start), String::new()),
            Some(ch) => match ch {
                '"' | '\'' => self.read_string_literal(ch),
                '`' => self.read_template_literal(),
                '0'..='9' => self.read_number(),
                '.' if matches!(self.peek(), Some('0'..='9')) => self.read_number(),
                '#' => self.read_private_name(),
                '/' if self.last_kind.map_or(true, TokenKind::allows_regex_after) => {
                    self.read_regex()
                }
                '\\' if self.peek() == Some('u') => self.read_identifier_or_keyword(),
                _ if ch.is_alphabetic() || ch == '_' || ch == '$' => {
                    self.read_identifier_or_keyword()
                }
                _ => self.read_punctuator(ch),
            },
        };

        token.newline_before = self.saw_newline;
        if token.kind != TokenKind::Error {
            self.last_kind = Some(token.kind);
        }
        token
    }

    // Helper methods

    fn advance(&mut self) {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos;
            self.current_char = Some(ch);
        } else {
            self.current_pos = self.source.len();
            self.current_char = None;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next().map(|(_, c)| c)
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.chars.clone().nth(n).map(|(_, c)| c)
    }

    fn make(&self, kind: TokenKind, start: usize) -> Token {
        let span = Span::new(start, self.current_pos);
        Token::new(kind, span, span.text(self.source).to_string())
    }

    fn error(&self, start: usize, message: &str) -> Token {
        Token::new(
            TokenKind::Error,
            Span::new(start, self.current_pos),
            message.to_string(),
        )
    }

    fn skip_hashbang(&mut self) {
        if self.current_char == Some('#') && self.peek() == Some('!') {
            while let Some(ch) = self.current_char {
                if ch == '\n' {
                    break;
                }
                self.advance();
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Option<Token> {
        loop {
            match self.current_char {
                Some(ch) if is_line_terminator(ch) => {
                    self.saw_newline = true;
                    self.advance();
                }
                Some(ch) if ch.is_whitespace() || ch == '\u{feff}' => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek() == Some('/') {
                        self.skip_single_line_comment();
                    } else if self.peek() == Some('*') {
                        let start = self.current_pos;
                        if !self.skip_multi_line_comment() {
                            return Some(self.error(start, "Unterminated multi-line comment"));
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        None
    }

    fn skip_single_line_comment(&mut self) {
        // Line terminator is left for skip_whitespace_and_comments to record
        while let Some(ch) = self.current_char {
            if is_line_terminator(ch) {
                break;
            }
            self.advance();
        }
    }

    fn skip_multi_line_comment(&mut self) -> bool {
        // Skip /*
        self.advance();
        self.advance();

        while let Some(ch) = self.current_char {
            if ch == '*' && self.peek() == Some('/') {
                self.advance(); // *
                self.advance(); // /
                return true;
            }
            if is_line_terminator(ch) {
                self.saw_newline = true;
            }
            self.advance();
        }
        false
    }

    fn read_string_literal(&mut self, quote: char) -> Token {
        let start = self.current_pos;
        self.advance(); // Skip opening quote

        let mut value = String::new();

        while let Some(ch) = self.current_char {
            if ch == quote {
                self.advance(); // Skip closing quote
                return Token::new(
                    TokenKind::StringLiteral,
                    Span::new(start, self.current_pos),
                    value,
                );
            } else if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    match escaped {
                        'u' => {
                            self.advance();
                            value.push(self.read_unicode_escape());
                        }
                        'x' => {
                            self.advance();
                            value.push(self.read_hex_escape());
                        }
                        '\r' => {
                            // Line continuation, optionally \r\n
                            self.advance();
                            if self.current_char == Some('\n') {
                                self.advance();
                            }
                        }
                        '\n' | '\u{2028}' | '\u{2029}' => self.advance(),
                        _ => {
                            let unescaped = match escaped {
                                'n' => '\n',
                                'r' => '\r',
                                't' => '\t',
                                'b' => '\u{8}',
                                'f' => '\u{c}',
                                'v' => '\u{b}',
                                '0' => '\0',
                                _ => escaped,
                            };
                            value.push(unescaped);
                            self.advance();
                        }
                    }
                }
            } else if ch == '\n' || ch == '\r' {
                return self.error(start, "Unterminated string literal");
            } else {
                value.push(ch);
                self.advance();
            }
        }

        self.error(start, "Unterminated string literal")
    }

    fn read_unicode_escape(&mut self) -> char {
        let mut digits = String::new();
        if self.current_char == Some('{') {
            self.advance();
            while let Some(ch) = self.current_char {
                self.advance();
                if ch == '}' {
                    break;
                }
                digits.push(ch);
            }
        } else {
            for _ in 0..4 {
                match self.current_char {
                    Some(ch) if ch.is_ascii_hexdigit() => {
                        digits.push(ch);
                        self.advance();
                    }
                    _ => break,
                }
            }
        }
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or('\u{fffd}')
    }

    fn read_hex_escape(&mut self) -> char {
        let mut digits = String::new();
        for _ in 0..2 {
            match self.current_char {
                Some(ch) if ch.is_ascii_hexdigit() => {
                    digits.push(ch);
                    self.advance();
                }
                _ => break,
            }
        }
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or('\u{fffd}')
    }

    /// Reads a whole template literal, substitutions included, as one token.
    /// The token value is the raw text between the backticks; the tokens of
    /// every `${ ... }` are kept in `substitutions`.
    fn read_template_literal(&mut self) -> Token {
        let start = self.current_pos;
        // Substitutions are lexed with next_token, which resets this
        let newline_before = self.saw_newline;
        let mut substitutions = Vec::new();
        let result = self.read_template_body(start, &mut substitutions);
        self.saw_newline = newline_before;

        if let Err(error) = result {
            return error;
        }
        let raw = &self.source[start + 1..self.current_pos - 1];
        let mut token = Token::new(
            TokenKind::TemplateLiteral,
            Span::new(start, self.current_pos),
            raw.to_string(),
        );
        token.substitutions = substitutions;
        token
    }

    fn read_template_body(&mut self, start: usize, substitutions: &mut Vec<Token>) -> Result<(), Token> {
        self.advance(); // Skip opening backtick

        while let Some(ch) = self.current_char {
            match ch {
                '`' => {
                    self.advance();
                    return Ok(());
                }
                '\\' => {
                    self.advance();
                    self.advance();
                }
                '$' if self.peek() == Some('{') => {
                    self.advance();
                    self.advance();
                    self.read_substitution(start, substitutions)?;
                }
                _ => self.advance(),
            }
        }
        Err(self.error(start, "Unterminated template literal"))
    }

    /// Tokenizes the inside of `${ ... }` up to and including the `}` that
    /// closes it.
    fn read_substitution(&mut self, start: usize, substitutions: &mut Vec<Token>) -> Result<(), Token> {
        // An expression starts here, so a leading `/` opens a regex
        self.last_kind = Some(TokenKind::LBrace);
        let mut depth = 0usize;

        loop {
            let token = self.next_token();
            match token.kind {
                TokenKind::Eof => return Err(self.error(start, "Unterminated template literal")),
                TokenKind::Error => return Err(token),
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth == 0 => return Ok(()),
                TokenKind::RBrace => depth -= 1,
                _ => {}
            }
            substitutions.push(token);
        }
    }

    fn read_regex(&mut self) -> Token {
        let start = self.current_pos;
        self.advance(); // Skip opening slash

        let mut in_class = false;
        loop {
            match self.current_char {
                None => return self.error(start, "Unterminated regular expression"),
                Some(ch) if is_line_terminator(ch) => {
                    return self.error(start, "Unterminated regular expression")
                }
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some('[') => {
                    in_class = true;
                    self.advance();
                }
                Some(']') => {
                    in_class = false;
                    self.advance();
                }
                Some('/') if !in_class => {
                    self.advance();
                    break;
                }
                Some(_) => self.advance(),
            }
        }

        // Flags
        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() {
                self.advance();
            } else {
                break;
            }
        }

        self.make(TokenKind::RegexLiteral, start)
    }

    fn read_number(&mut self) -> Token {
        let start = self.current_pos;
        let radix_prefixed = self.current_char == Some('0')
            && matches!(self.peek(), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B'));
        let mut seen_dot = false;
        let mut prev = '\0';

        while let Some(ch) = self.current_char {
            let accept = match ch {
                '0'..='9' | '_' => true,
                '.' if !seen_dot && !radix_prefixed => {
                    seen_dot = true;
                    true
                }
                '+' | '-' => !radix_prefixed && matches!(prev, 'e' | 'E'),
                _ => ch.is_ascii_alphanumeric(),
            };
            if !accept {
                break;
            }
            prev = ch;
            self.advance();
        }

        self.make(TokenKind::NumberLiteral, start)
    }

    fn read_private_name(&mut self) -> Token {
        let start = self.current_pos;
        self.advance(); // #
        while let Some(ch) = self.current_char {
            if is_identifier_part(ch) {
                self.advance();
            } else {
                break;
            }
        }
        if self.current_pos == start + 1 {
            return self.error(start, "Unexpected character: #");
        }
        self.make(TokenKind::PrivateName, start)
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let start = self.current_pos;
        let mut value = String::new();

        while let Some(ch) = self.current_char {
            if ch == '\\' && self.peek() == Some('u') {
                self.advance();
                self.advance();
                value.push(self.read_unicode_escape());
            } else if is_identifier_part(ch) {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Property names after a dot are never keywords
        let after_dot = matches!(self.last_kind, Some(TokenKind::Dot | TokenKind::QuestionDot));
        let kind = match keyword_kind(&value) {
            Some(kind) if !after_dot => kind,
            _ => TokenKind::Identifier,
        };

        Token::new(kind, Span::new(start, self.current_pos), value)
    }

    fn read_punctuator(&mut self, ch: char) -> Token {
        let start = self.current_pos;
        let next = self.peek();
        let third = self.peek_nth(1);
        let fourth = self.peek_nth(2);

        let (kind, len) = match ch {
            '(' => (TokenKind::LParen, 1),
            ')' => (TokenKind::RParen, 1),
            '{' => (TokenKind::LBrace, 1),
            '}' => (TokenKind::RBrace, 1),
            '[' => (TokenKind::LBracket, 1),
            ']' => (TokenKind::RBracket, 1),
            ';' => (TokenKind::Semicolon, 1),
            ',' => (TokenKind::Comma, 1),
            ':' => (TokenKind::Colon, 1),
            '@' => (TokenKind::At, 1),
            '~' => (TokenKind::Tilde, 1),
            '.' => match (next, third) {
                (Some('.'), Some('.')) => (TokenKind::DotDotDot, 3),
                _ => (TokenKind::Dot, 1),
            },
            '?' => match (next, third) {
                (Some('?'), Some('=')) => (TokenKind::AssignOp, 3),
                (Some('?'), _) => (TokenKind::Operator, 2),
                // `a?.5:b` is a conditional, not optional chaining
                (Some('.'), Some('0'..='9')) => (TokenKind::Question, 1),
                (Some('.'), _) => (TokenKind::QuestionDot, 2),
                _ => (TokenKind::Question, 1),
            },
            '=' => match (next, third) {
                (Some('='), Some('=')) => (TokenKind::Operator, 3),
                (Some('='), _) => (TokenKind::Operator, 2),
                (Some('>'), _) => (TokenKind::Arrow, 2),
                _ => (TokenKind::Assign, 1),
            },
            '!' => match (next, third) {
                (Some('='), Some('=')) => (TokenKind::Operator, 3),
                (Some('='), _) => (TokenKind::Operator, 2),
                _ => (TokenKind::Bang, 1),
            },
            '+' | '-' => match next {
                Some(n) if n == ch => {
                    if ch == '+' {
                        (TokenKind::Increment, 2)
                    } else {
                        (TokenKind::Decrement, 2)
                    }
                }
                Some('=') => (TokenKind::AssignOp, 2),
                _ => (TokenKind::Operator, 1),
            },
            '*' => match (next, third) {
                (Some('*'), Some('=')) => (TokenKind::AssignOp, 3),
                (Some('*'), _) => (TokenKind::Operator, 2),
                (Some('='), _) => (TokenKind::AssignOp, 2),
                _ => (TokenKind::Star, 1),
            },
            '/' | '%' | '^' => match next {
                Some('=') => (TokenKind::AssignOp, 2),
                _ => (TokenKind::Operator, 1),
            },
            '&' | '|' => match (next, third) {
                (Some(n), Some('=')) if n == ch => (TokenKind::AssignOp, 3),
                (Some(n), _) if n == ch => (TokenKind::Operator, 2),
                (Some('='), _) => (TokenKind::AssignOp, 2),
                _ => (TokenKind::Operator, 1),
            },
            '<' => match (next, third) {
                (Some('<'), Some('=')) => (TokenKind::AssignOp, 3),
                (Some('<'), _) | (Some('='), _) => (TokenKind::Operator, 2),
                _ => (TokenKind::Operator, 1),
            },
            '>' => match (next, third, fourth) {
                (Some('>'), Some('>'), Some('=')) => (TokenKind::AssignOp, 4),
                (Some('>'), Some('>'), _) => (TokenKind::Operator, 3),
                (Some('>'), Some('='), _) => (TokenKind::AssignOp, 3),
                (Some('>'), _, _) | (Some('='), _, _) => (TokenKind::Operator, 2),
                _ => (TokenKind::Operator, 1),
            },
            _ => {
                self.advance();
                return Token::new(
                    TokenKind::Error,
                    Span::new(start, self.current_pos),
                    format!("Unexpected character: {}", ch),
                );
            }
        };

        for _ in 0..len {
            self.advance();
        }
        self.make(kind, start)
    }
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '\u{200c}' || ch == '\u{200d}'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords() {
        let source = "import export default function class const let var";
        let tokens = kinds(source);

        assert_eq!(
            tokens,
            vec![
                TokenKind::Import,
                TokenKind::Export,
                TokenKind::Default,
                TokenKind::Function,
                TokenKind::Class,
                TokenKind::Const,
                TokenKind::Let,
                TokenKind::Var,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_contextual_words_are_identifiers() {
        let tokens = Lexer::new("from as async of").tokenize();
        assert!(tokens[..4].iter().all(|t| t.kind == TokenKind::Identifier));
        assert!(tokens[0].is_word("from"));
    }

    #[test]
    fn test_keyword_after_dot_is_property() {
        let tokens = Lexer::new("obj.default.import").tokenize();
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
        assert_eq!(tokens[4].kind, TokenKind::Identifier);
        assert!(tokens[2].is_identifier_name());
    }

    #[test]
    fn test_strings() {
        let tokens = Lexer::new(r#""hello" 'wo\'rld' `template`"#).tokenize();

        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].value, "hello");
        assert_eq!(tokens[1].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[1].value, "wo'rld");
        assert_eq!(tokens[2].kind, TokenKind::TemplateLiteral);
        assert_eq!(tokens[2].value, "template");
    }

    #[test]
    fn test_template_with_nested_substitutions() {
        let source = "`a ${ {b: `c${d}`}.b } e` + 1";
        let tokens = Lexer::new(source).tokenize();

        assert_eq!(tokens[0].kind, TokenKind::TemplateLiteral);
        assert_eq!(tokens[0].span.end, source.find(" + 1").unwrap());
        assert_eq!(tokens[1].kind, TokenKind::Operator);
    }

    #[test]
    fn test_substitutions_are_tokenized() {
        let source = "`${s.replace(/'/g, \"\")}`; next";
        let tokens = Lexer::new(source).tokenize();

        assert_eq!(tokens[0].kind, TokenKind::TemplateLiteral);
        assert_eq!(tokens[0].span.end, source.find(';').unwrap());
        let inner: Vec<TokenKind> = tokens[0].substitutions.iter().map(|t| t.kind).collect();
        assert_eq!(
            inner,
            vec![
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::RegexLiteral,
                TokenKind::Comma,
                TokenKind::StringLiteral,
                TokenKind::RParen,
            ]
        );
        assert_eq!(tokens[0].substitutions[4].value, "/'/g");
        assert!(tokens[2].is_word("next"));
    }

    #[test]
    fn test_braces_and_backticks_inside_substitution() {
        let source = "const f = `${ /}/.test(a) ? '`' : \"}\" }`;";
        let tokens = Lexer::new(source).tokenize();

        assert!(tokens.iter().all(|t| t.kind != TokenKind::Error));
        let template = tokens.iter().find(|t| t.kind == TokenKind::TemplateLiteral).unwrap();
        assert_eq!(template.span.end, source.len() - 1);
        assert_eq!(template.substitutions[0].value, "/}/");
        assert_eq!(tokens[tokens.len() - 2].kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_nested_template_inside_substitution() {
        let source = "`a${ `b${ {c: 1}.c }` }d` / 2";
        let tokens = Lexer::new(source).tokenize();

        assert_eq!(tokens[0].kind, TokenKind::TemplateLiteral);
        assert_eq!(tokens[0].substitutions.len(), 1);
        assert_eq!(tokens[0].substitutions[0].kind, TokenKind::TemplateLiteral);
        assert_eq!(tokens[0].substitutions[0].substitutions.len(), 7);
        // Division after the template, not a regex
        assert_eq!(tokens[1].kind, TokenKind::Operator);
    }

    #[test]
    fn test_unterminated_substitution_is_an_error() {
        let tokens = Lexer::new("`a ${ b ").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].value, "Unterminated template literal");

        let tokens = Lexer::new("`a ${ 'open }`").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].value, "Unterminated string literal");
    }

    #[test]
    fn test_newline_inside_template_is_not_before_next_token() {
        let tokens = Lexer::new("a = `x\n${y}`; b").tokenize();
        let template = &tokens[2];
        assert_eq!(template.kind, TokenKind::TemplateLiteral);
        assert!(!template.newline_before);
        assert!(!tokens[4].newline_before);
    }

    #[test]
    fn test_regex_versus_division() {
        let tokens = Lexer::new("x = a / b; y = /[/]+/g.test(s)").tokenize();

        assert_eq!(tokens[3].kind, TokenKind::Operator);
        assert_eq!(tokens[3].value, "/");
        let regex = tokens.iter().find(|t| t.kind == TokenKind::RegexLiteral).unwrap();
        assert_eq!(regex.value, "/[/]+/g");
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("= += === !== => ++ -- ... ?. ?? ??= ** >>>= !");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Assign,
                TokenKind::AssignOp,
                TokenKind::Operator,
                TokenKind::Operator,
                TokenKind::Arrow,
                TokenKind::Increment,
                TokenKind::Decrement,
                TokenKind::DotDotDot,
                TokenKind::QuestionDot,
                TokenKind::Operator,
                TokenKind::AssignOp,
                TokenKind::Operator,
                TokenKind::AssignOp,
                TokenKind::Bang,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        let source = "a // trailing\n/* block\n */ b c";
        let tokens = Lexer::new(source).tokenize();

        assert_eq!(tokens[0].value, "a");
        assert!(!tokens[0].newline_before);
        assert_eq!(tokens[1].value, "b");
        assert!(tokens[1].newline_before);
        assert!(!tokens[2].newline_before);
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("123 45.67 0x1A 1_000 1e-3 10n .5").tokenize();
        let values: Vec<&str> = tokens[..7].iter().map(|t| t.value.as_str()).collect();

        assert!(tokens[..7].iter().all(|t| t.kind == TokenKind::NumberLiteral));
        assert_eq!(values, vec!["123", "45.67", "0x1A", "1_000", "1e-3", "10n", ".5"]);
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let tokens = Lexer::new("'abc\nx").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].value, "Unterminated string literal");
    }

    #[test]
    fn test_hashbang_is_skipped() {
        let tokens = Lexer::new("#!/usr/bin/env node\nrequire('x')").tokenize();
        assert!(tokens[0].is_word("require"));
        assert!(tokens[0].newline_before);
    }
}
