use kiln_ast::Span;

/// Represents the different kinds of tokens in JavaScript source.
///
/// Contextual words (`from`, `as`, `async`, `of`, `get`, `set`, `static`,
/// `await`, `yield`) lex as [`TokenKind::Identifier`] and are matched by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Import,
    Export,
    Default,
    Function,
    Class,
    Extends,
    Const,
    Let,
    Var,
    New,
    Return,
    Typeof,
    Instanceof,
    In,
    Delete,
    Void,
    Throw,
    Case,
    Do,
    Else,
    This,
    Super,
    Null,
    True,
    False,
    If,
    For,
    While,
    Switch,
    Try,
    Catch,
    Finally,
    Break,
    Continue,
    Debugger,
    With,

    // Literals
    Identifier,
    PrivateName,       // #field
    StringLiteral,
    NumberLiteral,
    TemplateLiteral,
    RegexLiteral,

    // Operators
    Assign,            // =
    AssignOp,          // += -= *= /= %= **= <<= >>= >>>= &= |= ^= &&= ||= ??=
    Operator,          // binary operators: + - / % ** == != === !== < > <= >= && || ?? & | ^ << >> >>>
    Star,              // *
    Bang,              // !
    Tilde,             // ~
    Increment,         // ++
    Decrement,         // --
    Arrow,             // =>
    Dot,               // .
    QuestionDot,       // ?.
    DotDotDot,         // ...

    // Delimiters
    LParen,            // (
    RParen,            // )
    LBrace,            // {
    RBrace,            // }
    LBracket,          // [
    RBracket,          // ]
    Semicolon,         // ;
    Comma,             // ,
    Colon,             // :
    Question,          // ?
    At,                // @

    // Special
    Eof,
    Error,
}

impl TokenKind {
    pub fn is_open_bracket(self) -> bool {
        matches!(self, TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket)
    }

    pub fn is_close_bracket(self) -> bool {
        matches!(self, TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket)
    }

    /// The closing delimiter matching an opening one.
    pub fn closing(self) -> Option<TokenKind> {
        match self {
            TokenKind::LParen => Some(TokenKind::RParen),
            TokenKind::LBrace => Some(TokenKind::RBrace),
            TokenKind::LBracket => Some(TokenKind::RBracket),
            _ => None,
        }
    }

    /// True if a token of this kind can be the last token of an expression.
    pub fn ends_expression(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::PrivateName
                | TokenKind::StringLiteral
                | TokenKind::NumberLiteral
                | TokenKind::TemplateLiteral
                | TokenKind::RegexLiteral
                | TokenKind::This
                | TokenKind::Super
                | TokenKind::Null
                | TokenKind::True
                | TokenKind::False
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Increment
                | TokenKind::Decrement
        )
    }

    /// True if a token of this kind, starting a new line, continues the
    /// expression on the previous line instead of triggering semicolon insertion.
    pub fn continues_expression(self) -> bool {
        matches!(
            self,
            TokenKind::Assign
                | TokenKind::AssignOp
                | TokenKind::Operator
                | TokenKind::Star
                | TokenKind::Arrow
                | TokenKind::Dot
                | TokenKind::QuestionDot
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::TemplateLiteral
                | TokenKind::Question
                | TokenKind::Colon
                | TokenKind::Comma
                | TokenKind::In
                | TokenKind::Instanceof
        )
    }

    /// True if a `/` after a token of this kind starts a regular expression.
    pub(crate) fn allows_regex_after(self) -> bool {
        !self.ends_expression()
    }
}

/// Represents a token with its kind, span, and value.
///
/// `value` holds the identifier name, the cooked string contents, or the raw
/// text for every other kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub value: String,
    /// A line terminator appears between this token and the previous one
    pub newline_before: bool,
    /// Tokens of every `${ ... }` of a template literal, in order
    pub substitutions: Vec<Token>,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, span: Span, value: String) -> Self {
        Self {
            kind,
            span,
            value,
            newline_before: false,
            substitutions: Vec::new(),
        }
    }

    /// True for an identifier with exactly this name.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.value == word
    }

    /// True for identifiers and keywords, which are all valid property and
    /// module-export names.
    pub fn is_identifier_name(&self) -> bool {
        self.kind == TokenKind::Identifier || keyword_kind(&self.value) == Some(self.kind)
    }
}

pub(crate) fn keyword_kind(word: &str) -> Option<TokenKind> {
    let kind = match word {
        "import" => TokenKind::Import,
        "export" => TokenKind::Export,
        "default" => TokenKind::Default,
        "function" => TokenKind::Function,
        "class" => TokenKind::Class,
        "extends" => TokenKind::Extends,
        "const" => TokenKind::Const,
        "let" => TokenKind::Let,
        "var" => TokenKind::Var,
        "new" => TokenKind::New,
        "return" => TokenKind::Return,
        "typeof" => TokenKind::Typeof,
        "instanceof" => TokenKind::Instanceof,
        "in" => TokenKind::In,
        "delete" => TokenKind::Delete,
        "void" => TokenKind::Void,
        "throw" => TokenKind::Throw,
        "case" => TokenKind::Case,
        "do" => TokenKind::Do,
        "else" => TokenKind::Else,
        "this" => TokenKind::This,
        "super" => TokenKind::Super,
        "null" => TokenKind::Null,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "if" => TokenKind::If,
        "for" => TokenKind::For,
        "while" => TokenKind::While,
        "switch" => TokenKind::Switch,
        "try" => TokenKind::Try,
        "catch" => TokenKind::Catch,
        "finally" => TokenKind::Finally,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "debugger" => TokenKind::Debugger,
        "with" => TokenKind::With,
        _ => return None,
    };
    Some(kind)
}
