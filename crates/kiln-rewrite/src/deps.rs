//! Dependency extraction from a token stream

use kiln_lexer::{Token, TokenKind};

/// A module a piece of code depends on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// Specifier, or the directory to watch for a glob
    pub path: String,
    /// True when the specifier is computed and every file under `path` may be loaded
    pub is_glob: bool,
}

impl Dependency {
    pub fn literal(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_glob: false,
        }
    }

    /// Dependency for a template-literal specifier, e.g. `` `./locale/${lang}` ``.
    ///
    /// Templates with substitutions become a glob over the directory that
    /// precedes the first substitution.
    pub fn from_template(raw: &str) -> Self {
        match raw.find("${") {
            None => Self::literal(raw),
            Some(position) => {
                let prefix = &raw[..position];
                let directory = match prefix.rfind('/') {
                    Some(slash) => &prefix[..slash],
                    None => ".",
                };
                let directory = if directory.is_empty() { "/" } else { directory };
                Self {
                    path: directory.to_string(),
                    is_glob: true,
                }
            }
        }
    }
}

/// Collects `require("x")`, `` require(`x/${y}`) `` and `import("x")` calls.
///
/// Calls inside template substitutions count too. Order of first appearance
/// is kept; duplicates are dropped.
pub fn collect_dependencies(tokens: &[Token]) -> Vec<Dependency> {
    let mut dependencies: Vec<Dependency> = Vec::new();
    collect_into(tokens, &mut dependencies);
    dependencies
}

fn collect_into(tokens: &[Token], dependencies: &mut Vec<Dependency>) {
    for (index, token) in tokens.iter().enumerate() {
        if !token.substitutions.is_empty() {
            collect_into(&token.substitutions, dependencies);
        }

        let is_callee = token.is_word("require") || token.kind == TokenKind::Import;
        if !is_callee {
            continue;
        }
        let after_member = index
            .checked_sub(1)
            .map_or(false, |prev| matches!(tokens[prev].kind, TokenKind::Dot | TokenKind::QuestionDot));
        if after_member {
            continue;
        }

        let [open, argument, close] = match tokens.get(index + 1..index + 4) {
            Some([open, argument, close]) => [open, argument, close],
            _ => continue,
        };
        if open.kind != TokenKind::LParen {
            continue;
        }

        let dependency = match (argument.kind, close.kind) {
            (TokenKind::StringLiteral, TokenKind::RParen) => Dependency::literal(argument.value.as_str()),
            // import("x", { with: ... })
            (TokenKind::StringLiteral, TokenKind::Comma) if token.kind == TokenKind::Import => {
                Dependency::literal(argument.value.as_str())
            }
            (TokenKind::TemplateLiteral, TokenKind::RParen) if token.kind != TokenKind::Import => {
                Dependency::from_template(&argument.value)
            }
            _ => continue,
        };

        if !dependencies.contains(&dependency) {
            dependencies.push(dependency);
        }
    }
}
