//! Keeps `exports.default` in sync with reassigned default declarations
//!
//! `export default function foo() {}` exports the binding `foo`, so a later
//! `foo = other` must update the export too. Every such assignment becomes
//! `exports.default = foo = other`.

use kiln_ast::Program;
use kiln_lexer::{Token, TokenKind};
use tracing::debug;

/// Text inserted before a matched assignment target
const EXPORT_PREFIX: &str = "exports.default = ";

/// What a bracket pair encloses, as far as assignments are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// Statement block, call arguments, array literal: assignments count
    Code,
    /// Object literal or pattern: `{ name = 1 }` is a default value
    Object,
    /// Class body: `name = 1` is a field
    ClassBody,
    /// Parameter list: `(name = 1)` is a default value
    Params,
}

/// Precomputed bracket structure of a token stream.
struct Brackets {
    /// Index of the matching delimiter, for every bracket token
    partner: Vec<Option<usize>>,
    /// Index of every `{` that opens a class body
    class_bodies: Vec<usize>,
}

impl Brackets {
    fn analyze(tokens: &[Token]) -> Self {
        let mut partner = vec![None; tokens.len()];
        let mut stack = Vec::new();
        for (index, token) in tokens.iter().enumerate() {
            if token.kind.is_open_bracket() {
                stack.push(index);
            } else if token.kind.is_close_bracket() {
                if let Some(open) = stack.pop() {
                    partner[open] = Some(index);
                    partner[index] = Some(open);
                }
            }
        }

        let mut class_bodies = Vec::new();
        for (index, token) in tokens.iter().enumerate() {
            if token.kind != TokenKind::Class {
                continue;
            }
            let mut cursor = index + 1;
            while let Some(next) = tokens.get(cursor) {
                match next.kind {
                    TokenKind::LBrace => {
                        class_bodies.push(cursor);
                        break;
                    }
                    kind if kind.is_open_bracket() => match partner[cursor] {
                        Some(close) => cursor = close + 1,
                        None => break,
                    },
                    TokenKind::Eof | TokenKind::Semicolon => break,
                    _ => cursor += 1,
                }
            }
        }

        Self {
            partner,
            class_bodies,
        }
    }

    fn frame_for(&self, tokens: &[Token], open: usize) -> Frame {
        let prev = open.checked_sub(1).map(|index| &tokens[index]);
        match tokens[open].kind {
            TokenKind::LBrace if self.class_bodies.contains(&open) => Frame::ClassBody,
            TokenKind::LBrace if opens_block(prev, &tokens[open]) => Frame::Code,
            TokenKind::LBrace => Frame::Object,
            TokenKind::LParen if self.is_parameter_list(tokens, open) => Frame::Params,
            _ => Frame::Code,
        }
    }

    fn is_parameter_list(&self, tokens: &[Token], open: usize) -> bool {
        let after_close = self.partner[open]
            .and_then(|close| tokens.get(close + 1))
            .map(|token| token.kind);
        if after_close == Some(TokenKind::Arrow) {
            return true;
        }

        let Some(prev) = open.checked_sub(1).map(|index| &tokens[index]) else {
            return false;
        };
        match prev.kind {
            TokenKind::Function | TokenKind::Star => true,
            TokenKind::Identifier => {
                let before = open.checked_sub(2).map(|index| tokens[index].kind);
                // function name(...) or a method `name(...) { }`
                matches!(before, Some(TokenKind::Function | TokenKind::Star))
                    || after_close == Some(TokenKind::LBrace)
            }
            _ => false,
        }
    }
}

/// True if a `{` after `prev` starts a statement block.
fn opens_block(prev: Option<&Token>, brace: &Token) -> bool {
    let Some(prev) = prev else {
        return true;
    };
    match prev.kind {
        TokenKind::RParen
        | TokenKind::Arrow
        | TokenKind::Else
        | TokenKind::Try
        | TokenKind::Finally
        | TokenKind::Do
        | TokenKind::LBrace
        | TokenKind::RBrace
        | TokenKind::Semicolon => true,
        kind => brace.newline_before && kind.ends_expression(),
    }
}

/// Rewrites every assignment to `name` found in `tokens` inside `program`.
///
/// Returns how many assignments were rewritten.
pub(crate) fn rewrite_default_assignments(program: &mut Program, tokens: &[Token], name: &str) -> usize {
    let brackets = Brackets::analyze(tokens);
    let mut frames: Vec<Frame> = Vec::new();
    // Per bracket depth: inside a `var`/`let`/`const` declarator list
    let mut in_declaration: Vec<bool> = vec![false];
    let mut rewritten = 0;
    let mut index = 0;

    while index < tokens.len() {
        let token = &tokens[index];
        match token.kind {
            kind if kind.is_open_bracket() => {
                frames.push(brackets.frame_for(tokens, index));
                in_declaration.push(false);
            }
            kind if kind.is_close_bracket() => {
                frames.pop();
                if in_declaration.len() > 1 {
                    in_declaration.pop();
                }
            }
            TokenKind::Var | TokenKind::Let | TokenKind::Const => set_top(&mut in_declaration, true),
            TokenKind::Semicolon => set_top(&mut in_declaration, false),
            TokenKind::Identifier if token.value == name => {
                if is_assignment_target(tokens, index, &frames, &in_declaration) {
                    if program.insert_text_at(token.span.start, EXPORT_PREFIX) {
                        rewritten += 1;
                    } else {
                        debug!(name, offset = token.span.start, "assignment outside rewritable text");
                    }
                    index = skip_assignment(tokens, index + 1);
                    continue;
                }
            }
            _ => {}
        }
        index += 1;
    }

    rewritten
}

fn set_top(flags: &mut [bool], value: bool) {
    if let Some(top) = flags.last_mut() {
        *top = value;
    }
}

fn is_assignment_target(tokens: &[Token], index: usize, frames: &[Frame], in_declaration: &[bool]) -> bool {
    let next = tokens.get(index + 1).map(|token| token.kind);
    if !matches!(next, Some(TokenKind::Assign | TokenKind::AssignOp)) {
        return false;
    }

    let prev = index.checked_sub(1).map(|i| &tokens[i]);
    let prev_kind = prev.map(|token| token.kind);

    // x.name = ... / x?.name = ...
    if matches!(prev_kind, Some(TokenKind::Dot | TokenKind::QuestionDot)) {
        return false;
    }

    // var name = ... / var a = 1, name = ...
    let declaring = in_declaration.last().copied().unwrap_or(false);
    if matches!(prev_kind, Some(TokenKind::Var | TokenKind::Let | TokenKind::Const))
        || (declaring && prev_kind == Some(TokenKind::Comma))
    {
        return false;
    }

    let element_start = matches!(
        prev_kind,
        None | Some(TokenKind::LBrace | TokenKind::LParen | TokenKind::Comma | TokenKind::DotDotDot)
    );
    match frames.last() {
        Some(Frame::Object) | Some(Frame::Params) => !element_start,
        Some(Frame::ClassBody) => {
            let field_start = matches!(
                prev_kind,
                Some(TokenKind::LBrace | TokenKind::Semicolon | TokenKind::RBrace)
            ) || prev.map_or(false, |token| token.is_word("static"))
                || tokens[index].newline_before;
            !field_start
        }
        Some(Frame::Code) | None => true,
    }
}

/// Index of the first token after the assignment whose target is at `index - 1`.
fn skip_assignment(tokens: &[Token], mut index: usize) -> usize {
    let mut depth = 0usize;
    let start = index;

    while let Some(token) = tokens.get(index) {
        let kind = token.kind;
        if kind == TokenKind::Eof {
            break;
        }
        if depth == 0 {
            if index > start + 1
                && token.newline_before
                && tokens[index - 1].kind.ends_expression()
                && !kind.continues_expression()
            {
                break;
            }
            if matches!(kind, TokenKind::Semicolon | TokenKind::Comma) || kind.is_close_bracket() {
                break;
            }
        }
        if kind.is_open_bracket() {
            depth += 1;
        } else if kind.is_close_bracket() {
            depth = depth.saturating_sub(1);
        }
        index += 1;
    }

    index
}
