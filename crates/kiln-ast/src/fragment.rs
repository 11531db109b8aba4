//! Text fragments: source ranges interleaved with synthesized text

use super::*;

/// One piece of a fragment
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    /// Bytes copied verbatim from the original source
    Source(Span),

    /// Text produced by a rewrite
    Text(String),
}

/// A run of output text built from pieces of the original source and
/// inserted text. Rewrites never edit source bytes, they split pieces.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    pub pieces: Vec<Piece>,
}

impl Fragment {
    pub fn from_span(span: Span) -> Self {
        Self {
            pieces: vec![Piece::Source(span)],
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            pieces: vec![Piece::Text(text.into())],
        }
    }

    pub fn push_source(&mut self, span: Span) {
        if !span.is_empty() {
            self.pieces.push(Piece::Source(span));
        }
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.pieces.push(Piece::Text(text.into()));
    }

    /// Inserts `text` before the source byte at `offset`.
    ///
    /// Returns false if no source piece of this fragment covers `offset`.
    pub fn insert_at(&mut self, offset: usize, text: &str) -> bool {
        let Some(index) = self.pieces.iter().position(|piece| match piece {
            Piece::Source(span) => span.contains(offset),
            Piece::Text(_) => false,
        }) else {
            return false;
        };

        let Piece::Source(span) = self.pieces[index] else {
            return false;
        };

        let mut replacement = Vec::with_capacity(3);
        if offset > span.start {
            replacement.push(Piece::Source(Span::new(span.start, offset)));
        }
        replacement.push(Piece::Text(text.to_string()));
        replacement.push(Piece::Source(Span::new(offset, span.end)));
        self.pieces.splice(index..=index, replacement);
        true
    }

    /// Renders the fragment against the source it was cut from.
    pub fn render(&self, source: &str, out: &mut String) {
        for piece in &self.pieces {
            match piece {
                Piece::Source(span) => out.push_str(span.text(source)),
                Piece::Text(text) => out.push_str(text),
            }
        }
    }

    /// Last non-whitespace character of the rendered fragment.
    pub fn last_significant_char(&self, source: &str) -> Option<char> {
        self.pieces.iter().rev().find_map(|piece| {
            let text = match piece {
                Piece::Source(span) => span.text(source),
                Piece::Text(text) => text.as_str(),
            };
            text.trim_end().chars().last()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_splits_source_piece() {
        let source = "foo = 1;";
        let mut fragment = Fragment::from_span(Span::new(0, source.len()));

        assert!(fragment.insert_at(0, "exports.default = "));
        let mut out = String::new();
        fragment.render(source, &mut out);
        assert_eq!(out, "exports.default = foo = 1;");
    }

    #[test]
    fn test_insert_in_middle() {
        let source = "if (x) foo = 2;";
        let mut fragment = Fragment::from_span(Span::new(0, source.len()));

        assert!(fragment.insert_at(7, "exports.default = "));
        let mut out = String::new();
        fragment.render(source, &mut out);
        assert_eq!(out, "if (x) exports.default = foo = 2;");
        assert_eq!(fragment.pieces.len(), 3);
    }

    #[test]
    fn test_insert_outside_is_rejected() {
        let mut fragment = Fragment::from_span(Span::new(4, 8));
        assert!(!fragment.insert_at(8, "x"));
        assert!(!fragment.insert_at(2, "x"));
    }

    #[test]
    fn test_last_significant_char_skips_whitespace() {
        let source = "const a = 1  \n";
        let fragment = Fragment::from_span(Span::new(0, source.len()));
        assert_eq!(fragment.last_significant_char(source), Some('1'));
    }
}
