//! Error types for module rewriting

use kiln_ast::Span;
use kiln_parser::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RewriteError {
    /// The source could not be tokenized or parsed as a module
    #[error("{message} at {}..{}", .span.start, .span.end)]
    Parse { message: String, span: Span },
}

impl RewriteError {
    pub fn span(&self) -> Span {
        match self {
            RewriteError::Parse { span, .. } => *span,
        }
    }
}

impl From<ParseError> for RewriteError {
    fn from(err: ParseError) -> Self {
        RewriteError::Parse {
            message: err.message,
            span: err.span,
        }
    }
}
