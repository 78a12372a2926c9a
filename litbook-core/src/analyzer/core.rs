//! # Core Parser Definitions
//!
//! This module defines the fundamental parser interface and error types
//! that form the foundation of the parser combinator system.

use thiserror::Error;

/// Parser trait defines the core parsing interface.
///
/// All parsers in the system implement this trait, which takes an input slice
/// and a position, and returns either a success result with a new position and
/// output value, or a parse error.
///
/// # Type Parameters
///
/// * `I` - The input token type
/// * `O` - The output value type
pub trait Parser<I, O> {
    /// Attempts to parse the input starting at the given position.
    ///
    /// # Returns
    ///
    /// * `Ok((new_pos, output))` - If parsing succeeds
    /// * `Err(error)` - If parsing fails
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O>;
}

/// Result type for parsing operations: the new position and the parsed value.
pub type ParseResult<O> = Result<(usize, O), ParseError>;

/// Error type for parsing operations.
///
/// Positions are token indices; the caller maps them back to source spans.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected end of input")]
    EOF { position: usize },
    #[error("expected {expected}, found {found}")]
    Unexpected {
        expected: String,
        found: String,
        position: usize,
    },
    #[error("no alternative matched")]
    NoAlternative { position: usize },
    #[error("{message}")]
    Failure { message: String, position: usize },
    #[error("{inner} (in {context})")]
    WithContext {
        context: String,
        inner: Box<ParseError>,
    },
}

impl ParseError {
    pub fn with_context(self, ctx: &str) -> Self {
        ParseError::WithContext {
            context: ctx.to_string(),
            inner: Box::new(self),
        }
    }

    pub fn get_position(&self) -> usize {
        match self {
            ParseError::EOF { position }
            | ParseError::Unexpected { position, .. }
            | ParseError::NoAlternative { position }
            | ParseError::Failure { position, .. } => *position,
            ParseError::WithContext { inner, .. } => inner.get_position(),
        }
    }

    /// The innermost error, without context wrappers.
    pub fn root_cause(&self) -> &ParseError {
        match self {
            ParseError::WithContext { inner, .. } => inner.root_cause(),
            other => other,
        }
    }

    /// Outermost-first context names.
    pub fn contexts(&self) -> Vec<&str> {
        let mut contexts = Vec::new();
        let mut current = self;
        while let ParseError::WithContext { context, inner } = current {
            contexts.push(context.as_str());
            current = inner;
        }
        contexts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_position() {
        let err = ParseError::Unexpected {
            expected: "`)`".to_string(),
            found: "`;`".to_string(),
            position: 4,
        }
        .with_context("call arguments")
        .with_context("expression");

        assert_eq!(err.get_position(), 4);
        assert_eq!(err.contexts(), vec!["expression", "call arguments"]);
        assert!(matches!(err.root_cause(), ParseError::Unexpected { .. }));
        assert_eq!(
            err.to_string(),
            "expected `)`, found `;` (in call arguments) (in expression)"
        );
    }
}
