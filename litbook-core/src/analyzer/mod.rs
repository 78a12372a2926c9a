//! # Analyzer (Parser) System
//!
//! Transforms token streams from the tokenizer into the [`ast`] using a
//! parser combinator pattern.
//!
//! ## Core Components
//!
//! * **Parser Trait**: Defines the core parsing interface
//! * **Combinators**: Building blocks for creating complex parsers
//! * **Specialized Parsers**: The `lit` grammar in [`parsers`]
//!
//! ## Position in the Pipeline
//!
//! ```text
//! Expression text → Tokenizer → Preprocessor → Analyzer/Parser → Evaluator
//! ```
//!
//! [`parse_source`] runs the whole front end and is what the extractor and
//! the evaluator call.

pub mod combinators;
pub mod core;
pub mod parsers;
pub mod prelude;

pub use core::ParseError;
pub use core::ParseResult;
pub use core::Parser;

use thiserror::Error;

use crate::ast;
use crate::preprocessor::{Preprocessor, TokenPreprocessor};
use crate::tokenizer::token::{Span, Token, TokenSpan, Tokenizer, TokenizerError};

/// A tokenizer or parser failure, positioned in the expression text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
    #[error(transparent)]
    Tokenize(#[from] TokenizerError),
    #[error("{message} at {span}")]
    Parse { message: String, span: Span },
}

/// Tokenizes and parses one expression body. The whole input must be consumed.
#[tracing::instrument(level = "debug", skip(source))]
pub fn parse_source(source: &str) -> Result<ast::Program, SyntaxError> {
    let spans = Tokenizer::new().tokenize(source)?;
    let spans: Vec<TokenSpan> = TokenPreprocessor.process(spans);
    let tokens: Vec<Token> = spans.iter().map(|span| span.token.clone()).collect();

    let (pos, program) = parsers::statement::parse_program()
        .parse(&tokens, 0)
        .map_err(|e| to_syntax_error(&e, &spans, source))?;

    if pos < tokens.len() {
        // Re-parse the first leftover statement on its own: its error says
        // what went wrong, where `many` only says that it stopped.
        let error = match parsers::statement::parse_statement().parse(&tokens, pos) {
            Err(e) if e.get_position() > pos => e,
            _ => ParseError::Unexpected {
                expected: "a statement".to_string(),
                found: format!("`{}`", tokens[pos]),
                position: pos,
            },
        };
        return Err(to_syntax_error(&error, &spans, source));
    }

    tracing::debug!(statements = program.statements.len(), "parsed expression");
    Ok(program)
}

fn to_syntax_error(error: &ParseError, spans: &[TokenSpan], source: &str) -> SyntaxError {
    let root = error.root_cause();
    let message = match error.contexts().last() {
        Some(context) => format!("{} in {}", root, context),
        None => root.to_string(),
    };
    let span = spans
        .get(error.get_position())
        .map(TokenSpan::span)
        .unwrap_or_else(|| end_of_input(source));
    SyntaxError::Parse { message, span }
}

fn end_of_input(source: &str) -> Span {
    let line = source.matches('\n').count() + 1;
    let column = source
        .rsplit('\n')
        .next()
        .map_or(0, |last| last.chars().count())
        + 1;
    Span {
        start: source.len(),
        end: source.len(),
        line,
        column,
    }
}
