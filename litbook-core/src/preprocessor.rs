//! # Preprocessor
//!
//! Sits between the tokenizer and the parser:
//!
//! ```text
//! Expression text → Tokenizer → Preprocessor → Parser → Evaluator
//! ```
//!
//! The tokenizer keeps whitespace, newlines and comments so that positions are
//! exact. The parser only wants significant tokens, so the
//! [`TokenPreprocessor`] filters the rest out while keeping each token's span
//! for error reporting.

use crate::tokenizer::token::{Token, TokenSpan};

/// A trait for preprocessing different types of input
pub trait Preprocessor<T, U = T> {
    /// Process the input of type T and return the processed result
    fn process(&self, input: T) -> U;
}

/// Drops formatting tokens from a token stream.
#[derive(Debug, Default, Clone)]
pub struct TokenPreprocessor;

impl TokenPreprocessor {
    fn is_significant(token: &Token) -> bool {
        !matches!(
            token,
            Token::Whitespace(_) | Token::Newline | Token::Comment(_)
        )
    }
}

impl Preprocessor<Vec<TokenSpan>> for TokenPreprocessor {
    fn process(&self, input: Vec<TokenSpan>) -> Vec<TokenSpan> {
        input
            .into_iter()
            .filter(|span| Self::is_significant(&span.token))
            .collect()
    }
}

impl Preprocessor<Vec<TokenSpan>, Vec<Token>> for TokenPreprocessor {
    fn process(&self, input: Vec<TokenSpan>) -> Vec<Token> {
        input
            .into_iter()
            .map(|span| span.token)
            .filter(Self::is_significant)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::token::Tokenizer;

    #[test]
    fn test_formatting_tokens_are_removed() {
        let spans = Tokenizer::new()
            .tokenize("x = 1 // note\n  y")
            .unwrap();
        let tokens: Vec<Token> = TokenPreprocessor.process(spans);
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[3], Token::Identifier("y".to_string()));
    }

    #[test]
    fn test_spans_survive_preprocessing() {
        let spans = Tokenizer::new().tokenize("x\n  y").unwrap();
        let spans: Vec<TokenSpan> = TokenPreprocessor.process(spans);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].line, 2);
        assert_eq!(spans[1].column, 3);
    }
}
