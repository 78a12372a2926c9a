//! # Tokenizer
//!
//! Lexical analysis for the `lit` expression language, the small scripting
//! language embedded in documents as fenced ` ```lit ` blocks and inline
//! `` `lit ...` `` spans.
//!
//! ## Design
//!
//! * Every token carries its position (line, column, byte offsets) so parse
//!   errors can point into the original expression text.
//! * Whitespace, newlines and comments are kept as tokens; the
//!   [`TokenPreprocessor`](crate::preprocessor::TokenPreprocessor) strips them
//!   before parsing.
//! * Numeric literals are unsigned. `-1` is the unary minus applied to `1`,
//!   which keeps `n-1` a subtraction.
//!
//! ## Component Structure
//!
//! * [`token`]: token types and the [`Tokenizer`](token::Tokenizer) driver
//! * [`keyword`]: reserved words
//! * [`symbol`]: operators and delimiters
//! * [`literal`]: string (with `${name}` interpolation), number, boolean and null literals
//! * [`whitespace`]: spaces, tabs and line breaks
//! * [`comment`]: `//` line comments
//!
//! ## Usage Example
//!
//! ```rust
//! use litbook_core::tokenizer::token::{Token, Tokenizer};
//!
//! let tokens = Tokenizer::new().tokenize("x = 1 + 2").unwrap();
//! assert_eq!(tokens[0].token, Token::Identifier("x".to_string()));
//! ```

pub mod comment;
pub mod keyword;
pub mod literal;
pub mod symbol;
pub mod token;
pub mod whitespace;
