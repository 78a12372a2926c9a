//! # litbook: executable Markdown
//!
//! litbook turns Markdown documents with embedded expressions into rendered
//! books. Expressions are written in `lit`, a small scripting language, as
//! fenced blocks or inline spans:
//!
//! ````text
//! The answer is `lit 6 * 7`.
//!
//! ```lit
//! table(["n", "n²"], [[1, 1], [2, 4]])
//! ```
//! ````
//!
//! ## Pipeline
//!
//! ```text
//! Documents → Extract → Evaluate → Cache → Embed → Render
//! ```
//!
//! ### Stage 1: Extraction
//!
//! The [`extract`] module finds expressions in document text and validates
//! that each one parses. Positions are numbered per document so a single
//! block can be re-run.
//!
//! ### Stage 2: Evaluation
//!
//! The [`r#gen`] module drives the [`eval`] system over every position in
//! order. All expressions share one
//! [`ExecutionContext`](eval::ExecutionContext): a binding made in one
//! chapter is visible in the next. Failures are written to the cache as
//! diagnostics by [`report`].
//!
//! ### Stage 3: Caching
//!
//! The [`cache`] module maps each expression's text to a Markdown file under
//! the generated directory. The mapping needs no index, so reading and
//! writing agree by construction.
//!
//! ### Stage 4: Embedding and rendering
//!
//! The [`embed`] module substitutes cached outputs into the documents, and
//! [`render`] concatenates them and hands the result to Pandoc.
//!
//! ## The `lit` language
//!
//! ```text
//! Expression text → Tokenizer → Preprocessor → Parser → Evaluator
//! ```
//!
//! See [`tokenizer`], [`preprocessor`], [`analyzer`] and [`eval`].

pub mod analyzer;
pub mod ast;
pub mod cache;
pub mod config;
pub mod embed;
pub mod error;
pub mod eval;
pub mod extract;
pub mod r#gen;
pub mod output;
pub mod preprocessor;
pub mod progress;
pub mod render;
pub mod report;
pub mod tokenizer;

// Re-exports
pub use cache::Cache;
pub use config::BookConfig;
pub use embed::embed_output;
pub use error::*;
pub use eval::{EvalError, EvalFailure, Evaluator, ExecutionContext, InterruptFlag, Value};
pub use extract::{ExprPosition, UserExpr, extract_expr, extract_positions};
pub use r#gen::{GenOptions, GenOutcome, GenReport, Generator};
