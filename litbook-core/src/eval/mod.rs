//! Evaluation System
//!
//! Runs parsed `lit` programs against the shared [`ExecutionContext`] and
//! turns their results into cache entries.
//!
//! # Core Components
//!
//! ## Evaluator
//! The entry point used by the orchestrator: parses one expression, runs it,
//! converts the value to Markdown and writes the cache entry.
//!
//! ## Statement Evaluator
//! Evaluates statements and blocks, managing scopes and control flow.
//!
//! ## Expression Evaluator
//! Evaluates expressions: literals, variables, operators, indexing and calls
//! to user functions and builtins.
//!
//! ## Execution Context
//! Holds bindings, the call stack used for diagnostic traces, and the
//! interrupt flag.
//!
//! # Evaluation Pipeline
//!
//! 1. Expression text is parsed by [`crate::analyzer::parse_source`]
//! 2. The Evaluator delegates to the statement and expression evaluators
//! 3. The resulting [`Value`] goes through the output converter registry
//! 4. The Markdown is written atomically to the cache

use thiserror::Error;

use crate::analyzer::SyntaxError;

pub mod builtins;
pub mod context;
pub mod evaluator;
pub mod expression;
pub mod statement;
pub mod value;

pub use context::{ExecutionContext, Frame, FrameKind, InterruptFlag};
pub use evaluator::{EvalFailure, Evaluator};
pub use value::{Value, ValueKind};

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("`{name}` expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("maximum call depth of {0} exceeded")]
    StackOverflow(usize),
    /// Raised by the `error` builtin.
    #[error("{0}")]
    Raised(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("cannot render value: {0}")]
    Conversion(String),
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("interrupted")]
    Interrupted,
}

impl EvalError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        EvalError::TypeMismatch(message.into())
    }

    pub fn is_interrupt(&self) -> bool {
        matches!(self, EvalError::Interrupted)
    }
}

impl From<std::io::Error> for EvalError {
    fn from(e: std::io::Error) -> Self {
        EvalError::Io(e.to_string())
    }
}
