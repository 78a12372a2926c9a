use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use super::{
    EvalError,
    context::{ExecutionContext, Frame},
    statement::StatementEvaluator,
};
use crate::analyzer::parse_source;
use crate::cache::Cache;
use crate::extract::UserExpr;
use crate::output::ConverterRegistry;

/// An evaluation error together with the call stack captured where it happened.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct EvalFailure {
    pub error: EvalError,
    /// Innermost frame first.
    pub trace: Vec<Frame>,
}

impl EvalFailure {
    pub fn is_interrupt(&self) -> bool {
        self.error.is_interrupt()
    }
}

/// Evaluates single expressions and stores their Markdown in the cache.
#[derive(Debug)]
pub struct Evaluator {
    cache: Cache,
    converters: ConverterRegistry,
}

impl Evaluator {
    pub fn new(cache: Cache, converters: ConverterRegistry) -> Self {
        Self { cache, converters }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Runs `expr` in `ctx` and writes its output to the expression's cache
    /// entry, returning that path. `origin` names the document and block for
    /// the top-level trace frame.
    ///
    /// On failure nothing is written; the context is left usable for the next
    /// expression, with the bindings made before the failure kept.
    #[tracing::instrument(level = "debug", skip(self, ctx, expr), fields(expr = %expr.expr))]
    pub fn evaluate_and_write(
        &self,
        ctx: &mut ExecutionContext,
        expr: &UserExpr,
        origin: &str,
    ) -> Result<PathBuf, EvalFailure> {
        let path = self.cache.resolve(&expr.expr);
        let result = ctx.with_frame(Frame::host("evaluate_and_write"), |ctx| {
            let program = parse_source(&expr.expr)?;
            let value = ctx.with_frame(Frame::top_level(origin), |ctx| {
                StatementEvaluator.eval_program(&program, ctx)
            })?;
            let markdown = self.converters.convert(expr, &path, &value)?;
            let output = wrap_output(&markdown, expr.indentation);
            self.cache.write(&expr.expr, &output)?;
            Ok(())
        });

        match result {
            Ok(()) => {
                debug!(path = %path.display(), "cached output");
                Ok(path)
            }
            Err(error) => {
                let trace = ctx.take_fault_trace();
                ctx.reset_after_failure();
                Err(EvalFailure { error, trace })
            }
        }
    }
}

/// Surrounds `markdown` with newlines and, for indented blocks, indents
/// every non-empty line so the output sits at the block's depth.
pub fn wrap_output(markdown: &str, indentation: usize) -> String {
    let body = if indentation == 0 {
        markdown.to_string()
    } else {
        let pad = " ".repeat(indentation);
        markdown
            .lines()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{}{}", pad, line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!("\n{}\n", body)
}
