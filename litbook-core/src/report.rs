//! Rendering evaluation failures into the cache.
//!
//! A failed expression gets an ` ```output ` block in its cache entry instead
//! of a result, so the rendered document shows what went wrong where the
//! output would have been.

use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;

use tracing::debug;

use crate::cache::Cache;
use crate::eval::{EvalFailure, Frame, FrameKind, evaluator::wrap_output};
use crate::extract::ExprPosition;

/// Host frames kept after the `top-level scope` frame.
pub const FRAMES_AFTER_TOP_LEVEL: usize = 1;
/// Longer traces keep their head and tail only.
pub const MAX_TRACE_FRAMES: usize = 16;
pub const TRUNCATION_MARKER: &str = "⋮";

/// A failed expression and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub position: ExprPosition,
    pub failure: EvalFailure,
}

impl Diagnostic {
    pub fn new(position: ExprPosition, failure: EvalFailure) -> Self {
        Self { position, failure }
    }

    pub fn message(&self) -> String {
        let position = &self.position;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Failed to evaluate an expression in {}, block {}:",
            position.path.display(),
            position.block_number
        );
        out.push('\n');
        for line in position.user_expr.expr.lines() {
            let _ = writeln!(out, "    {}", line);
        }
        out.push('\n');
        let _ = writeln!(out, "Error: {}", self.failure.error);
        out.push('\n');
        out.push_str("Stacktrace:\n");
        for line in trim_trace(&self.failure.trace) {
            let _ = writeln!(out, "  {}", line);
        }
        out.push('\n');
        let _ = write!(
            out,
            "Re-run only this block with `{}`.",
            rerun_hint(position)
        );
        out
    }
}

/// The command that re-evaluates just this position.
pub fn rerun_hint(position: &ExprPosition) -> String {
    format!(
        "litbook gen {} --block {}",
        position.path.display(),
        position.block_number
    )
}

/// Lines of the trace worth showing, innermost first.
///
/// Frames after the top-level scope belong to the host and only the first
/// [`FRAMES_AFTER_TOP_LEVEL`] of them are kept. Deep recursion is shortened
/// to the first and last frames. The result always ends with
/// [`TRUNCATION_MARKER`].
pub fn trim_trace(trace: &[Frame]) -> Vec<String> {
    let end = trace
        .iter()
        .position(|frame| frame.kind == FrameKind::TopLevel)
        .map_or(trace.len(), |i| (i + 1 + FRAMES_AFTER_TOP_LEVEL).min(trace.len()));
    let kept = &trace[..end];

    let numbered = |(i, frame): (usize, &Frame)| format!("[{}] {}", i + 1, frame);
    let mut lines: Vec<String> = if kept.len() > MAX_TRACE_FRAMES {
        let head = MAX_TRACE_FRAMES / 2;
        let tail = MAX_TRACE_FRAMES - head;
        let omitted = kept.len() - head - tail;
        let mut lines: Vec<String> = kept[..head].iter().enumerate().map(numbered).collect();
        lines.push(format!("... {} frames omitted", omitted));
        lines.extend(
            kept.iter()
                .enumerate()
                .skip(kept.len() - tail)
                .map(numbered),
        );
        lines
    } else {
        kept.iter().enumerate().map(numbered).collect()
    };
    lines.push(TRUNCATION_MARKER.to_string());
    lines
}

pub fn output_block(message: &str) -> String {
    format!("```output\n{}\n```", message.trim_end())
}

/// Writes the diagnostic to the cache entry the expression's result would
/// have used. Interrupts are not diagnostics and write nothing.
pub fn report_error(cache: &Cache, diagnostic: &Diagnostic) -> io::Result<Option<PathBuf>> {
    if diagnostic.failure.is_interrupt() {
        return Ok(None);
    }
    let user_expr = &diagnostic.position.user_expr;
    debug!(
        document = %diagnostic.position.path.display(),
        block = diagnostic.position.block_number,
        error = %diagnostic.failure.error,
        "writing diagnostic"
    );
    let contents = wrap_output(&output_block(&diagnostic.message()), user_expr.indentation);
    cache.write(&user_expr.expr, &contents).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalError;
    use crate::extract::UserExpr;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn position(expr: &str, indentation: usize) -> ExprPosition {
        ExprPosition {
            path: PathBuf::from("intro.md"),
            block_number: 3,
            user_expr: UserExpr::new(expr, indentation),
        }
    }

    fn failure(error: EvalError, trace: Vec<Frame>) -> EvalFailure {
        EvalFailure { error, trace }
    }

    fn standard_trace() -> Vec<Frame> {
        vec![
            Frame::builtin("error"),
            Frame::function("check"),
            Frame::top_level("intro.md, block 3"),
            Frame::host("evaluate_and_write"),
            Frame::host("gen"),
        ]
    }

    #[test]
    fn test_trim_keeps_one_host_frame() {
        assert_eq!(
            trim_trace(&standard_trace()),
            vec![
                "[1] in builtin `error`",
                "[2] in function `check`",
                "[3] top-level scope at intro.md, block 3",
                "[4] in `evaluate_and_write`",
                "⋮",
            ]
        );
    }

    #[test]
    fn test_trim_without_top_level_keeps_everything() {
        let trace = vec![Frame::host("evaluate_and_write"), Frame::host("gen")];
        assert_eq!(trim_trace(&trace).len(), 3);
    }

    #[test]
    fn test_trim_deep_recursion() {
        let mut trace: Vec<Frame> = (0..100).map(|_| Frame::function("down")).collect();
        trace.push(Frame::top_level("intro.md, block 3"));
        trace.push(Frame::host("gen"));
        let lines = trim_trace(&trace);
        assert_eq!(lines.len(), MAX_TRACE_FRAMES + 2);
        assert_eq!(lines[8], "... 86 frames omitted");
        assert_eq!(lines[MAX_TRACE_FRAMES], "[102] in `gen`");
        assert_eq!(lines.last().map(String::as_str), Some("⋮"));
    }

    #[test]
    fn test_message() {
        let diagnostic = Diagnostic::new(
            position("check(2)", 0),
            failure(EvalError::Raised("too small".to_string()), standard_trace()),
        );
        let message = diagnostic.message();
        assert!(message.starts_with("Failed to evaluate an expression in intro.md, block 3:"));
        assert!(message.contains("\n    check(2)\n"));
        assert!(message.contains("Error: too small"));
        assert!(!message.contains("in `gen`"));
        assert!(message.ends_with("Re-run only this block with `litbook gen intro.md --block 3`."));
    }

    #[test]
    fn test_report_writes_indented_output_block() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        let diagnostic = Diagnostic::new(
            position("1 / 0", 2),
            failure(EvalError::DivisionByZero, standard_trace()),
        );
        let path = report_error(&cache, &diagnostic).unwrap().unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("\n  ```output\n  Failed to evaluate"));
        assert!(written.ends_with("  ```\n"));
        assert!(written.contains("  Error: division by zero"));
    }

    #[test]
    fn test_interrupt_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        let diagnostic = Diagnostic::new(
            position("sleep(1000)", 0),
            failure(EvalError::Interrupted, vec![]),
        );
        assert_eq!(report_error(&cache, &diagnostic).unwrap(), None);
        assert_eq!(cache.read("sleep(1000)").unwrap(), None);
    }
}
