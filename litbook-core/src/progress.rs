//! Progress reporting for `gen`.

use std::path::Path;

use tracing::{error, info, warn};

/// The expression about to be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockProgress<'a> {
    /// 1-based position within the whole run.
    pub index: usize,
    pub total: usize,
    pub path: &'a Path,
    pub block_number: usize,
    pub expr: &'a str,
}

pub trait ProgressSink: Send {
    fn block_started(&mut self, progress: &BlockProgress<'_>);

    /// A block failed. `message` is the full diagnostic (position, expression,
    /// error and trimmed trace); `hint` is the command that re-runs it alone.
    fn block_failed(&mut self, progress: &BlockProgress<'_>, message: &str, hint: &str);

    fn interrupted(&mut self) {}

    fn render_failed(&mut self, message: &str);
}

/// Logs progress through `tracing`.
#[derive(Debug, Default, Clone)]
pub struct TracingProgress {
    quiet: bool,
}

impl TracingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only failures are logged.
    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

/// The first line of `expr`, marked when the rest was cut.
fn summarize(expr: &str) -> String {
    let mut lines = expr.lines();
    let first = lines.next().unwrap_or_default();
    if lines.next().is_some() {
        format!("{} ...", first)
    } else {
        first.to_string()
    }
}

impl ProgressSink for TracingProgress {
    fn block_started(&mut self, progress: &BlockProgress<'_>) {
        if self.quiet {
            return;
        }
        info!(
            "[{}/{}] {}, block {}: {}",
            progress.index,
            progress.total,
            progress.path.display(),
            progress.block_number,
            summarize(progress.expr)
        );
    }

    fn block_failed(&mut self, progress: &BlockProgress<'_>, message: &str, hint: &str) {
        error!(
            document = %progress.path.display(),
            block = progress.block_number,
            rerun = hint,
            "{}",
            message
        );
    }

    fn interrupted(&mut self) {
        warn!("interrupted");
    }

    fn render_failed(&mut self, message: &str) {
        error!("rendering failed: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize() {
        assert_eq!(summarize("x + 1"), "x + 1");
        assert_eq!(summarize("let x = 1\nx"), "let x = 1 ...");
        assert_eq!(summarize(""), "");
    }

    #[test]
    fn test_tracing_progress_accepts_events() {
        let mut sink = TracingProgress::quiet();
        let progress = BlockProgress {
            index: 1,
            total: 1,
            path: Path::new("a.md"),
            block_number: 1,
            expr: "1",
        };
        sink.block_started(&progress);
        sink.block_failed(&progress, "boom", "litbook gen a.md --block 1");
        sink.render_failed("no pandoc");
    }
}
