//! The `gen` pass: evaluate every expression of a set of documents.
//!
//! Expressions run strictly in order (documents as given, then extraction
//! order within each document) against one [`ExecutionContext`] owned by the
//! [`Generator`]. The context outlives a single [`Generator::run`], so a
//! selective re-run sees the bindings of earlier runs in the same session.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::{
    Error, InternalResult,
    cache::Cache,
    config::BookConfig,
    eval::{EvalFailure, Evaluator, ExecutionContext, Frame, InterruptFlag},
    extract::{ExprPosition, extract_positions},
    output::ConverterRegistry,
    progress::{BlockProgress, ProgressSink, TracingProgress},
    render::Renderer,
    report::{Diagnostic, report_error, rerun_hint},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenOptions {
    /// Documents to evaluate; empty means the configured contents.
    pub paths: Vec<PathBuf>,
    /// Evaluate only this block (1-based) of the single document in `paths`.
    pub block_number: Option<usize>,
    /// Return an error for the first failing block.
    pub fail_on_error: bool,
    /// Keep evaluating after a failing block.
    pub continue_on_error: bool,
    /// Render the book after a clean pass when a renderer is configured.
    pub render: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum BlockState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockRun {
    pub position: ExprPosition,
    pub state: BlockState,
    /// The cache entry written, for successes and failures alike.
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum GenOutcome {
    Completed,
    Failed,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenReport {
    pub outcome: GenOutcome,
    pub blocks: Vec<BlockRun>,
    pub rendered: Vec<PathBuf>,
    pub render_error: Option<String>,
}

impl GenReport {
    fn count(&self, state: BlockState) -> usize {
        self.blocks.iter().filter(|b| b.state == state).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(BlockState::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(BlockState::Failed)
    }
}

/// Reads every document and extracts its positions, before anything runs.
pub fn collect_positions(documents: &[PathBuf]) -> InternalResult<Vec<ExprPosition>> {
    let mut positions = Vec::new();
    for path in documents {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read {}: {}", path.display(), e),
            ))
        })?;
        positions.extend(extract_positions(path, &text)?);
    }
    Ok(positions)
}

pub struct Generator {
    config: BookConfig,
    evaluator: Evaluator,
    context: ExecutionContext,
    progress: Box<dyn ProgressSink>,
    renderer: Option<Renderer>,
}

impl Generator {
    pub fn new(config: BookConfig) -> Self {
        let evaluator = Evaluator::new(
            Cache::new(&config.generated_dir),
            ConverterRegistry::with_defaults(),
        );
        let context = ExecutionContext::new(InterruptFlag::new(), config.max_call_depth);
        Self {
            config,
            evaluator,
            context,
            progress: Box::new(TracingProgress::new()),
            renderer: None,
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Starts a fresh context polling `flag`.
    pub fn with_interrupt(mut self, flag: InterruptFlag) -> Self {
        self.context = ExecutionContext::new(flag, self.config.max_call_depth);
        self
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn interrupt_flag(&self) -> InterruptFlag {
        self.context.interrupt_flag().clone()
    }

    /// The documents `options` names, or the configured contents.
    pub fn documents(&self, options: &GenOptions) -> Vec<PathBuf> {
        if options.paths.is_empty() {
            self.config.content_paths()
        } else {
            options
                .paths
                .iter()
                .map(|path| self.config.resolve_document(path))
                .collect()
        }
    }

    fn select(
        &self,
        documents: &[PathBuf],
        block_number: Option<usize>,
    ) -> InternalResult<Vec<ExprPosition>> {
        let Some(block_number) = block_number else {
            return collect_positions(documents);
        };
        let [document] = documents else {
            return Err(Error::BlockNumberNeedsSinglePath(documents.len()));
        };
        let mut positions = collect_positions(documents)?;
        let count = positions.len();
        if block_number == 0 || block_number > count {
            return Err(Error::BlockNumberOutOfRange {
                document: document.clone(),
                block_number,
                count,
            });
        }
        Ok(vec![positions.swap_remove(block_number - 1)])
    }

    /// Evaluates the selected expressions and, after a clean pass, renders.
    ///
    /// Extraction problems, bad block selections and I/O failures are errors.
    /// A failing expression is not: its diagnostic goes to the cache and the
    /// report says [`GenOutcome::Failed`], unless `fail_on_error` is set.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn run(&mut self, options: &GenOptions) -> InternalResult<GenReport> {
        self.context.interrupt_flag().reset();

        let documents = self.documents(options);
        let positions = self.select(&documents, options.block_number)?;
        let total = positions.len();
        info!(documents = documents.len(), blocks = total, "generating");

        let mut blocks: Vec<BlockRun> = positions
            .into_iter()
            .map(|position| BlockRun {
                position,
                state: BlockState::Pending,
                output: None,
            })
            .collect();
        let mut outcome = GenOutcome::Completed;

        for (index, block) in blocks.iter_mut().enumerate() {
            let position = block.position.clone();
            let progress = BlockProgress {
                index: index + 1,
                total,
                path: &position.path,
                block_number: position.block_number,
                expr: &position.user_expr.expr,
            };
            self.progress.block_started(&progress);
            block.state = BlockState::Running;

            match self.evaluate(&position) {
                Ok(path) => {
                    block.state = BlockState::Succeeded;
                    block.output = Some(path);
                }
                Err(failure) if failure.is_interrupt() => {
                    block.state = BlockState::Interrupted;
                    self.progress.interrupted();
                    outcome = GenOutcome::Interrupted;
                    break;
                }
                Err(failure) => {
                    let message = failure.error.to_string();
                    let diagnostic = Diagnostic::new(position.clone(), failure);
                    block.output = report_error(self.evaluator.cache(), &diagnostic)?;
                    block.state = BlockState::Failed;
                    outcome = GenOutcome::Failed;
                    self.progress.block_failed(
                        &progress,
                        &diagnostic.message(),
                        &rerun_hint(&position),
                    );

                    if options.fail_on_error {
                        return Err(Error::Evaluation {
                            document: position.path.clone(),
                            block_number: position.block_number,
                            message,
                        });
                    }
                    if !options.continue_on_error {
                        break;
                    }
                }
            }
        }

        let mut report = GenReport {
            outcome,
            blocks,
            rendered: Vec::new(),
            render_error: None,
        };
        if outcome == GenOutcome::Completed && options.render {
            self.render(&documents, &mut report);
        }
        debug!(
            outcome = %report.outcome,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "gen finished"
        );
        Ok(report)
    }

    fn evaluate(&mut self, position: &ExprPosition) -> Result<PathBuf, EvalFailure> {
        let origin = position.origin();
        let evaluator = &self.evaluator;
        self.context.within(Frame::host("gen"), |ctx| {
            evaluator.evaluate_and_write(ctx, &position.user_expr, &origin)
        })
    }

    /// Render failures are reported, never returned.
    fn render(&mut self, documents: &[PathBuf], report: &mut GenReport) {
        let Some(renderer) = &self.renderer else {
            return;
        };
        let book = self.config.content_paths();
        let sources: &[PathBuf] = if book.is_empty() { documents } else { &book };
        match renderer.render(sources) {
            Ok(rendered) => report.rendered = rendered,
            Err(e) => {
                let message = e.to_string();
                error!(error = %message, "render failed");
                self.progress.render_failed(&message);
                report.render_error = Some(message);
            }
        }
    }

    /// Extraction-only pass over the documents `options` names.
    pub fn check(&self, options: &GenOptions) -> InternalResult<Vec<ExprPosition>> {
        self.select(&self.documents(options), options.block_number)
    }

    pub fn generated_path(&self, expr: &str) -> PathBuf {
        self.evaluator.cache().resolve(expr)
    }

    pub fn generated_dir(&self) -> &Path {
        self.evaluator.cache().dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{MockRenderBackend, RenderError};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Started(usize, usize, usize),
        Failed(usize, String),
        Message(String),
        Interrupted,
        RenderFailed,
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Event>>>);

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ProgressSink for Recorder {
        fn block_started(&mut self, p: &BlockProgress<'_>) {
            self.0
                .lock()
                .unwrap()
                .push(Event::Started(p.index, p.total, p.block_number));
        }

        fn block_failed(&mut self, p: &BlockProgress<'_>, message: &str, hint: &str) {
            let mut events = self.0.lock().unwrap();
            events.push(Event::Failed(p.block_number, hint.to_string()));
            events.push(Event::Message(message.to_string()));
        }

        fn interrupted(&mut self) {
            self.0.lock().unwrap().push(Event::Interrupted);
        }

        fn render_failed(&mut self, _: &str) {
            self.0.lock().unwrap().push(Event::RenderFailed);
        }
    }

    struct Book {
        dir: TempDir,
        config: BookConfig,
    }

    impl Book {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = BookConfig {
                contents_dir: dir.path().join("contents"),
                generated_dir: dir.path().join("_gen"),
                build_dir: dir.path().join("_build"),
                ..BookConfig::default()
            };
            fs::create_dir_all(&config.contents_dir).unwrap();
            Self { dir, config }
        }

        fn write(&self, name: &str, text: &str) -> PathBuf {
            let path = self.config.contents_dir.join(name);
            fs::write(&path, text).unwrap();
            path
        }

        fn generator(&self) -> (Generator, Recorder) {
            let recorder = Recorder::default();
            let generator =
                Generator::new(self.config.clone()).with_progress(Box::new(recorder.clone()));
            (generator, recorder)
        }
    }

    fn options(paths: Vec<PathBuf>) -> GenOptions {
        GenOptions {
            paths,
            ..GenOptions::default()
        }
    }

    #[test]
    fn test_bindings_flow_across_documents() {
        let book = Book::new();
        let a = book.write("a.md", "```lit\nlet base = 40\n```\n");
        let b = book.write("b.md", "Answer: `lit base + 2`\n");
        let (mut generator, recorder) = book.generator();

        let report = generator.run(&options(vec![a, b])).unwrap();
        assert_eq!(report.outcome, GenOutcome::Completed);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(
            recorder.events(),
            vec![Event::Started(1, 2, 1), Event::Started(2, 2, 1)]
        );
        let cached = fs::read_to_string(generator.generated_path("base + 2")).unwrap();
        assert_eq!(cached, "\n42\n");
    }

    #[test]
    fn test_fail_fast_stops_after_first_failure() {
        let book = Book::new();
        let doc = book.write("a.md", " `lit 1` `lit error(\"no\")` `lit 3`");
        let (mut generator, recorder) = book.generator();

        let report = generator.run(&options(vec![doc.clone()])).unwrap();
        assert_eq!(report.outcome, GenOutcome::Failed);
        let states: Vec<BlockState> = report.blocks.iter().map(|b| b.state).collect();
        assert_eq!(
            states,
            vec![BlockState::Succeeded, BlockState::Failed, BlockState::Pending]
        );
        let hint = format!("litbook gen {} --block 2", doc.display());
        let events = recorder.events();
        assert_eq!(events[2], Event::Failed(2, hint));
        let Event::Message(message) = &events[3] else {
            panic!("expected the diagnostic message, got {:?}", events[3]);
        };
        assert!(message.starts_with(&format!(
            "Failed to evaluate an expression in {}, block 2:",
            doc.display()
        )));
        assert!(message.contains("\n    error(\"no\")\n"));
        assert!(message.contains("Error: no"));
        assert!(message.contains(&format!("] {}, block 2\n", doc.display())));
        assert!(message.contains("] in `evaluate_and_write`\n"));
        assert_eq!(events.len(), 4);
        let diagnostic = fs::read_to_string(generator.generated_path("error(\"no\")")).unwrap();
        assert!(diagnostic.contains("```output"));
        assert!(diagnostic.contains("in `evaluate_and_write`"));
        assert!(!diagnostic.contains("in `gen`"));
    }

    #[test]
    fn test_continue_on_error_runs_everything() {
        let book = Book::new();
        let doc = book.write("a.md", " `lit 1 / 0` `lit 2`");
        let (mut generator, _) = book.generator();
        let report = generator
            .run(&GenOptions {
                continue_on_error: true,
                ..options(vec![doc])
            })
            .unwrap();
        assert_eq!(report.outcome, GenOutcome::Failed);
        assert_eq!((report.succeeded(), report.failed()), (1, 1));
    }

    #[test]
    fn test_fail_on_error_returns_an_error_after_writing() {
        let book = Book::new();
        let doc = book.write("a.md", " `lit 1 / 0`");
        let (mut generator, _) = book.generator();
        let err = generator
            .run(&GenOptions {
                fail_on_error: true,
                ..options(vec![doc])
            })
            .unwrap_err();
        assert!(matches!(err, Error::Evaluation { block_number: 1, .. }));
        assert!(generator.generated_path("1 / 0").exists());
    }

    #[test]
    fn test_selective_rerun() {
        let book = Book::new();
        let doc = book.write("a.md", " `lit 1` `lit 2` `lit 3`");
        let (mut generator, recorder) = book.generator();
        let report = generator
            .run(&GenOptions {
                block_number: Some(2),
                ..options(vec![doc.clone()])
            })
            .unwrap();
        assert_eq!(report.blocks.len(), 1);
        assert_eq!(report.blocks[0].position.user_expr.expr, "2");
        assert_eq!(recorder.events(), vec![Event::Started(1, 1, 2)]);
        assert!(!generator.generated_path("1").exists());

        let err = generator
            .run(&GenOptions {
                block_number: Some(4),
                ..options(vec![doc.clone()])
            })
            .unwrap_err();
        assert!(matches!(
            err,
            Error::BlockNumberOutOfRange {
                block_number: 4,
                count: 3,
                ..
            }
        ));

        let err = generator
            .run(&GenOptions {
                block_number: Some(1),
                ..options(vec![doc.clone(), doc])
            })
            .unwrap_err();
        assert!(matches!(err, Error::BlockNumberNeedsSinglePath(2)));
    }

    #[test]
    fn test_extraction_error_aborts_before_evaluating() {
        let book = Book::new();
        let good = book.write("a.md", " `lit 1`");
        let bad = book.write("b.md", " `lit (`");
        let (mut generator, recorder) = book.generator();
        let err = generator.run(&options(vec![good, bad])).unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
        assert!(recorder.events().is_empty());
        assert!(!generator.generated_path("1").exists());
    }

    #[test]
    fn test_interrupt_writes_nothing() {
        let book = Book::new();
        let doc = book.write("a.md", " `lit sleep(60000)` `lit 2`");
        let (generator, recorder) = book.generator();
        let flag = InterruptFlag::new();
        let mut generator = generator.with_interrupt(flag.clone());

        let trigger = flag.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(200));
            trigger.trigger();
        });
        let report = generator.run(&options(vec![doc])).unwrap();
        handle.join().unwrap();

        assert_eq!(report.outcome, GenOutcome::Interrupted);
        let states: Vec<BlockState> = report.blocks.iter().map(|b| b.state).collect();
        assert_eq!(states, vec![BlockState::Interrupted, BlockState::Pending]);
        assert_eq!(recorder.events().last(), Some(&Event::Interrupted));
        assert!(!generator.generated_path("sleep(60000)").exists());
        assert!(!generator.generated_path("2").exists());
    }

    #[test]
    fn test_render_failure_is_reported_not_returned() {
        let book = Book::new();
        let doc = book.write("a.md", " `lit 1`");
        let mut backend = MockRenderBackend::new();
        backend.expect_render().returning(|_, _| {
            Err(RenderError::Spawn {
                program: "pandoc".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            })
        });
        let renderer = Renderer::new(
            Box::new(backend),
            Cache::new(&book.config.generated_dir),
            &book.config.build_dir,
            vec!["html".to_string()],
        );
        let (generator, recorder) = book.generator();
        let mut generator = generator.with_renderer(renderer);

        let report = generator
            .run(&GenOptions {
                render: true,
                ..options(vec![doc])
            })
            .unwrap();
        assert_eq!(report.outcome, GenOutcome::Completed);
        assert!(report.render_error.is_some());
        assert_eq!(recorder.events().last(), Some(&Event::RenderFailed));
        assert!(book.dir.path().join("_build").join("book.md").exists());
    }

    #[test]
    fn test_empty_set_completes() {
        let book = Book::new();
        let (mut generator, _) = book.generator();
        let report = generator.run(&GenOptions::default()).unwrap();
        assert_eq!(report.outcome, GenOutcome::Completed);
        assert!(report.blocks.is_empty());
    }
}
