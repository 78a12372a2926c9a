use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use litbook_core::{
    BookConfig, Cache, GenOptions, GenOutcome, Generator, InterruptFlag, embed_output,
    progress::TracingProgress, render::Renderer,
};
use tracing::{debug, info};

use crate::{CliError, CliResult};

#[derive(Debug, Clone, Default)]
pub struct GenArgs {
    pub paths: Vec<PathBuf>,
    pub block: Option<usize>,
    pub fail_on_error: bool,
    pub continue_on_error: bool,
    pub no_render: bool,
    pub quiet: bool,
}

pub fn generate(config: BookConfig, args: GenArgs, interrupt: InterruptFlag) -> CliResult<()> {
    let options = GenOptions {
        paths: args.paths,
        block_number: args.block,
        fail_on_error: args.fail_on_error || config.fail_on_error,
        continue_on_error: args.continue_on_error || config.continue_on_error,
        render: !args.no_render,
    };
    debug!(?options, "gen");

    let progress = if args.quiet {
        TracingProgress::quiet()
    } else {
        TracingProgress::new()
    };
    let renderer = Renderer::from_config(&config);
    let mut generator = Generator::new(config)
        .with_interrupt(interrupt)
        .with_progress(Box::new(progress))
        .with_renderer(renderer);

    let report = generator.run(&options)?;
    match report.outcome {
        GenOutcome::Completed => {
            info!(
                "Generated {} block(s) into {}",
                report.succeeded(),
                generator.generated_dir().display()
            );
            for path in &report.rendered {
                println!("{}", path.display());
            }
            Ok(())
        }
        GenOutcome::Failed => Err(CliError::Failed(report.failed())),
        GenOutcome::Interrupted => Err(CliError::Interrupted),
    }
}

/// Prints `path` with every cached output substituted.
pub fn embed(config: &BookConfig, path: PathBuf) -> CliResult<()> {
    let path = config.resolve_document(&path);
    let text = fs::read_to_string(&path)?;
    let embedded = embed_output(&text, &Cache::new(&config.generated_dir))?;
    io::stdout().write_all(embedded.as_bytes())?;
    Ok(())
}

pub fn render(config: &BookConfig) -> CliResult<()> {
    let outputs = Renderer::from_config(config).render(&config.content_paths())?;
    for path in outputs {
        println!("{}", path.display());
    }
    Ok(())
}

/// Extraction and parsing only; nothing is evaluated.
pub fn check(config: BookConfig, paths: Vec<PathBuf>) -> CliResult<()> {
    let generator = Generator::new(config);
    let positions = generator.check(&GenOptions {
        paths,
        ..GenOptions::default()
    })?;
    let mut out = io::stdout().lock();
    for position in &positions {
        let first_line = position.user_expr.expr.lines().next().unwrap_or_default();
        writeln!(out, "{}: {}", position.origin(), first_line)?;
    }
    writeln!(out, "{} expression(s) OK", positions.len())?;
    Ok(())
}
