use clap::{Args, Parser, Subcommand};
use litbook_cli::{
    CliError, CliResult,
    commands::{self, GenArgs},
};
use litbook_core::{BookConfig, InterruptFlag};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Deeply recursive `lit` code runs on these threads.
const STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: litbook.json if present)
    #[arg(short, long, env = "LITBOOK_CONFIG", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate expressions and write their outputs to the cache
    Gen(GenCommand),

    /// Print a document with cached outputs embedded
    Embed {
        /// Document to embed
        path: PathBuf,
    },

    /// Embed all configured documents and render the book
    Render,

    /// Extract and parse expressions without evaluating them
    Check {
        /// Documents to check (default: configured contents)
        paths: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct GenCommand {
    /// Documents to evaluate (default: configured contents)
    paths: Vec<PathBuf>,

    /// Evaluate only this block of the single given document
    #[arg(short, long)]
    block: Option<usize>,

    /// Exit with an error at the first failing block
    #[arg(long)]
    fail_on_error: bool,

    /// Keep going after a failing block
    #[arg(long, conflicts_with = "fail_on_error")]
    continue_on_error: bool,

    /// Skip rendering after a clean pass
    #[arg(long)]
    no_render: bool,

    /// Only log failures
    #[arg(short, long)]
    quiet: bool,
}

impl From<GenCommand> for GenArgs {
    fn from(cmd: GenCommand) -> Self {
        GenArgs {
            paths: cmd.paths,
            block: cmd.block,
            fail_on_error: cmd.fail_on_error,
            continue_on_error: cmd.continue_on_error,
            no_render: cmd.no_render,
            quiet: cmd.quiet,
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = BookConfig::load(cli.config.as_deref())?;

    let interrupt = InterruptFlag::new();
    let signal = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, stopping after the current statement");
            signal.trigger();
        }
    });

    tokio::task::spawn_blocking(move || match cli.command {
        Commands::Gen(cmd) => commands::generate(config, cmd.into(), interrupt),
        Commands::Embed { path } => commands::embed(&config, path),
        Commands::Render => commands::render(&config),
        Commands::Check { paths } => commands::check(config, paths),
    })
    .await
    .map_err(|e| CliError::Task(e.to_string()))?
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(STACK_SIZE)
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli)) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
