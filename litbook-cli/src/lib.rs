//! Command implementations behind the `litbook` binary.
//!
//! Every command is synchronous; the binary runs them on a blocking task so
//! the async side stays free to watch for Ctrl-C.

use thiserror::Error;

pub mod commands;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] litbook_core::Error),
    #[error("{0} block(s) failed")]
    Failed(usize),
    #[error("Interrupted")]
    Interrupted,
    #[error("Render error: {0}")]
    Render(#[from] litbook_core::render::RenderError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task error: {0}")]
    Task(String),
}

impl CliError {
    /// 2 for an interrupted run, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Interrupted => 2,
            _ => 1,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
