use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::analyzer::SyntaxError;
use crate::render::RenderError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", extraction_message(.document.as_deref(), .expr, .source))]
    Extraction {
        document: Option<PathBuf>,
        expr: String,
        #[source]
        source: SyntaxError,
    },
    #[error("Evaluation error in {}, block {block_number}: {message}", .document.display())]
    Evaluation {
        document: PathBuf,
        block_number: usize,
        message: String,
    },
    #[error("--block needs exactly one document, got {0}")]
    BlockNumberNeedsSinglePath(usize),
    #[error(
        "Block {block_number} does not exist in {}: it has {count} block(s)",
        .document.display()
    )]
    BlockNumberOutOfRange {
        document: PathBuf,
        block_number: usize,
        count: usize,
    },
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

fn extraction_message(document: Option<&Path>, expr: &str, source: &SyntaxError) -> String {
    let location = document
        .map(|path| format!(" in {}", path.display()))
        .unwrap_or_default();
    format!(
        "Failed to parse expression{}: {}\n\n    {}\n",
        location,
        source,
        expr.replace('\n', "\n    ")
    )
}

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }

    /// Attaches the document an extraction error came from.
    pub(crate) fn in_document(self, path: &Path) -> Self {
        match self {
            Error::Extraction { expr, source, .. } => Error::Extraction {
                document: Some(path.to_path_buf()),
                expr,
                source,
            },
            other => other,
        }
    }
}
