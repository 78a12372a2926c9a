//! Assembling the book and handing it to the typesetting backend.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{Cache, write_atomically};
use crate::config::BookConfig;
use crate::embed::embed_output;

pub const BOOK_STEM: &str = "book";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Turns one Markdown file into one output file.
#[cfg_attr(test, mockall::automock)]
pub trait RenderBackend: Send + Sync {
    fn render(&self, input: &Path, output: &Path) -> Result<(), RenderError>;
}

/// Runs `<program> <args...> <input> -o <output>`.
#[derive(Debug, Clone)]
pub struct PandocBackend {
    program: String,
    args: Vec<String>,
}

impl PandocBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl RenderBackend for PandocBackend {
    fn render(&self, input: &Path, output: &Path) -> Result<(), RenderError> {
        debug!(
            program = %self.program,
            input = %input.display(),
            output = %output.display(),
            "spawning renderer"
        );
        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(input)
            .arg("-o")
            .arg(output)
            .output()
            .map_err(|source| RenderError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if result.status.success() {
            Ok(())
        } else {
            Err(RenderError::Failed {
                program: self.program.clone(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            })
        }
    }
}

pub struct Renderer {
    backend: Box<dyn RenderBackend>,
    cache: Cache,
    build_dir: PathBuf,
    formats: Vec<String>,
}

impl Renderer {
    pub fn new(
        backend: Box<dyn RenderBackend>,
        cache: Cache,
        build_dir: impl Into<PathBuf>,
        formats: Vec<String>,
    ) -> Self {
        Self {
            backend,
            cache,
            build_dir: build_dir.into(),
            formats,
        }
    }

    pub fn from_config(config: &BookConfig) -> Self {
        let backend = PandocBackend::new(&config.renderer.program, config.renderer.args.clone());
        Self::new(
            Box::new(backend),
            Cache::new(&config.generated_dir),
            &config.build_dir,
            config.renderer.formats.clone(),
        )
    }

    /// Embeds outputs into every document, writes the combined Markdown and
    /// renders it once per format. Returns the rendered files.
    #[tracing::instrument(level = "debug", skip(self, documents))]
    pub fn render(&self, documents: &[PathBuf]) -> Result<Vec<PathBuf>, RenderError> {
        let mut sections = Vec::with_capacity(documents.len());
        for path in documents {
            let text = fs::read_to_string(path).map_err(|source| RenderError::Read {
                path: path.clone(),
                source,
            })?;
            sections.push(embed_output(&text, &self.cache)?.trim_end().to_string());
        }
        let markdown = self.build_dir.join(BOOK_STEM).with_extension("md");
        write_atomically(&markdown, format!("{}\n", sections.join("\n\n")).as_bytes())?;

        let mut outputs = Vec::with_capacity(self.formats.len());
        for format in &self.formats {
            let output = self.build_dir.join(BOOK_STEM).with_extension(format);
            self.backend.render(&markdown, &output)?;
            info!(output = %output.display(), "rendered");
            outputs.push(output);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_render_embeds_and_calls_backend_per_format() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().join("_gen"));
        cache.write("1 + 1", "\n2\n").unwrap();
        let doc_a = dir.path().join("a.md");
        let doc_b = dir.path().join("b.md");
        fs::write(&doc_a, "# A\n\nTwo is `lit 1 + 1`.\n").unwrap();
        fs::write(&doc_b, "# B\n").unwrap();

        let build = dir.path().join("_build");
        let mut backend = MockRenderBackend::new();
        backend
            .expect_render()
            .with(eq(build.join("book.md")), eq(build.join("book.html")))
            .times(1)
            .returning(|_, _| Ok(()));
        backend
            .expect_render()
            .with(eq(build.join("book.md")), eq(build.join("book.pdf")))
            .times(1)
            .returning(|_, _| Ok(()));

        let renderer = Renderer::new(
            Box::new(backend),
            cache,
            &build,
            vec!["html".to_string(), "pdf".to_string()],
        );
        let outputs = renderer.render(&[doc_a, doc_b]).unwrap();
        assert_eq!(outputs, vec![build.join("book.html"), build.join("book.pdf")]);
        assert_eq!(
            fs::read_to_string(build.join("book.md")).unwrap(),
            "# A\n\nTwo is 2.\n\n# B\n"
        );
    }

    #[test]
    fn test_backend_failure_is_returned() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("a.md");
        fs::write(&doc, "text\n").unwrap();
        let mut backend = MockRenderBackend::new();
        backend.expect_render().returning(|_, _| {
            Err(RenderError::Failed {
                program: "pandoc".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "bad".to_string(),
            })
        });
        let renderer = Renderer::new(
            Box::new(backend),
            Cache::new(dir.path().join("_gen")),
            dir.path().join("_build"),
            vec!["html".to_string()],
        );
        let err = renderer.render(&[doc]).unwrap_err();
        assert_eq!(err.to_string(), "`pandoc` exited with exit status: 1: bad");
    }

    #[test]
    fn test_missing_program_is_a_spawn_error() {
        let dir = TempDir::new().unwrap();
        let backend = PandocBackend::new("litbook-no-such-renderer", vec![]);
        let err = backend
            .render(&dir.path().join("in.md"), &dir.path().join("out.html"))
            .unwrap_err();
        assert!(matches!(err, RenderError::Spawn { .. }));
    }
}
