use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::{Error, InternalResult, eval::context::DEFAULT_MAX_CALL_DEPTH};

pub const CONFIG_FILE: &str = "litbook.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookConfig {
    #[serde(default = "default_contents_dir")]
    pub contents_dir: PathBuf,

    /// Documents of the book, in order, relative to `contents_dir`.
    #[serde(default)]
    pub contents: Vec<PathBuf>,

    #[serde(default = "default_generated_dir")]
    pub generated_dir: PathBuf,

    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    #[serde(default)]
    pub fail_on_error: bool,

    #[serde(default)]
    pub continue_on_error: bool,

    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,

    #[serde(default)]
    pub renderer: RendererConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

fn default_contents_dir() -> PathBuf {
    PathBuf::from("contents")
}

fn default_generated_dir() -> PathBuf {
    PathBuf::from("_gen")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("_build")
}

fn default_max_call_depth() -> usize {
    DEFAULT_MAX_CALL_DEPTH
}

fn default_program() -> String {
    "pandoc".to_string()
}

fn default_formats() -> Vec<String> {
    vec!["html".to_string()]
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            formats: default_formats(),
        }
    }
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            contents_dir: default_contents_dir(),
            contents: Vec::new(),
            generated_dir: default_generated_dir(),
            build_dir: default_build_dir(),
            fail_on_error: false,
            continue_on_error: false,
            max_call_depth: default_max_call_depth(),
            renderer: RendererConfig::default(),
        }
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path.as_ref()).map_err(|e| {
        Error::Config(format!(
            "Failed to open {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader).map_err(|e| {
        Error::Config(format!(
            "Failed to parse {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

impl BookConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }

    /// Reads `path`, or `litbook.json` in the working directory. A missing
    /// default file means the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> InternalResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(CONFIG_FILE).exists() => Self::from_file(CONFIG_FILE),
            None => {
                debug!("no {} found, using defaults", CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    /// The configured documents, resolved against `contents_dir`.
    pub fn content_paths(&self) -> Vec<PathBuf> {
        self.contents
            .iter()
            .map(|path| self.contents_dir.join(path))
            .collect()
    }

    /// A document named on the command line: used as given when it exists,
    /// otherwise looked up under `contents_dir`.
    pub fn resolve_document(&self, path: &Path) -> PathBuf {
        if path.exists() || path.is_absolute() {
            path.to_path_buf()
        } else {
            self.contents_dir.join(path)
        }
    }
}
