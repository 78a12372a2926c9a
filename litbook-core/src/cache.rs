//! The generated-output cache: one Markdown file per expression.
//!
//! The file name is derived from the expression text alone, so the
//! orchestrator (writing) and the embedder (reading) agree without any
//! index. Only the first [`MAX_KEY_CHARS`] characters are used: two
//! expressions sharing that prefix, or differing only in punctuation,
//! share one cache file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tempfile::NamedTempFile;
use tracing::trace;

pub const MAX_KEY_CHARS: usize = 80;
pub const CACHE_EXTENSION: &str = "md";

lazy_static! {
    static ref NON_ALNUM_RE: Regex = Regex::new(r"[^A-Za-z0-9]+").unwrap();
}

/// Filesystem-safe stem for `expr`.
pub fn escape_expr(expr: &str) -> String {
    let head: String = expr.chars().take(MAX_KEY_CHARS).collect();
    NON_ALNUM_RE.replace_all(&head, "_").into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory for side files such as rendered figures.
    pub fn image_dir(&self) -> PathBuf {
        self.dir.join("im")
    }

    pub fn resolve(&self, expr: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", escape_expr(expr), CACHE_EXTENSION))
    }

    /// `None` when nothing has been generated for `expr` yet.
    pub fn read(&self, expr: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.resolve(expr)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn write(&self, expr: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.resolve(expr);
        write_atomically(&path, contents.as_bytes())?;
        Ok(path)
    }
}

/// Writes through a temporary file in the target directory, then renames it
/// over `path`. Readers see the old contents or the new, never a mix.
pub fn write_atomically(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| e.error)?;
    trace!(path = %path.display(), bytes = data.len(), "wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_escape() {
        assert_eq!(escape_expr("1 + 1"), "1_1");
        assert_eq!(escape_expr("sum([1, 2, 3])"), "sum_1_2_3_");
        assert_eq!(escape_expr("plain"), "plain");
    }

    #[test]
    fn test_resolve() {
        let cache = Cache::new("_gen");
        assert_eq!(cache.resolve("x * 2"), PathBuf::from("_gen/x_2.md"));
    }

    #[test]
    fn test_truncation_collision() {
        let prefix = "a".repeat(MAX_KEY_CHARS);
        let cache = Cache::new("_gen");
        assert_eq!(
            cache.resolve(&format!("{prefix} + 1")),
            cache.resolve(&format!("{prefix} + 2"))
        );
    }

    #[test]
    fn test_truncation_counts_characters() {
        let expr = "é".repeat(MAX_KEY_CHARS + 10);
        assert_eq!(escape_expr(&expr), "_");
    }

    #[test]
    fn test_read_missing_and_write() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().join("nested").join("_gen"));
        assert_eq!(cache.read("1 + 1").unwrap(), None);

        let path = cache.write("1 + 1", "\n2\n").unwrap();
        assert_eq!(path, cache.resolve("1 + 1"));
        assert_eq!(cache.read("1 + 1").unwrap().as_deref(), Some("\n2\n"));

        cache.write("1 + 1", "\n3\n").unwrap();
        assert_eq!(cache.read("1 + 1").unwrap().as_deref(), Some("\n3\n"));
    }

    proptest! {
        #[test]
        fn test_escape_is_filesystem_safe(expr in "\\PC{0,200}") {
            let key = escape_expr(&expr);
            prop_assert!(key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            prop_assert!(!key.contains("__"));
            prop_assert!(key.chars().count() <= MAX_KEY_CHARS);
        }

        #[test]
        fn test_resolve_is_deterministic(expr in "\\PC{0,200}") {
            let cache = Cache::new("_gen");
            prop_assert_eq!(cache.resolve(&expr), cache.resolve(&expr.clone()));
        }

        #[test]
        fn test_only_the_prefix_matters(
            prefix in "[a-z0-9 ]{80}",
            a in "[a-z]{1,20}",
            b in "[a-z]{1,20}",
        ) {
            prop_assert_eq!(
                escape_expr(&format!("{prefix}{a}")),
                escape_expr(&format!("{prefix}{b}"))
            );
        }
    }
}
