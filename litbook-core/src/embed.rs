//! Substituting cached outputs back into document text.

use std::io;

use regex::Captures;
use tracing::warn;

use crate::cache::Cache;
use crate::extract::{CODEBLOCK_RE, INLINE_RE, UserExpr, codeblock_expr, inline_expr};

fn missing_output(cache: &Cache, user_expr: &UserExpr) -> String {
    let path = cache.resolve(&user_expr.expr);
    warn!(path = %path.display(), "no cached output");
    let expr: Vec<String> = user_expr
        .expr
        .lines()
        .map(|line| format!("    {}", line))
        .collect();
    format!(
        "```output\nOutput file {} is not available for\n\n{}\n\nRun litbook gen first.\n```",
        path.display(),
        expr.join("\n")
    )
}

fn cached_or_missing(cache: &Cache, user_expr: &UserExpr) -> io::Result<String> {
    Ok(match cache.read(&user_expr.expr)? {
        Some(contents) => contents,
        None => missing_output(cache, user_expr),
    })
}

/// Replaces every executable expression in `text` with its cached output.
///
/// Fenced blocks become the left-trimmed output followed by a newline and
/// documentation blocks are kept as they are. Inline expressions become a
/// space followed by the trimmed output. Fenced blocks are handled before
/// inline expressions.
pub fn embed_output(text: &str, cache: &Cache) -> io::Result<String> {
    let mut failure: Option<io::Error> = None;

    let fenced = CODEBLOCK_RE.replace_all(text, |caps: &Captures| {
        let Some(user_expr) = codeblock_expr(caps) else {
            return caps[0].to_string();
        };
        match cached_or_missing(cache, &user_expr) {
            Ok(contents) => format!("{}\n", contents.trim_start()),
            Err(e) => {
                failure.get_or_insert(e);
                String::new()
            }
        }
    });
    if let Some(e) = failure.take() {
        return Err(e);
    }

    let inline = INLINE_RE.replace_all(&fenced, |caps: &Captures| {
        match cached_or_missing(cache, &inline_expr(caps)) {
            Ok(contents) => format!(" {}", contents.trim()),
            Err(e) => {
                failure.get_or_insert(e);
                String::new()
            }
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(inline.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_embeds_fenced_and_inline() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        cache.write("x", "\n42\n").unwrap();
        cache.write("\"table\"", "\n| a |\n| --- |\n").unwrap();

        let text = "Answer: `lit x`.\n\n```lit\n\"table\"\n```\nEnd.\n";
        assert_eq!(
            embed_output(text, &cache).unwrap(),
            "Answer: 42.\n\n| a |\n| --- |\n\nEnd.\n"
        );
    }

    #[test]
    fn test_documentation_blocks_pass_through() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        let text = "Example:\n\n    ```lit\n    1 + 1\n    ```\n";
        assert_eq!(embed_output(text, &cache).unwrap(), text);
    }

    #[test]
    fn test_embeds_crlf_documents() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        cache.write("1 + 1", "\n2\n").unwrap();
        cache.write("x", "\nten\n").unwrap();

        let text = "Intro\r\n\r\n```lit\r\n1 + 1\r\n```\r\nThen `lit x`.\r\n";
        assert_eq!(
            embed_output(text, &cache).unwrap(),
            "Intro\r\n\r\n2\n\nThen ten.\r\n"
        );

        let docs = "    ```lit\r\n    1 + 1\r\n    ```\r\n";
        assert_eq!(embed_output(docs, &cache).unwrap(), docs);
    }

    #[test]
    fn test_missing_entry() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        let embedded = embed_output("See `lit total`.", &cache).unwrap();
        assert!(embedded.starts_with("See ```output\nOutput file "));
        assert!(embedded.contains(&cache.resolve("total").display().to_string()));
        assert!(embedded.contains("\n    total\n"));
        assert!(embedded.contains("Run litbook gen first."));
    }

    #[test]
    fn test_embedding_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        cache.write("1 + 1", "\n2\n").unwrap();
        let once = embed_output("```lit\n1 + 1\n```\nand `lit 1 + 1`\n", &cache).unwrap();
        let twice = embed_output(&once, &cache).unwrap();
        assert_eq!(once, "2\n\nand 2\n");
        assert_eq!(once, twice);
    }
}
