//! Finding executable expressions in Markdown text.
//!
//! Two syntaxes are recognized:
//!
//! - a fenced block opened with ` ```lit ` and closed by a bare fence; the
//!   number of spaces before the closing fence is the block's indentation
//! - an inline span `` `lit expr` `` preceded by a space
//!
//! Fenced blocks whose closing fence is indented by exactly four spaces are
//! documentation examples. They match the fenced pattern and are then
//! filtered out, here and in the embedder.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::debug;

use crate::{Error, InternalResult, analyzer::parse_source};

pub const DOCUMENTATION_INDENT: usize = 4;

lazy_static! {
    pub(crate) static ref CODEBLOCK_RE: Regex =
        Regex::new(r"```lit[ \t]*\r?\n\s*([^`]*)\r?\n([ ]*)```[ \t]*(?:\r?\n|\z)").unwrap();
    pub(crate) static ref INLINE_RE: Regex = Regex::new(r" `lit ([^`]*)`").unwrap();
}

/// One executable expression as written in a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserExpr {
    pub expr: String,
    /// Spaces before the closing fence; 0 for inline expressions.
    pub indentation: usize,
}

impl UserExpr {
    pub fn new(expr: impl Into<String>, indentation: usize) -> Self {
        Self {
            expr: expr.into(),
            indentation,
        }
    }
}

/// Where an expression lives: document and 1-based block number within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprPosition {
    pub path: PathBuf,
    pub block_number: usize,
    pub user_expr: UserExpr,
}

impl ExprPosition {
    /// "`path`, block `n`", as used in traces and messages.
    pub fn origin(&self) -> String {
        format!("{}, block {}", self.path.display(), self.block_number)
    }
}

pub(crate) fn codeblock_expr(caps: &Captures) -> Option<UserExpr> {
    let indentation = caps.get(2).map_or(0, |m| m.as_str().len());
    if indentation == DOCUMENTATION_INDENT {
        return None;
    }
    let body = caps.get(1).map_or("", |m| m.as_str()).replace("\r\n", "\n");
    Some(UserExpr::new(body.trim(), indentation))
}

pub(crate) fn inline_expr(caps: &Captures) -> UserExpr {
    let body = caps.get(1).map_or("", |m| m.as_str());
    UserExpr::new(body.trim(), 0)
}

/// All expressions of `text`: fenced blocks first, then inline spans, each
/// in document order. Every expression must parse.
#[tracing::instrument(level = "debug", skip(text))]
pub fn extract_expr(text: &str) -> InternalResult<Vec<UserExpr>> {
    let fenced = CODEBLOCK_RE
        .captures_iter(text)
        .filter_map(|caps| codeblock_expr(&caps));
    let inline = INLINE_RE.captures_iter(text).map(|caps| inline_expr(&caps));

    let exprs: Vec<UserExpr> = fenced.chain(inline).collect();
    for user_expr in &exprs {
        parse_source(&user_expr.expr).map_err(|source| Error::Extraction {
            document: None,
            expr: user_expr.expr.clone(),
            source,
        })?;
    }
    debug!(count = exprs.len(), "extracted expressions");
    Ok(exprs)
}

/// Extracts `text` (the contents of `path`) into numbered positions.
pub fn extract_positions(path: &Path, text: &str) -> InternalResult<Vec<ExprPosition>> {
    let exprs = extract_expr(text).map_err(|e| e.in_document(path))?;
    Ok(exprs
        .into_iter()
        .enumerate()
        .map(|(i, user_expr)| ExprPosition {
            path: path.to_path_buf(),
            block_number: i + 1,
            user_expr,
        })
        .collect())
}
