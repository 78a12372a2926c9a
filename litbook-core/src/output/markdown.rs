use std::path::Path;

use tracing::debug;

use super::{ConverterRegistry, OutputConverter};
use crate::cache::write_atomically;
use crate::eval::{EvalError, EvalResult, Value};
use crate::extract::UserExpr;

/// Strings are already Markdown.
pub struct TextConverter;

impl OutputConverter for TextConverter {
    fn convert(
        &self,
        _: &ConverterRegistry,
        _: &UserExpr,
        _: &Path,
        value: &Value,
    ) -> EvalResult<String> {
        Ok(value.to_string())
    }
}

/// `null` and statements without a value render as nothing.
pub struct EmptyConverter;

impl OutputConverter for EmptyConverter {
    fn convert(
        &self,
        _: &ConverterRegistry,
        _: &UserExpr,
        _: &Path,
        _: &Value,
    ) -> EvalResult<String> {
        Ok(String::new())
    }
}

pub struct DisplayConverter;

impl OutputConverter for DisplayConverter {
    fn convert(
        &self,
        _: &ConverterRegistry,
        _: &UserExpr,
        _: &Path,
        value: &Value,
    ) -> EvalResult<String> {
        Ok(value.to_string())
    }
}

pub struct CodeConverter;

impl OutputConverter for CodeConverter {
    fn convert(
        &self,
        _: &ConverterRegistry,
        _: &UserExpr,
        _: &Path,
        value: &Value,
    ) -> EvalResult<String> {
        match value {
            Value::Code { lang, text } => Ok(format!(
                "```{}\n{}\n```",
                lang,
                text.trim_end_matches('\n')
            )),
            other => Err(unexpected("code", other)),
        }
    }
}

pub struct TableConverter;

fn table_cell(value: &Value) -> String {
    value
        .to_string()
        .replace('|', "\\|")
        .replace('\n', " ")
}

fn table_row(cells: impl Iterator<Item = String>) -> String {
    let cells: Vec<String> = cells.collect();
    format!("| {} |", cells.join(" | "))
}

impl OutputConverter for TableConverter {
    fn convert(
        &self,
        _: &ConverterRegistry,
        _: &UserExpr,
        _: &Path,
        value: &Value,
    ) -> EvalResult<String> {
        let Value::Table { headers, rows } = value else {
            return Err(unexpected("table", value));
        };
        let mut lines = Vec::with_capacity(rows.len() + 2);
        lines.push(table_row(headers.iter().map(|h| h.replace('|', "\\|"))));
        lines.push(table_row(headers.iter().map(|_| "---".to_string())));
        for row in rows {
            lines.push(table_row(row.iter().map(table_cell)));
        }
        Ok(lines.join("\n"))
    }
}

pub struct ImageConverter;

impl OutputConverter for ImageConverter {
    fn convert(
        &self,
        _: &ConverterRegistry,
        _: &UserExpr,
        _: &Path,
        value: &Value,
    ) -> EvalResult<String> {
        match value {
            Value::Image { path, caption } => Ok(image_link(caption.as_deref(), path)),
            other => Err(unexpected("image", other)),
        }
    }
}

/// Writes the markup next to the cache entry, under `im/`, and links to it.
pub struct SvgConverter;

impl OutputConverter for SvgConverter {
    fn convert(
        &self,
        _: &ConverterRegistry,
        _: &UserExpr,
        output_path: &Path,
        value: &Value,
    ) -> EvalResult<String> {
        let Value::Svg { markup, caption } = value else {
            return Err(unexpected("svg", value));
        };
        let stem = output_path.file_stem().ok_or_else(|| {
            EvalError::Conversion(format!("no file name in {}", output_path.display()))
        })?;
        let dir = output_path.parent().unwrap_or_else(|| Path::new(""));
        let svg_path = dir.join("im").join(stem).with_extension("svg");
        write_atomically(&svg_path, markup.as_bytes())?;
        debug!(path = %svg_path.display(), "wrote svg");
        Ok(image_link(caption.as_deref(), &svg_path.display().to_string()))
    }
}

/// Pandoc captions: `Table: ...` after tables, a `{#fig:...}` attribute on figures.
pub struct CaptionedConverter;

impl OutputConverter for CaptionedConverter {
    fn convert(
        &self,
        registry: &ConverterRegistry,
        expr: &UserExpr,
        output_path: &Path,
        value: &Value,
    ) -> EvalResult<String> {
        let Value::Captioned {
            value: inner,
            caption,
            label,
        } = value
        else {
            return Err(unexpected("captioned", value));
        };
        match inner.as_ref() {
            Value::Table { .. } => {
                let table = registry.convert(expr, output_path, inner)?;
                let label = label
                    .as_ref()
                    .map(|l| format!(" {{#tbl:{}}}", l))
                    .unwrap_or_default();
                Ok(format!("{}\n\nTable: {}{}", table, caption, label))
            }
            Value::Image { path, .. } => {
                let figure = Value::Image {
                    path: path.clone(),
                    caption: Some(caption.clone()),
                };
                Ok(with_figure_label(registry.convert(expr, output_path, &figure)?, label))
            }
            Value::Svg { markup, .. } => {
                let figure = Value::Svg {
                    markup: markup.clone(),
                    caption: Some(caption.clone()),
                };
                Ok(with_figure_label(registry.convert(expr, output_path, &figure)?, label))
            }
            other => Err(EvalError::Conversion(format!(
                "only tables and figures can be captioned, found {}",
                other.kind()
            ))),
        }
    }
}

fn image_link(caption: Option<&str>, path: &str) -> String {
    format!("![{}]({})", caption.unwrap_or_default(), path)
}

fn with_figure_label(figure: String, label: &Option<String>) -> String {
    match label {
        Some(label) => format!("{}{{#fig:{}}}", figure, label),
        None => figure,
    }
}

fn unexpected(expected: &str, found: &Value) -> EvalError {
    EvalError::Conversion(format!("expected a {} value, found {}", expected, found.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn convert(value: Value) -> EvalResult<String> {
        ConverterRegistry::with_defaults().convert(
            &UserExpr::new("x", 0),
            Path::new("_gen/x.md"),
            &value,
        )
    }

    fn table() -> Value {
        Value::Table {
            headers: vec!["name".to_string(), "n".to_string()],
            rows: vec![
                vec!["a|b".into(), Value::Integer(1)],
                vec!["c".into(), Value::Float(2.5)],
            ],
        }
    }

    #[test]
    fn test_scalars() {
        assert_eq!(convert("*hi*".into()).unwrap(), "*hi*");
        assert_eq!(convert(Value::Null).unwrap(), "");
        assert_eq!(convert(Value::Unit).unwrap(), "");
        assert_eq!(convert(Value::Float(3.0)).unwrap(), "3.0");
        assert_eq!(convert(Value::Boolean(false)).unwrap(), "false");
    }

    #[test]
    fn test_code_block() {
        let code = Value::Code {
            lang: "rust".to_string(),
            text: "fn main() {}\n".to_string(),
        };
        assert_eq!(convert(code).unwrap(), "```rust\nfn main() {}\n```");
    }

    #[test]
    fn test_pipe_table() {
        assert_eq!(
            convert(table()).unwrap(),
            "| name | n |\n| --- | --- |\n| a\\|b | 1 |\n| c | 2.5 |"
        );
    }

    #[test]
    fn test_captioned_table_and_image() {
        let captioned = Value::Captioned {
            value: Box::new(table()),
            caption: "Counts".to_string(),
            label: Some("counts".to_string()),
        };
        assert!(
            convert(captioned)
                .unwrap()
                .ends_with("| c | 2.5 |\n\nTable: Counts {#tbl:counts}")
        );

        let figure = Value::Captioned {
            value: Box::new(Value::Image {
                path: "plot.png".to_string(),
                caption: None,
            }),
            caption: "A plot".to_string(),
            label: Some("plot".to_string()),
        };
        assert_eq!(convert(figure).unwrap(), "![A plot](plot.png){#fig:plot}");
    }

    #[test]
    fn test_caption_on_a_number_fails() {
        let captioned = Value::Captioned {
            value: Box::new(Value::Integer(1)),
            caption: "One".to_string(),
            label: None,
        };
        assert!(matches!(convert(captioned), Err(EvalError::Conversion(_))));
    }

    #[test]
    fn test_svg_is_written_beside_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("circle.md");
        let svg = Value::Svg {
            markup: "<svg></svg>".to_string(),
            caption: Some("Circle".to_string()),
        };
        let md = ConverterRegistry::with_defaults()
            .convert(&UserExpr::new("circle", 0), &output_path, &svg)
            .unwrap();
        let expected: PathBuf = dir.path().join("im").join("circle.svg");
        assert_eq!(std::fs::read_to_string(&expected).unwrap(), "<svg></svg>");
        assert_eq!(md, format!("![Circle]({})", expected.display()));
    }
}
