use std::fmt;
use std::sync::Arc;

use crate::ast::FunctionDef;

/// Runtime values of the `lit` language.
///
/// `Code`, `Table`, `Image`, `Svg` and `Captioned` exist to be rendered: the
/// output registry turns each of them into its own kind of Markdown.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    /// The value of statements that produce nothing (`let`, loops, ...).
    Unit,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Function(Arc<FunctionDef>),
    Code {
        lang: String,
        text: String,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Image {
        path: String,
        caption: Option<String>,
    },
    Svg {
        markup: String,
        caption: Option<String>,
    },
    Captioned {
        value: Box<Value>,
        caption: String,
        label: Option<String>,
    },
}

/// The category of a [`Value`]; output converters are registered per kind.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Null,
    Unit,
    Boolean,
    Integer,
    Float,
    String,
    List,
    Function,
    Code,
    Table,
    Image,
    Svg,
    Captioned,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Unit => ValueKind::Unit,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Function(_) => ValueKind::Function,
            Value::Code { .. } => ValueKind::Code,
            Value::Table { .. } => ValueKind::Table,
            Value::Image { .. } => ValueKind::Image,
            Value::Svg { .. } => ValueKind::Svg,
            Value::Captioned { .. } => ValueKind::Captioned,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Display form, except that strings nested in lists are quoted.
    fn write_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
        write!(f, "{:.1}", x)
    } else {
        write!(f, "{}", x)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Unit => Ok(()),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) => write_float(f, *x),
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.write_nested(f)?;
                }
                write!(f, "]")
            }
            Value::Function(def) => write!(f, "<fn {}>", def.name),
            Value::Code { text, .. } => write!(f, "{}", text),
            Value::Table { headers, rows } => {
                write!(f, "<table {}x{}>", rows.len(), headers.len())
            }
            Value::Image { path, .. } => write!(f, "{}", path),
            Value::Svg { .. } => write!(f, "<svg>"),
            Value::Captioned { value, .. } => write!(f, "{}", value),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}
