//! Conversion of evaluated values into Markdown.
//!
//! Each [`ValueKind`] maps to at most one [`OutputConverter`]. The registry
//! is built once and consulted for every evaluated expression; converters
//! that wrap other values (captions) call back into it.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use strum::IntoEnumIterator;

use crate::eval::{EvalError, EvalResult, Value, ValueKind};
use crate::extract::UserExpr;

pub mod markdown;

pub use markdown::{
    CaptionedConverter, CodeConverter, DisplayConverter, EmptyConverter, ImageConverter,
    SvgConverter, TableConverter, TextConverter,
};

pub trait OutputConverter: Send + Sync {
    /// Markdown for `value`, produced by `expr` and destined for `output_path`.
    fn convert(
        &self,
        registry: &ConverterRegistry,
        expr: &UserExpr,
        output_path: &Path,
        value: &Value,
    ) -> EvalResult<String>;
}

#[derive(Default)]
pub struct ConverterRegistry {
    converters: HashMap<ValueKind, Box<dyn OutputConverter>>,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.converters.keys().map(|k| k.as_ref()).collect();
        kinds.sort_unstable();
        f.debug_struct("ConverterRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every kind except functions, which have no Markdown form.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in ValueKind::iter() {
            let converter: Box<dyn OutputConverter> = match kind {
                ValueKind::String => Box::new(TextConverter),
                ValueKind::Null | ValueKind::Unit => Box::new(EmptyConverter),
                ValueKind::Boolean | ValueKind::Integer | ValueKind::Float | ValueKind::List => {
                    Box::new(DisplayConverter)
                }
                ValueKind::Code => Box::new(CodeConverter),
                ValueKind::Table => Box::new(TableConverter),
                ValueKind::Image => Box::new(ImageConverter),
                ValueKind::Svg => Box::new(SvgConverter),
                ValueKind::Captioned => Box::new(CaptionedConverter),
                ValueKind::Function => continue,
            };
            registry.register(kind, converter);
        }
        registry
    }

    /// Replaces any converter already registered for `kind`.
    pub fn register(&mut self, kind: ValueKind, converter: Box<dyn OutputConverter>) {
        self.converters.insert(kind, converter);
    }

    pub fn contains(&self, kind: ValueKind) -> bool {
        self.converters.contains_key(&kind)
    }

    pub fn convert(
        &self,
        expr: &UserExpr,
        output_path: &Path,
        value: &Value,
    ) -> EvalResult<String> {
        let converter = self.converters.get(&value.kind()).ok_or_else(|| {
            EvalError::Conversion(format!("{} values have no Markdown form", value.kind()))
        })?;
        converter.convert(self, expr, output_path, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Shout;

    impl OutputConverter for Shout {
        fn convert(
            &self,
            _: &ConverterRegistry,
            _: &UserExpr,
            _: &Path,
            value: &Value,
        ) -> EvalResult<String> {
            Ok(value.to_string().to_uppercase())
        }
    }

    #[test]
    fn test_function_values_are_rejected() {
        let registry = ConverterRegistry::with_defaults();
        assert!(!registry.contains(ValueKind::Function));
        let def = crate::ast::FunctionDef {
            name: "f".to_string(),
            params: vec![],
            body: vec![],
        };
        let err = registry
            .convert(
                &UserExpr::new("f", 0),
                &PathBuf::from("_gen/f.md"),
                &Value::Function(std::sync::Arc::new(def)),
            )
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::Conversion("function values have no Markdown form".to_string())
        );
    }

    #[test]
    fn test_register_replaces_converter() {
        let mut registry = ConverterRegistry::with_defaults();
        registry.register(ValueKind::String, Box::new(Shout));
        let md = registry
            .convert(&UserExpr::new("s", 0), Path::new("_gen/s.md"), &"hi".into())
            .unwrap();
        assert_eq!(md, "HI");
    }
}
