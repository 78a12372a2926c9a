//! Builtin functions available to every expression.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;

use super::{
    EvalError, EvalResult,
    context::ExecutionContext,
    expression::{compare, eval_binary, values_equal},
    value::Value,
};
use crate::ast::BinaryOperator;

pub type Builtin = fn(&mut ExecutionContext, Vec<Value>) -> EvalResult<Value>;

/// Granularity at which `sleep` polls the interrupt flag.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

lazy_static! {
    static ref BUILTINS: HashMap<&'static str, Builtin> = {
        let mut m: HashMap<&'static str, Builtin> = HashMap::new();
        m.insert("len", len);
        m.insert("str", to_str);
        m.insert("upper", upper);
        m.insert("lower", lower);
        m.insert("trim", trim);
        m.insert("join", join);
        m.insert("split", split);
        m.insert("range", range);
        m.insert("sum", sum);
        m.insert("min", min);
        m.insert("max", max);
        m.insert("abs", abs);
        m.insert("round", round);
        m.insert("push", push);
        m.insert("contains", contains);
        m.insert("type_of", type_of);
        m.insert("error", error);
        m.insert("read_file", read_file);
        m.insert("env", env);
        m.insert("sleep", sleep);
        m.insert("code", code);
        m.insert("table", table);
        m.insert("image", image);
        m.insert("svg", svg);
        m.insert("captioned", captioned);
        m
    };
}

pub fn lookup(name: &str) -> Option<Builtin> {
    BUILTINS.get(name).copied()
}

pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.keys().copied()
}

fn check_arity(name: &str, args: &[Value], expected: RangeInclusive<usize>) -> EvalResult<()> {
    if expected.contains(&args.len()) {
        return Ok(());
    }
    let expected = if expected.start() == expected.end() {
        expected.start().to_string()
    } else {
        format!("{} to {}", expected.start(), expected.end())
    };
    Err(EvalError::Arity {
        name: name.to_string(),
        expected,
        found: args.len(),
    })
}

fn expect_string(name: &str, value: Value) -> EvalResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EvalError::type_mismatch(format!(
            "`{}` expects a string, found {}",
            name,
            other.kind()
        ))),
    }
}

fn expect_list(name: &str, value: Value) -> EvalResult<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(EvalError::type_mismatch(format!(
            "`{}` expects a list, found {}",
            name,
            other.kind()
        ))),
    }
}

fn expect_integer(name: &str, value: Value) -> EvalResult<i64> {
    match value {
        Value::Integer(n) => Ok(n),
        other => Err(EvalError::type_mismatch(format!(
            "`{}` expects an integer, found {}",
            name,
            other.kind()
        ))),
    }
}

fn optional_string(name: &str, value: Option<Value>) -> EvalResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => expect_string(name, value).map(Some),
    }
}

/// A single list argument, or the arguments themselves.
fn spread(args: Vec<Value>) -> Vec<Value> {
    match <[Value; 1]>::try_from(args) {
        Ok([Value::List(items)]) => items,
        Ok([single]) => vec![single],
        Err(args) => args,
    }
}

fn len(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("len", &args, 1..=1)?;
    let n = match &args[0] {
        Value::List(items) => items.len(),
        Value::String(s) => s.chars().count(),
        Value::Table { rows, .. } => rows.len(),
        other => {
            return Err(EvalError::type_mismatch(format!(
                "`len` expects a list, string or table, found {}",
                other.kind()
            )));
        }
    };
    Ok(Value::Integer(n as i64))
}

fn to_str(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("str", &args, 1..=1)?;
    Ok(Value::String(args[0].to_string()))
}

fn string_map(name: &str, args: Vec<Value>, f: impl Fn(&str) -> String) -> EvalResult<Value> {
    check_arity(name, &args, 1..=1)?;
    let mut args = args.into_iter();
    let s = expect_string(name, args.next().unwrap_or(Value::Null))?;
    Ok(Value::String(f(&s)))
}

fn upper(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    string_map("upper", args, str::to_uppercase)
}

fn lower(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    string_map("lower", args, str::to_lowercase)
}

fn trim(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    string_map("trim", args, |s| s.trim().to_string())
}

fn join(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("join", &args, 1..=2)?;
    let mut args = args.into_iter();
    let items = expect_list("join", args.next().unwrap_or(Value::Null))?;
    let separator = optional_string("join", args.next())?.unwrap_or_default();
    let parts: Vec<String> = items.iter().map(Value::to_string).collect();
    Ok(Value::String(parts.join(&separator)))
}

fn split(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("split", &args, 1..=2)?;
    let mut args = args.into_iter();
    let s = expect_string("split", args.next().unwrap_or(Value::Null))?;
    let parts: Vec<Value> = match optional_string("split", args.next())? {
        Some(separator) if !separator.is_empty() => {
            s.split(separator.as_str()).map(Value::from).collect()
        }
        _ => s.split_whitespace().map(Value::from).collect(),
    };
    Ok(Value::List(parts))
}

fn range(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("range", &args, 1..=2)?;
    let mut args = args.into_iter();
    let first = expect_integer("range", args.next().unwrap_or(Value::Null))?;
    let (start, end) = match args.next() {
        Some(second) => (first, expect_integer("range", second)?),
        None => (0, first),
    };
    Ok(Value::List((start..end).map(Value::Integer).collect()))
}

fn sum(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    spread(args)
        .into_iter()
        .try_fold(Value::Integer(0), |acc, item| {
            eval_binary(BinaryOperator::Add, acc, item)
        })
}

fn extremum(name: &str, args: Vec<Value>, keep: std::cmp::Ordering) -> EvalResult<Value> {
    let mut items = spread(args).into_iter();
    let mut best = items.next().ok_or_else(|| {
        EvalError::type_mismatch(format!("`{}` of an empty list", name))
    })?;
    for item in items {
        let ordering = compare(&item, &best).ok_or_else(|| {
            EvalError::type_mismatch(format!(
                "`{}` cannot compare {} and {}",
                name,
                item.kind(),
                best.kind()
            ))
        })?;
        if ordering == keep {
            best = item;
        }
    }
    Ok(best)
}

fn min(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    extremum("min", args, std::cmp::Ordering::Less)
}

fn max(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    extremum("max", args, std::cmp::Ordering::Greater)
}

fn abs(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("abs", &args, 1..=1)?;
    match &args[0] {
        Value::Integer(n) => n.checked_abs().map(Value::Integer).ok_or(EvalError::Overflow),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        other => Err(EvalError::type_mismatch(format!(
            "`abs` expects a number, found {}",
            other.kind()
        ))),
    }
}

/// `round(x)` gives an integer, `round(x, digits)` a float with that many decimals.
fn round(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("round", &args, 1..=2)?;
    let mut args = args.into_iter();
    let value = args.next().unwrap_or(Value::Null);
    let x = value.as_f64().ok_or_else(|| {
        EvalError::type_mismatch(format!("`round` expects a number, found {}", value.kind()))
    })?;
    match args.next() {
        None => {
            let rounded = x.round();
            if rounded.is_finite() && rounded.abs() < i64::MAX as f64 {
                Ok(Value::Integer(rounded as i64))
            } else {
                Err(EvalError::Overflow)
            }
        }
        Some(digits) => {
            let digits = expect_integer("round", digits)?.clamp(0, 15) as i32;
            let factor = 10f64.powi(digits);
            Ok(Value::Float((x * factor).round() / factor))
        }
    }
}

fn push(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("push", &args, 2..=2)?;
    let mut args = args.into_iter();
    let mut items = expect_list("push", args.next().unwrap_or(Value::Null))?;
    items.extend(args);
    Ok(Value::List(items))
}

fn contains(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("contains", &args, 2..=2)?;
    let found = match (&args[0], &args[1]) {
        (Value::List(items), needle) => items.iter().any(|item| values_equal(item, needle)),
        (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
        (container, needle) => {
            return Err(EvalError::type_mismatch(format!(
                "`contains` cannot search {} in {}",
                needle.kind(),
                container.kind()
            )));
        }
    };
    Ok(Value::Boolean(found))
}

fn type_of(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("type_of", &args, 1..=1)?;
    Ok(Value::String(args[0].kind().to_string()))
}

fn error(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("error", &args, 1..=1)?;
    Err(EvalError::Raised(args[0].to_string()))
}

fn read_file(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("read_file", &args, 1..=1)?;
    let mut args = args.into_iter();
    let path = expect_string("read_file", args.next().unwrap_or(Value::Null))?;
    let text = std::fs::read_to_string(&path)
        .map_err(|e| EvalError::Io(format!("{}: {}", path, e)))?;
    Ok(Value::String(text))
}

fn env(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("env", &args, 1..=1)?;
    let mut args = args.into_iter();
    let name = expect_string("env", args.next().unwrap_or(Value::Null))?;
    Ok(std::env::var(&name).map(Value::String).unwrap_or(Value::Null))
}

/// Blocks for the given number of milliseconds, waking up regularly to honor interrupts.
fn sleep(ctx: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("sleep", &args, 1..=1)?;
    let millis = match &args[0] {
        Value::Integer(n) if *n >= 0 => *n as u64,
        Value::Float(x) if *x >= 0.0 => *x as u64,
        other => {
            return Err(EvalError::type_mismatch(format!(
                "`sleep` expects a non-negative number, found {}",
                other
            )));
        }
    };
    let deadline = Instant::now() + Duration::from_millis(millis);
    loop {
        ctx.check_interrupt()?;
        let now = Instant::now();
        if now >= deadline {
            return Ok(Value::Unit);
        }
        std::thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

fn code(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("code", &args, 2..=2)?;
    let mut args = args.into_iter();
    let lang = expect_string("code", args.next().unwrap_or(Value::Null))?;
    let text = match args.next().unwrap_or(Value::Null) {
        Value::String(s) => s,
        other => other.to_string(),
    };
    Ok(Value::Code { lang, text })
}

fn table(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("table", &args, 2..=2)?;
    let mut args = args.into_iter();
    let headers: Vec<String> = expect_list("table", args.next().unwrap_or(Value::Null))?
        .iter()
        .map(Value::to_string)
        .collect();
    let rows = expect_list("table", args.next().unwrap_or(Value::Null))?
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let cells = expect_list("table", row)?;
            if cells.len() != headers.len() {
                return Err(EvalError::type_mismatch(format!(
                    "table row {} has {} cells, expected {}",
                    i + 1,
                    cells.len(),
                    headers.len()
                )));
            }
            Ok(cells)
        })
        .collect::<EvalResult<Vec<_>>>()?;
    Ok(Value::Table { headers, rows })
}

fn image(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("image", &args, 1..=2)?;
    let mut args = args.into_iter();
    let path = expect_string("image", args.next().unwrap_or(Value::Null))?;
    let caption = optional_string("image", args.next())?;
    Ok(Value::Image { path, caption })
}

fn svg(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("svg", &args, 1..=2)?;
    let mut args = args.into_iter();
    let markup = expect_string("svg", args.next().unwrap_or(Value::Null))?;
    let caption = optional_string("svg", args.next())?;
    Ok(Value::Svg { markup, caption })
}

fn captioned(_: &mut ExecutionContext, args: Vec<Value>) -> EvalResult<Value> {
    check_arity("captioned", &args, 2..=3)?;
    let mut args = args.into_iter();
    let value = args.next().unwrap_or(Value::Null);
    let caption = expect_string("captioned", args.next().unwrap_or(Value::Null))?;
    let label = optional_string("captioned", args.next())?;
    Ok(Value::Captioned {
        value: Box::new(value),
        caption,
        label,
    })
}
