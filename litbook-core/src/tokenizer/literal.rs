use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1},
    combinator::{map, map_res, recognize, value},
    error::context,
    multi::many0,
    sequence::{delimited, preceded, tuple},
};

use super::token::{ParserResult, Token};

#[derive(Debug, Clone, PartialEq)]
pub enum StringPart {
    Literal(String),
    Interpolation(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(Vec<StringPart>),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(parts) => {
                write!(f, "\"")?;
                for part in parts {
                    match part {
                        StringPart::Literal(s) => write!(f, "{}", s)?,
                        StringPart::Interpolation(name) => write!(f, "${{{}}}", name)?,
                    }
                }
                write!(f, "\"")
            }
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => write!(f, "null"),
        }
    }
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_interpolation(input: &str) -> ParserResult<StringPart> {
    context(
        "string interpolation",
        map(
            delimited(
                tag("${"),
                take_while1(|c: char| c.is_alphanumeric() || c == '_'),
                tag("}"),
            ),
            |ident: &str| StringPart::Interpolation(ident.to_string()),
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_escape(input: &str) -> ParserResult<StringPart> {
    context(
        "escape sequence",
        map(
            preceded(
                char('\\'),
                alt((
                    value("\n", char('n')),
                    value("\t", char('t')),
                    value("\"", char('"')),
                    value("\\", char('\\')),
                    value("$", char('$')),
                )),
            ),
            |s: &str| StringPart::Literal(s.to_string()),
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_string_literal_part(input: &str) -> ParserResult<StringPart> {
    context(
        "string literal part",
        map(
            take_while1(|c| c != '$' && c != '"' && c != '\\'),
            |content: &str| StringPart::Literal(content.to_string()),
        ),
    )(input)
}

// A `$` that does not open an interpolation is plain text.
fn parse_lone_dollar(input: &str) -> ParserResult<StringPart> {
    map(char('$'), |_| StringPart::Literal("$".to_string()))(input)
}

fn merge_parts(parts: Vec<StringPart>) -> Vec<StringPart> {
    let mut merged: Vec<StringPart> = Vec::with_capacity(parts.len());
    for part in parts {
        if let (Some(StringPart::Literal(prev)), StringPart::Literal(next)) =
            (merged.last_mut(), &part)
        {
            prev.push_str(next);
            continue;
        }
        merged.push(part);
    }
    merged
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_string_literal(input: &str) -> ParserResult<Literal> {
    context(
        "string literal",
        map(
            delimited(
                char('"'),
                many0(alt((
                    parse_interpolation,
                    parse_escape,
                    parse_string_literal_part,
                    parse_lone_dollar,
                ))),
                char('"'),
            ),
            |parts| Literal::String(merge_parts(parts)),
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_float_literal(input: &str) -> ParserResult<Literal> {
    context(
        "float literal",
        map_res(
            recognize(tuple((digit1, char('.'), digit1))),
            |s: &str| s.parse::<f64>().map(Literal::Float),
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
fn parse_integer_literal(input: &str) -> ParserResult<Literal> {
    context(
        "integer literal",
        map_res(digit1, |s: &str| s.parse::<i64>().map(Literal::Integer)),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_literal(input: &str) -> ParserResult<Token> {
    context(
        "literal",
        map(
            alt((
                parse_string_literal,
                parse_float_literal,
                parse_integer_literal,
            )),
            Token::Literal,
        ),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_string() {
        let (rest, result) = parse_string_literal("\"hello world\"").unwrap();
        assert_eq!(rest, "");
        assert_eq!(
            result,
            Literal::String(vec![StringPart::Literal("hello world".to_string())])
        );
    }

    #[test]
    fn test_string_with_interpolation() {
        let (rest, result) = parse_string_literal("\"hello ${name}!\"").unwrap();
        assert_eq!(rest, "");
        assert_eq!(
            result,
            Literal::String(vec![
                StringPart::Literal("hello ".to_string()),
                StringPart::Interpolation("name".to_string()),
                StringPart::Literal("!".to_string()),
            ])
        );
    }

    #[test]
    fn test_escapes_and_lone_dollar_merge_into_one_part() {
        let (rest, result) = parse_string_literal(r#""costs $5\n\"ok\"""#).unwrap();
        assert_eq!(rest, "");
        assert_eq!(
            result,
            Literal::String(vec![StringPart::Literal("costs $5\n\"ok\"".to_string())])
        );
    }

    #[test]
    fn test_multiline_string_keeps_newlines() {
        let (_, result) = parse_string_literal("\"line one\nline two\"").unwrap();
        assert_eq!(
            result,
            Literal::String(vec![StringPart::Literal("line one\nline two".to_string())])
        );
    }

    #[test]
    fn test_unknown_escape_is_an_error() {
        assert!(parse_string_literal(r#""bad \q""#).is_err());
    }

    #[test]
    fn test_number_literals() {
        let (rest, result) = parse_integer_literal("123").unwrap();
        assert_eq!(result, Literal::Integer(123));
        assert_eq!(rest, "");

        let (rest, result) = parse_float_literal("123.45").unwrap();
        assert_eq!(result, Literal::Float(123.45));
        assert_eq!(rest, "");

        // Negation belongs to the parser, not the tokenizer.
        assert!(parse_integer_literal("-1").is_err());
    }

    #[test]
    fn test_integer_overflow_is_rejected() {
        assert!(parse_integer_literal("99999999999999999999").is_err());
    }
}
