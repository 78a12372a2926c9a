//! # Symbols
//!
//! Operators and delimiters of the `lit` language.
//!
//! Symbols are matched longest first so that `==` is never read as two `=`
//! delimiters and `!=` is never read as `!` followed by `=`.

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::tag,
    combinator::{map, value},
    error::context,
};

use super::token::{ParserResult, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    EqualEqual,
    NotEqual,
    GreaterEqual,
    LessEqual,
    Greater,
    Less,
    And,
    Or,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Not,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::EqualEqual => "==",
            Operator::NotEqual => "!=",
            Operator::GreaterEqual => ">=",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
            Operator::Not => "!",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Display is written by hand: braces do not survive strum's derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Comma,
    Semicolon,
    Equal,
}

impl Delimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Delimiter::OpenParen => "(",
            Delimiter::CloseParen => ")",
            Delimiter::OpenBracket => "[",
            Delimiter::CloseBracket => "]",
            Delimiter::OpenBrace => "{",
            Delimiter::CloseBrace => "}",
            Delimiter::Comma => ",",
            Delimiter::Semicolon => ";",
            Delimiter::Equal => "=",
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_operator(input: &str) -> ParserResult<Token> {
    context(
        "operator",
        map(
            alt((
                value(Operator::EqualEqual, tag("==")),
                value(Operator::NotEqual, tag("!=")),
                value(Operator::GreaterEqual, tag(">=")),
                value(Operator::LessEqual, tag("<=")),
                value(Operator::And, tag("&&")),
                value(Operator::Or, tag("||")),
                value(Operator::Greater, tag(">")),
                value(Operator::Less, tag("<")),
                value(Operator::Plus, tag("+")),
                value(Operator::Minus, tag("-")),
                value(Operator::Multiply, tag("*")),
                value(Operator::Divide, tag("/")),
                value(Operator::Modulo, tag("%")),
                value(Operator::Not, tag("!")),
            )),
            Token::Operator,
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_delimiter(input: &str) -> ParserResult<Token> {
    context(
        "delimiter",
        map(
            alt((
                value(Delimiter::OpenParen, tag("(")),
                value(Delimiter::CloseParen, tag(")")),
                value(Delimiter::OpenBracket, tag("[")),
                value(Delimiter::CloseBracket, tag("]")),
                value(Delimiter::OpenBrace, tag("{")),
                value(Delimiter::CloseBrace, tag("}")),
                value(Delimiter::Comma, tag(",")),
                value(Delimiter::Semicolon, tag(";")),
                value(Delimiter::Equal, tag("=")),
            )),
            Token::Delimiter,
        ),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_operator_wins() {
        let (rest, token) = parse_operator("== 1").unwrap();
        assert_eq!(token, Token::Operator(Operator::EqualEqual));
        assert_eq!(rest, " 1");

        let (_, token) = parse_operator("!=").unwrap();
        assert_eq!(token, Token::Operator(Operator::NotEqual));

        let (rest, token) = parse_operator("!x").unwrap();
        assert_eq!(token, Token::Operator(Operator::Not));
        assert_eq!(rest, "x");
    }

    #[test]
    fn test_single_equal_is_a_delimiter() {
        assert!(parse_operator("= 1").is_err());
        let (_, token) = parse_delimiter("= 1").unwrap();
        assert_eq!(token, Token::Delimiter(Delimiter::Equal));
    }

    #[test]
    fn test_display_matches_source_text() {
        assert_eq!(Delimiter::CloseBrace.to_string(), "}");
        assert_eq!(Operator::Modulo.to_string(), "%");
    }
}
