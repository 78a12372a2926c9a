use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    combinator::map,
    error::context,
};

use super::token::{ParserResult, Token};

/// Parses a run of spaces and tabs, preserving it verbatim.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_whitespace(input: &str) -> ParserResult<Token> {
    context(
        "whitespace expected",
        map(take_while1(|c| c == ' ' || c == '\t'), |ws: &str| {
            Token::Whitespace(ws.to_string())
        }),
    )(input)
}

/// Parses a Unix (`\n`) or Windows (`\r\n`) line break.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_newline(input: &str) -> ParserResult<Token> {
    context(
        "newline expected",
        map(alt((tag("\r\n"), tag("\n"))), |_| Token::Newline),
    )(input)
}
