use nom::{
    bytes::complete::tag, character::complete::not_line_ending, combinator::map, error::context,
    sequence::preceded,
};

use super::token::{ParserResult, Token};

/// Parses a `//` comment up to (not including) the line break.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_comment(input: &str) -> ParserResult<Token> {
    context(
        "line comment",
        map(preceded(tag("//"), not_line_ending), |content: &str| {
            Token::Comment(content.trim().to_string())
        }),
    )(input)
}
