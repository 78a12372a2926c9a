use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    combinator::recognize,
    error::{context, VerboseError},
    sequence::pair,
    IResult,
};
use thiserror::Error;

use super::{
    comment::parse_comment,
    keyword::Keyword,
    literal::{parse_literal, Literal},
    symbol::{parse_delimiter, parse_operator, Delimiter, Operator},
    whitespace::{parse_newline, parse_whitespace},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    Identifier(String),
    Operator(Operator),
    Delimiter(Delimiter),
    Literal(Literal),
    // Formatting
    Whitespace(String),
    Newline,
    Comment(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(keyword) => write!(f, "{}", keyword),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Operator(op) => write!(f, "{}", op),
            Token::Delimiter(delimiter) => write!(f, "{}", delimiter),
            Token::Literal(literal) => write!(f, "{}", literal),
            Token::Whitespace(ws) => write!(f, "{}", ws),
            Token::Newline => writeln!(f),
            Token::Comment(content) => write!(f, "// {}", content),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    current_position: usize,
    current_line: usize,
    current_column: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            current_position: 0,
            current_line: 1,   // 1-based
            current_column: 1, // 1-based
        }
    }

    #[tracing::instrument(level = "debug", skip(self, input))]
    pub fn tokenize(&mut self, input: &str) -> TokenizerResult<Vec<TokenSpan>> {
        let mut tokens = Vec::new();
        let mut remaining = input;

        while !remaining.is_empty() {
            let start_position = self.current_position;
            let start_line = self.current_line;
            let start_column = self.current_column;

            let result = alt((
                // Formatting
                parse_whitespace,
                parse_newline,
                parse_comment,
                // Code elements
                parse_literal,
                parse_operator,
                parse_delimiter,
                parse_identifier,
            ))(remaining);

            match result {
                Ok((new_remaining, token)) => {
                    let consumed = &remaining[..(remaining.len() - new_remaining.len())];
                    self.update_position(consumed);

                    tokens.push(TokenSpan {
                        token,
                        start: start_position,
                        end: self.current_position,
                        line: start_line,
                        column: start_column,
                    });

                    remaining = new_remaining;
                }
                Err(e) => {
                    let found = remaining.chars().take(20).collect::<String>();
                    let span = Span {
                        start: self.current_position,
                        end: self.current_position + 1,
                        line: self.current_line,
                        column: self.current_column,
                    };
                    let error = match e {
                        nom::Err::Incomplete(e) => TokenizerError::ParseError {
                            message: format!("Incomplete input, {:?}", e),
                            found,
                            span,
                        },
                        nom::Err::Error(e) | nom::Err::Failure(e) => TokenizerError::ParseError {
                            message: nom::error::convert_error(remaining, e),
                            found,
                            span,
                        },
                    };
                    tracing::debug!("{}", error);
                    return Err(error);
                }
            }
        }

        Ok(tokens)
    }

    fn update_position(&mut self, text: &str) {
        for c in text.chars() {
            self.current_position += c.len_utf8();
            if c == '\n' {
                self.current_line += 1;
                self.current_column = 1;
            } else {
                self.current_column += 1;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpan {
    pub token: Token,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl TokenSpan {
    pub fn span(&self) -> Span {
        Span {
            start: self.start,
            end: self.end,
            line: self.line,
            column: self.column,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Parses an identifier, turning reserved words into keywords and
/// `true`/`false`/`null` into literals.
#[tracing::instrument(level = "debug", skip(input))]
fn parse_identifier(input: &str) -> ParserResult<Token> {
    let (input, id) = context(
        "identifier",
        recognize(pair(
            take_while1(|c: char| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        )),
    )(input)?;

    let token = match id {
        "true" => Token::Literal(Literal::Boolean(true)),
        "false" => Token::Literal(Literal::Boolean(false)),
        "null" => Token::Literal(Literal::Null),
        _ => match Keyword::from_str(id) {
            Ok(kw) => Token::Keyword(kw),
            Err(_) => Token::Identifier(id.to_string()),
        },
    };

    Ok((input, token))
}

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

pub type TokenizerResult<T> = Result<T, TokenizerError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenizerError {
    #[error("cannot read `{found}` at {span}")]
    ParseError {
        message: String,
        found: String,
        span: Span,
    },
}
