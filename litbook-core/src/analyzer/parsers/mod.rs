//! Grammar of the `lit` language, built from the combinators.
//!
//! The helpers here match single tokens; [`expression`] and [`statement`]
//! build the precedence levels and statement forms on top of them.

use super::{core::Parser, prelude::*};
use crate::tokenizer::{
    keyword::Keyword,
    symbol::{Delimiter, Operator},
    token::Token,
};

pub mod expression;
pub mod statement;

pub fn parse_identifier() -> impl Parser<Token, String> {
    satisfy(
        |token: &Token| match token {
            Token::Identifier(name) => Some(name.clone()),
            _ => None,
        },
        "identifier",
    )
}

pub fn keyword(keyword: Keyword) -> impl Parser<Token, ()> {
    as_unit(equal(Token::Keyword(keyword)))
}

pub fn delimiter(delimiter: Delimiter) -> impl Parser<Token, ()> {
    as_unit(equal(Token::Delimiter(delimiter)))
}

pub fn operator(operator: Operator) -> impl Parser<Token, ()> {
    as_unit(equal(Token::Operator(operator)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        let input = vec![Token::Identifier("total".to_string())];
        assert_eq!(
            parse_identifier().parse(&input, 0),
            Ok((1, "total".to_string()))
        );

        let input = vec![Token::Keyword(Keyword::Let)];
        assert!(parse_identifier().parse(&input, 0).is_err());
    }

    #[test]
    fn test_token_helpers() {
        let input = vec![
            Token::Keyword(Keyword::Fn),
            Token::Delimiter(Delimiter::OpenParen),
            Token::Operator(Operator::Plus),
        ];
        assert_eq!(keyword(Keyword::Fn).parse(&input, 0), Ok((1, ())));
        assert_eq!(delimiter(Delimiter::OpenParen).parse(&input, 1), Ok((2, ())));
        assert_eq!(operator(Operator::Plus).parse(&input, 2), Ok((3, ())));
        assert!(operator(Operator::Minus).parse(&input, 2).is_err());
    }
}
