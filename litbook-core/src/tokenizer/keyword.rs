//! # Keywords
//!
//! Reserved words of the `lit` language. Keywords are recognized by the
//! identifier parser: an identifier whose text converts into a [`Keyword`]
//! through `strum::EnumString` becomes a keyword token, so `format` stays an
//! identifier while `for` does not.

/// Reserved words recognized by the `lit` language.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    /// Introduces a new binding in the innermost scope.
    Let,
    /// Defines a named function.
    Fn,
    /// Conditional execution.
    If,
    /// Alternative branch of an `if`.
    Else,
    /// Iteration over a list or string.
    For,
    /// Separates the loop variable from the iterable in a `for`.
    In,
    /// Conditional loop.
    While,
    /// Leaves the current function with a value.
    Return,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_keyword_round_trip_through_strings() {
        for keyword in Keyword::iter() {
            let text = keyword.to_string();
            assert_eq!(Keyword::from_str(&text).unwrap(), keyword);
        }
    }

    #[test]
    fn test_non_keywords_are_rejected() {
        assert!(Keyword::from_str("format").is_err());
        assert!(Keyword::from_str("Let").is_err());
    }
}
