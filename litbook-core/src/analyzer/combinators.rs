//! # Parser Combinators
//!
//! Building blocks of the parsing system. These combinators allow simple
//! parsers to be composed into the grammar in [`super::parsers`].
//!
//! ## Combinator Types
//!
//! * **Basic Combinators**: `Equal`, `Satisfy`
//! * **Sequential Combinators**: `Tuple2`, `Tuple3`, `Preceded`, `Delimited`
//! * **Alternative Combinators**: `Choice`
//! * **Repetition Combinators**: `Many`, `SeparatedList`
//! * **Transformation Combinators**: `Map`, `AsUnit`, `Optional`
//! * **Error Handling Combinators**: `WithContext`
//! * **Recursion**: `Lazy`

use super::core::ParseError;
use super::core::ParseResult;
use super::core::Parser;
use std::fmt;
use std::marker::PhantomData;

/// Equal: Matches a specific value in the input
///
/// Consumes one token on success.
#[derive(Clone)]
pub struct Equal<I> {
    value: I,
}

impl<I> Equal<I> {
    pub fn new(value: I) -> Self {
        Self { value }
    }
}

impl<I: Clone + PartialEq + fmt::Display> Parser<I, I> for Equal<I> {
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<I> {
        match input.get(pos) {
            Some(found) if *found == self.value => Ok((pos + 1, found.clone())),
            Some(found) => Err(ParseError::Unexpected {
                expected: format!("`{}`", self.value),
                found: format!("`{}`", found),
                position: pos,
            }),
            None => Err(ParseError::EOF { position: pos }),
        }
    }
}

/// Satisfy: Consumes one token when the function maps it to `Some`.
#[derive(Clone)]
pub struct Satisfy<I, O, F> {
    f: F,
    expected: &'static str,
    _phantom: PhantomData<(I, O)>,
}

impl<I, O, F> Satisfy<I, O, F> {
    pub fn new(f: F, expected: &'static str) -> Self {
        Self {
            f,
            expected,
            _phantom: PhantomData,
        }
    }
}

impl<I, O, F> Parser<I, O> for Satisfy<I, O, F>
where
    I: fmt::Display,
    F: Fn(&I) -> Option<O>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O> {
        match input.get(pos) {
            Some(token) => match (self.f)(token) {
                Some(result) => Ok((pos + 1, result)),
                None => Err(ParseError::Unexpected {
                    expected: self.expected.to_string(),
                    found: format!("`{}`", token),
                    position: pos,
                }),
            },
            None => Err(ParseError::EOF { position: pos }),
        }
    }
}

/// Choice: Tries multiple parsers and succeeds with the first successful one
///
/// When every alternative fails, the error that got furthest into the input
/// is returned, since it is the most informative one.
pub struct Choice<I, O> {
    parsers: Vec<Box<dyn Parser<I, O>>>,
}

impl<I, O> Choice<I, O> {
    pub fn new(parsers: Vec<Box<dyn Parser<I, O>>>) -> Self {
        Self { parsers }
    }
}

impl<I, O> Parser<I, O> for Choice<I, O> {
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O> {
        let mut deepest: Option<ParseError> = None;
        for parser in &self.parsers {
            match parser.parse(input, pos) {
                Ok(result) => return Ok(result),
                Err(e) => {
                    let further = deepest
                        .as_ref()
                        .map_or(true, |d| e.get_position() > d.get_position());
                    if further {
                        deepest = Some(e);
                    }
                }
            }
        }
        match deepest {
            Some(e) if e.get_position() > pos => Err(e),
            _ if pos >= input.len() => Err(ParseError::EOF { position: pos }),
            _ => Err(ParseError::NoAlternative { position: pos }),
        }
    }
}

#[derive(Clone)]
pub struct Preceded<P1, P2, I, O> {
    parser1: P1,
    parser2: P2,
    _phantom: PhantomData<(I, O)>,
}

impl<P1, P2, I, O> Preceded<P1, P2, I, O> {
    pub fn new(parser1: P1, parser2: P2) -> Self {
        Self {
            parser1,
            parser2,
            _phantom: PhantomData,
        }
    }
}

impl<P1, P2, I, O> Parser<I, O> for Preceded<P1, P2, I, O>
where
    P1: Parser<I, ()>,
    P2: Parser<I, O>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O> {
        let (pos, _) = self.parser1.parse(input, pos)?;
        self.parser2.parse(input, pos)
    }
}

/// Map: Transforms the output of a parser using a function
#[derive(Clone)]
pub struct Map<P, F, A, B> {
    parser: P,
    f: F,
    _phantom: PhantomData<(A, B)>,
}

impl<P, F, A, B> Map<P, F, A, B> {
    pub fn new(parser: P, f: F) -> Self {
        Self {
            parser,
            f,
            _phantom: PhantomData,
        }
    }
}

impl<I, A, B, P, F> Parser<I, B> for Map<P, F, A, B>
where
    P: Parser<I, A>,
    F: Fn(A) -> B,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<B> {
        self.parser
            .parse(input, pos)
            .map(|(pos, value)| (pos, (self.f)(value)))
    }
}

#[derive(Clone)]
pub struct AsUnit<P, O> {
    parser: P,
    _phantom: PhantomData<O>,
}

impl<P, O> AsUnit<P, O> {
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            _phantom: PhantomData,
        }
    }
}

impl<I, P, O> Parser<I, ()> for AsUnit<P, O>
where
    P: Parser<I, O>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<()> {
        self.parser.parse(input, pos).map(|(pos, _)| (pos, ()))
    }
}

/// Many: Applies a parser zero or more times
///
/// Always succeeds, even if the inner parser never does.
#[derive(Clone)]
pub struct Many<P, I, O> {
    parser: P,
    _phantom: PhantomData<(I, O)>,
}

impl<P, I, O> Many<P, I, O> {
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            _phantom: PhantomData,
        }
    }
}

impl<I, O, P> Parser<I, Vec<O>> for Many<P, I, O>
where
    P: Parser<I, O>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<Vec<O>> {
        let mut results = Vec::new();
        let mut current_pos = pos;

        loop {
            match self.parser.parse(input, current_pos) {
                Ok((new_pos, value)) if new_pos > current_pos => {
                    results.push(value);
                    current_pos = new_pos;
                }
                Ok(_) => break,
                Err(e) => {
                    tracing::trace!(
                        target: "parser::many",
                        error = %e,
                        position = current_pos,
                        items_collected = results.len(),
                        "Many parser stopped collection"
                    );
                    break;
                }
            }
        }

        Ok((current_pos, results))
    }
}

/// SeparatedList: Parses a list of items separated by a delimiter
///
/// Handles empty lists, single items and a trailing separator.
pub struct SeparatedList<P, S, I, O> {
    item_parser: P,
    separator_parser: S,
    _phantom: PhantomData<(I, O)>,
}

impl<P, S, I, O> SeparatedList<P, S, I, O> {
    pub fn new(item_parser: P, separator_parser: S) -> Self {
        Self {
            item_parser,
            separator_parser,
            _phantom: PhantomData,
        }
    }
}

impl<I, O, P, S> Parser<I, Vec<O>> for SeparatedList<P, S, I, O>
where
    P: Parser<I, O>,
    S: Parser<I, ()>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<Vec<O>> {
        let mut results = Vec::new();
        let mut current_pos = pos;

        if let Ok((new_pos, value)) = self.item_parser.parse(input, current_pos) {
            results.push(value);
            current_pos = new_pos;

            while let Ok((sep_pos, _)) = self.separator_parser.parse(input, current_pos) {
                current_pos = sep_pos;
                match self.item_parser.parse(input, current_pos) {
                    Ok((new_pos, value)) => {
                        results.push(value);
                        current_pos = new_pos;
                    }
                    Err(_) => break,
                }
            }
        }

        Ok((current_pos, results))
    }
}

#[derive(Clone)]
pub struct Optional<P, I, O> {
    parser: P,
    _phantom: PhantomData<(I, O)>,
}

impl<P, I, O> Optional<P, I, O> {
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            _phantom: PhantomData,
        }
    }
}

impl<I, O, P> Parser<I, Option<O>> for Optional<P, I, O>
where
    P: Parser<I, O>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<Option<O>> {
        match self.parser.parse(input, pos) {
            Ok((new_pos, value)) => Ok((new_pos, Some(value))),
            Err(_) => Ok((pos, None)),
        }
    }
}

#[derive(Clone)]
pub struct Tuple2<P1, P2, I, O1, O2> {
    parser1: P1,
    parser2: P2,
    _phantom: PhantomData<(I, O1, O2)>,
}

impl<P1, P2, I, O1, O2> Tuple2<P1, P2, I, O1, O2> {
    pub fn new(parser1: P1, parser2: P2) -> Self {
        Self {
            parser1,
            parser2,
            _phantom: PhantomData,
        }
    }
}

impl<P1, P2, I, O1, O2> Parser<I, (O1, O2)> for Tuple2<P1, P2, I, O1, O2>
where
    P1: Parser<I, O1>,
    P2: Parser<I, O2>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<(O1, O2)> {
        let (pos, result1) = self.parser1.parse(input, pos)?;
        let (pos, result2) = self.parser2.parse(input, pos)?;
        Ok((pos, (result1, result2)))
    }
}

#[derive(Clone)]
pub struct Tuple3<P1, P2, P3, I, O1, O2, O3> {
    parser1: P1,
    parser2: P2,
    parser3: P3,
    _phantom: PhantomData<(I, O1, O2, O3)>,
}

impl<P1, P2, P3, I, O1, O2, O3> Tuple3<P1, P2, P3, I, O1, O2, O3> {
    pub fn new(parser1: P1, parser2: P2, parser3: P3) -> Self {
        Self {
            parser1,
            parser2,
            parser3,
            _phantom: PhantomData,
        }
    }
}

impl<P1, P2, P3, I, O1, O2, O3> Parser<I, (O1, O2, O3)> for Tuple3<P1, P2, P3, I, O1, O2, O3>
where
    P1: Parser<I, O1>,
    P2: Parser<I, O2>,
    P3: Parser<I, O3>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<(O1, O2, O3)> {
        let (pos, result1) = self.parser1.parse(input, pos)?;
        let (pos, result2) = self.parser2.parse(input, pos)?;
        let (pos, result3) = self.parser3.parse(input, pos)?;
        Ok((pos, (result1, result2, result3)))
    }
}

/// Delimited: Parses content between left and right delimiters
#[derive(Clone)]
pub struct Delimited<L, P, R, I, O> {
    left: L,
    parser: P,
    right: R,
    _phantom: PhantomData<(I, O)>,
}

impl<L, P, R, I, O> Delimited<L, P, R, I, O> {
    pub fn new(left: L, parser: P, right: R) -> Self {
        Self {
            left,
            parser,
            right,
            _phantom: PhantomData,
        }
    }
}

impl<I, O, L, P, R> Parser<I, O> for Delimited<L, P, R, I, O>
where
    L: Parser<I, ()>,
    P: Parser<I, O>,
    R: Parser<I, ()>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O> {
        let (pos, _) = self.left.parse(input, pos)?;
        let (pos, value) = self.parser.parse(input, pos)?;
        let (pos, _) = self.right.parse(input, pos)?;
        Ok((pos, value))
    }
}

#[derive(Clone)]
pub struct WithContext<P, C> {
    parser: P,
    context: C,
}

impl<P, C> WithContext<P, C> {
    pub fn new(parser: P, context: C) -> Self {
        Self { parser, context }
    }
}

impl<I, O, P, C: ToString> Parser<I, O> for WithContext<P, C>
where
    P: Parser<I, O>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O> {
        self.parser
            .parse(input, pos)
            .map_err(|e| e.with_context(&self.context.to_string()))
    }
}

/// Lazy: Builds the inner parser on demand, which makes recursive grammars possible.
#[derive(Clone)]
pub struct Lazy<F> {
    f: F,
}

impl<F> Lazy<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<I, O, F, P> Parser<I, O> for Lazy<F>
where
    F: Fn() -> P,
    P: Parser<I, O>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O> {
        (self.f)().parse(input, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digit(expected: i32) -> Satisfy<i32, i32, impl Fn(&i32) -> Option<i32> + Clone> {
        Satisfy::new(
            move |x: &i32| if *x == expected { Some(*x) } else { None },
            "digit",
        )
    }

    #[test]
    fn test_equal() {
        let input = vec!['a', 'b'];
        assert_eq!(Equal::new('a').parse(&input, 0), Ok((1, 'a')));
        assert_eq!(
            Equal::new('a').parse(&input, 1),
            Err(ParseError::Unexpected {
                expected: "`a`".to_string(),
                found: "`b`".to_string(),
                position: 1,
            })
        );
        assert_eq!(
            Equal::new('a').parse(&input, 2),
            Err(ParseError::EOF { position: 2 })
        );
    }

    #[test]
    fn test_satisfy() {
        let input = vec![1, 2, 3, 4, 5];
        let even = Satisfy::new(
            |x: &i32| if *x % 2 == 0 { Some(*x) } else { None },
            "even number",
        );
        assert_eq!(even.parse(&input, 1), Ok((2, 2)));
        assert!(matches!(
            even.parse(&input, 0),
            Err(ParseError::Unexpected { position: 0, .. })
        ));
        assert_eq!(even.parse(&input, 5), Err(ParseError::EOF { position: 5 }));
    }

    #[test]
    fn test_choice() {
        let input = vec![1, 2, 3];
        let choice_parser = Choice::new(vec![Box::new(digit(2)), Box::new(digit(1))]);
        assert_eq!(choice_parser.parse(&input, 0), Ok((1, 1)));
        assert_eq!(
            choice_parser.parse(&input, 2),
            Err(ParseError::NoAlternative { position: 2 })
        );
        assert_eq!(
            choice_parser.parse(&input, 3),
            Err(ParseError::EOF { position: 3 })
        );
    }

    #[test]
    fn test_choice_reports_deepest_error() {
        let input = vec![1, 2, 9];
        let choice_parser: Choice<i32, i32> = Choice::new(vec![
            Box::new(digit(5)),
            Box::new(Map::new(
                Tuple3::new(digit(1), digit(2), digit(3)),
                |(a, _, _): (i32, i32, i32)| a,
            )),
        ]);
        assert!(matches!(
            choice_parser.parse(&input, 0),
            Err(ParseError::Unexpected { position: 2, .. })
        ));
    }

    #[test]
    fn test_map() {
        let input = vec![1, 2, 3];
        let map_parser = Map::new(digit(1), |x| x * 10);
        assert_eq!(map_parser.parse(&input, 0), Ok((1, 10)));
        assert!(map_parser.parse(&input, 1).is_err());
    }

    #[test]
    fn test_many() {
        let input = vec![1, 1, 1, 2, 3];
        let many_parser = Many::new(digit(1));
        assert_eq!(many_parser.parse(&input, 0), Ok((3, vec![1, 1, 1])));
        assert_eq!(many_parser.parse(&input, 3), Ok((3, vec![])));
        assert_eq!(many_parser.parse(&input, 5), Ok((5, vec![])));
    }

    #[test]
    fn test_separated_list() {
        let item = Satisfy::new(|x: &char| x.is_alphabetic().then_some(*x), "letter");
        let comma = AsUnit::new(Equal::new(','));
        let parser = SeparatedList::new(item, comma);

        let input: Vec<char> = vec![];
        assert_eq!(parser.parse(&input, 0), Ok((0, vec![])));

        let input: Vec<char> = vec!['a', ',', 'b', ',', 'c'];
        assert_eq!(parser.parse(&input, 0), Ok((5, vec!['a', 'b', 'c'])));

        let input: Vec<char> = vec!['a', ',', 'b', ','];
        assert_eq!(parser.parse(&input, 0), Ok((4, vec!['a', 'b'])));
    }

    #[test]
    fn test_optional() {
        let input = vec![1, 2, 3];
        let optional_parser = Optional::new(digit(1));
        assert_eq!(optional_parser.parse(&input, 0), Ok((1, Some(1))));
        assert_eq!(optional_parser.parse(&input, 1), Ok((1, None)));
    }

    #[test]
    fn test_delimited_and_preceded() {
        let input = vec!['(', '1', ')'];
        let left = AsUnit::new(Equal::new('('));
        let right = AsUnit::new(Equal::new(')'));
        let delimited_parser = Delimited::new(left, Equal::new('1'), right);
        assert_eq!(delimited_parser.parse(&input, 0), Ok((3, '1')));

        let preceded = Preceded::new(AsUnit::new(Equal::new('(')), Equal::new('1'));
        assert_eq!(preceded.parse(&input, 0), Ok((2, '1')));
    }

    #[test]
    fn test_with_context() {
        let input = vec![2];
        let parser = WithContext::new(digit(1), "one");
        let err = parser.parse(&input, 0).unwrap_err();
        assert_eq!(err.contexts(), vec!["one"]);
        assert_eq!(err.get_position(), 0);
    }
}
