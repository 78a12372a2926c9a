//! Constructor functions for the combinators, so grammar code reads as
//! `map(tuple2(a, b), f)` instead of `Map::new(Tuple2::new(a, b), f)`.

use std::fmt;

use super::combinators::*;
use super::core::Parser;

pub fn equal<I: Clone + PartialEq + fmt::Display>(value: I) -> Equal<I> {
    Equal::new(value)
}

pub fn satisfy<I, O, F>(f: F, expected: &'static str) -> Satisfy<I, O, F>
where
    F: Fn(&I) -> Option<O>,
{
    Satisfy::new(f, expected)
}

pub fn choice<I, O>(parsers: Vec<Box<dyn Parser<I, O>>>) -> Choice<I, O> {
    Choice::new(parsers)
}

pub fn map<I, A, B, P, F>(parser: P, f: F) -> Map<P, F, A, B>
where
    P: Parser<I, A>,
    F: Fn(A) -> B,
{
    Map::new(parser, f)
}

pub fn as_unit<I, O, P>(parser: P) -> AsUnit<P, O>
where
    P: Parser<I, O>,
{
    AsUnit::new(parser)
}

pub fn many<I, O, P>(parser: P) -> Many<P, I, O>
where
    P: Parser<I, O>,
{
    Many::new(parser)
}

pub fn separated_list<I, O, P, S>(item: P, separator: S) -> SeparatedList<P, S, I, O>
where
    P: Parser<I, O>,
    S: Parser<I, ()>,
{
    SeparatedList::new(item, separator)
}

pub fn optional<I, O, P>(parser: P) -> Optional<P, I, O>
where
    P: Parser<I, O>,
{
    Optional::new(parser)
}

pub fn preceded<I, O, P1, P2>(prefix: P1, parser: P2) -> Preceded<P1, P2, I, O>
where
    P1: Parser<I, ()>,
    P2: Parser<I, O>,
{
    Preceded::new(prefix, parser)
}

pub fn delimited<I, O, L, P, R>(left: L, parser: P, right: R) -> Delimited<L, P, R, I, O>
where
    L: Parser<I, ()>,
    P: Parser<I, O>,
    R: Parser<I, ()>,
{
    Delimited::new(left, parser, right)
}

pub fn tuple2<I, O1, O2, P1, P2>(parser1: P1, parser2: P2) -> Tuple2<P1, P2, I, O1, O2>
where
    P1: Parser<I, O1>,
    P2: Parser<I, O2>,
{
    Tuple2::new(parser1, parser2)
}

pub fn tuple3<I, O1, O2, O3, P1, P2, P3>(
    parser1: P1,
    parser2: P2,
    parser3: P3,
) -> Tuple3<P1, P2, P3, I, O1, O2, O3>
where
    P1: Parser<I, O1>,
    P2: Parser<I, O2>,
    P3: Parser<I, O3>,
{
    Tuple3::new(parser1, parser2, parser3)
}

pub fn with_context<I, O, P>(parser: P, context: &'static str) -> WithContext<P, &'static str>
where
    P: Parser<I, O>,
{
    WithContext::new(parser, context)
}

pub fn lazy<I, O, P, F>(f: F) -> Lazy<F>
where
    F: Fn() -> P,
    P: Parser<I, O>,
{
    Lazy::new(f)
}
