use super::{
    super::{core::*, prelude::*},
    *,
};
use crate::ast;
use crate::tokenizer::literal::{Literal as TokenLiteral, StringPart};

pub fn parse_expression() -> impl Parser<Token, ast::Expression> {
    with_context(lazy(parse_logical_or), "expression")
}

type BinaryChain = (ast::Expression, Vec<(ast::BinaryOperator, ast::Expression)>);

/// Folds `a op b op c` into a left-associative tree.
fn fold_binary((first, rest): BinaryChain) -> ast::Expression {
    rest.into_iter()
        .fold(first, |left, (op, right)| ast::Expression::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
}

fn binary_operator(
    token: Operator,
    op: ast::BinaryOperator,
) -> impl Parser<Token, ast::BinaryOperator> {
    map(operator(token), move |_| op)
}

fn parse_logical_or() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(
                parse_logical_and(),
                many(tuple2(
                    binary_operator(Operator::Or, ast::BinaryOperator::Or),
                    parse_logical_and(),
                )),
            ),
            fold_binary,
        ),
        "logical or",
    )
}

fn parse_logical_and() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(
                parse_comparison(),
                many(tuple2(
                    binary_operator(Operator::And, ast::BinaryOperator::And),
                    parse_comparison(),
                )),
            ),
            fold_binary,
        ),
        "logical and",
    )
}

fn parse_comparison() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(
                parse_additive(),
                many(tuple2(parse_operator_comparison(), parse_additive())),
            ),
            fold_binary,
        ),
        "comparison",
    )
}

fn parse_operator_comparison() -> impl Parser<Token, ast::BinaryOperator> {
    choice(vec![
        Box::new(binary_operator(
            Operator::EqualEqual,
            ast::BinaryOperator::Equal,
        )),
        Box::new(binary_operator(
            Operator::NotEqual,
            ast::BinaryOperator::NotEqual,
        )),
        Box::new(binary_operator(
            Operator::GreaterEqual,
            ast::BinaryOperator::GreaterThanEqual,
        )),
        Box::new(binary_operator(
            Operator::Greater,
            ast::BinaryOperator::GreaterThan,
        )),
        Box::new(binary_operator(
            Operator::LessEqual,
            ast::BinaryOperator::LessThanEqual,
        )),
        Box::new(binary_operator(Operator::Less, ast::BinaryOperator::LessThan)),
    ])
}

fn parse_additive() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(
                parse_multiplicative(),
                many(tuple2(
                    choice(vec![
                        Box::new(binary_operator(Operator::Plus, ast::BinaryOperator::Add)),
                        Box::new(binary_operator(
                            Operator::Minus,
                            ast::BinaryOperator::Subtract,
                        )),
                    ]),
                    parse_multiplicative(),
                )),
            ),
            fold_binary,
        ),
        "additive",
    )
}

fn parse_multiplicative() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            tuple2(
                parse_unary(),
                many(tuple2(
                    choice(vec![
                        Box::new(binary_operator(
                            Operator::Multiply,
                            ast::BinaryOperator::Multiply,
                        )),
                        Box::new(binary_operator(
                            Operator::Divide,
                            ast::BinaryOperator::Divide,
                        )),
                        Box::new(binary_operator(
                            Operator::Modulo,
                            ast::BinaryOperator::Modulo,
                        )),
                    ]),
                    parse_unary(),
                )),
            ),
            fold_binary,
        ),
        "multiplicative",
    )
}

fn parse_unary() -> impl Parser<Token, ast::Expression> {
    with_context(
        choice(vec![
            Box::new(map(
                tuple2(parse_unary_operator(), lazy(parse_unary)),
                |(op, operand)| ast::Expression::Unary {
                    op,
                    operand: Box::new(operand),
                },
            )),
            Box::new(parse_postfix()),
        ]),
        "unary",
    )
}

fn parse_unary_operator() -> impl Parser<Token, ast::UnaryOperator> {
    choice(vec![
        Box::new(map(operator(Operator::Minus), |_| {
            ast::UnaryOperator::Negate
        })),
        Box::new(map(operator(Operator::Not), |_| ast::UnaryOperator::Not)),
    ])
}

enum Postfix {
    Call(Vec<ast::Expression>),
    Index(ast::Expression),
}

fn parse_postfix() -> impl Parser<Token, ast::Expression> {
    map(
        tuple2(parse_primary(), many(parse_postfix_operator())),
        |(target, operations)| {
            operations
                .into_iter()
                .fold(target, |target, operation| match operation {
                    Postfix::Call(arguments) => ast::Expression::FunctionCall {
                        function: Box::new(target),
                        arguments,
                    },
                    Postfix::Index(index) => ast::Expression::Index {
                        target: Box::new(target),
                        index: Box::new(index),
                    },
                })
        },
    )
}

fn parse_postfix_operator() -> impl Parser<Token, Postfix> {
    choice(vec![
        Box::new(map(parse_arguments(), Postfix::Call)),
        Box::new(map(
            delimited(
                delimiter(Delimiter::OpenBracket),
                parse_expression(),
                delimiter(Delimiter::CloseBracket),
            ),
            Postfix::Index,
        )),
    ])
}

fn parse_arguments() -> impl Parser<Token, Vec<ast::Expression>> {
    with_context(
        delimited(
            delimiter(Delimiter::OpenParen),
            separated_list(parse_expression(), delimiter(Delimiter::Comma)),
            delimiter(Delimiter::CloseParen),
        ),
        "call arguments",
    )
}

fn parse_primary() -> impl Parser<Token, ast::Expression> {
    with_context(
        choice(vec![
            Box::new(parse_literal()),
            Box::new(map(parse_identifier(), ast::Expression::Variable)),
            Box::new(delimited(
                delimiter(Delimiter::OpenParen),
                parse_expression(),
                delimiter(Delimiter::CloseParen),
            )),
            Box::new(parse_list()),
        ]),
        "primary",
    )
}

fn parse_list() -> impl Parser<Token, ast::Expression> {
    with_context(
        map(
            delimited(
                delimiter(Delimiter::OpenBracket),
                separated_list(parse_expression(), delimiter(Delimiter::Comma)),
                delimiter(Delimiter::CloseBracket),
            ),
            ast::Expression::List,
        ),
        "list",
    )
}

fn parse_literal() -> impl Parser<Token, ast::Expression> {
    satisfy(
        |token: &Token| match token {
            Token::Literal(literal) => Some(convert_literal(literal)),
            _ => None,
        },
        "literal",
    )
}

fn convert_literal(literal: &TokenLiteral) -> ast::Expression {
    match literal {
        TokenLiteral::Integer(n) => ast::Expression::Literal(ast::Literal::Integer(*n)),
        TokenLiteral::Float(x) => ast::Expression::Literal(ast::Literal::Float(*x)),
        TokenLiteral::Boolean(b) => ast::Expression::Literal(ast::Literal::Boolean(*b)),
        TokenLiteral::Null => ast::Expression::Literal(ast::Literal::Null),
        TokenLiteral::String(parts) => {
            let interpolated = parts
                .iter()
                .any(|part| matches!(part, StringPart::Interpolation(_)));
            if interpolated {
                ast::Expression::Interpolation(
                    parts
                        .iter()
                        .map(|part| match part {
                            StringPart::Literal(text) => ast::InterpolationPart::Text(text.clone()),
                            StringPart::Interpolation(name) => {
                                ast::InterpolationPart::Variable(name.clone())
                            }
                        })
                        .collect(),
                )
            } else {
                let text = parts
                    .iter()
                    .filter_map(|part| match part {
                        StringPart::Literal(text) => Some(text.as_str()),
                        StringPart::Interpolation(_) => None,
                    })
                    .collect::<String>();
                ast::Expression::Literal(ast::Literal::String(text))
            }
        }
    }
}
