use super::{
    super::{core::*, prelude::*},
    expression::parse_expression,
    *,
};
use crate::ast;

/// `(statement ';'*)*`, optionally preceded by stray semicolons.
pub fn parse_program() -> impl Parser<Token, ast::Program> {
    map(
        preceded(
            as_unit(many(delimiter(Delimiter::Semicolon))),
            many(parse_terminated_statement()),
        ),
        |statements| ast::Program { statements },
    )
}

fn parse_terminated_statement() -> impl Parser<Token, ast::Statement> {
    map(
        tuple2(
            lazy(parse_statement),
            many(delimiter(Delimiter::Semicolon)),
        ),
        |(statement, _)| statement,
    )
}

pub fn parse_statement() -> impl Parser<Token, ast::Statement> {
    with_context(
        choice(vec![
            Box::new(parse_let_statement()),
            Box::new(parse_function_definition()),
            Box::new(parse_if_statement()),
            Box::new(parse_for_statement()),
            Box::new(parse_while_statement()),
            Box::new(parse_return_statement()),
            Box::new(parse_assignment()),
            Box::new(map(parse_expression(), ast::Statement::Expression)),
        ]),
        "statement",
    )
}

fn parse_block() -> impl Parser<Token, Vec<ast::Statement>> {
    with_context(
        map(
            delimited(
                delimiter(Delimiter::OpenBrace),
                lazy(parse_program),
                delimiter(Delimiter::CloseBrace),
            ),
            |program| program.statements,
        ),
        "block",
    )
}

fn parse_let_statement() -> impl Parser<Token, ast::Statement> {
    with_context(
        map(
            tuple3(
                preceded(keyword(Keyword::Let), parse_identifier()),
                delimiter(Delimiter::Equal),
                parse_expression(),
            ),
            |(name, _, value)| ast::Statement::Let { name, value },
        ),
        "let statement",
    )
}

fn parse_assignment() -> impl Parser<Token, ast::Statement> {
    with_context(
        map(
            tuple3(
                parse_identifier(),
                delimiter(Delimiter::Equal),
                parse_expression(),
            ),
            |(name, _, value)| ast::Statement::Assign { name, value },
        ),
        "assignment",
    )
}

fn parse_function_definition() -> impl Parser<Token, ast::Statement> {
    with_context(
        map(
            tuple3(
                preceded(keyword(Keyword::Fn), parse_identifier()),
                delimited(
                    delimiter(Delimiter::OpenParen),
                    separated_list(parse_identifier(), delimiter(Delimiter::Comma)),
                    delimiter(Delimiter::CloseParen),
                ),
                parse_block(),
            ),
            |(name, params, body)| {
                ast::Statement::Function(ast::FunctionDef { name, params, body })
            },
        ),
        "function definition",
    )
}

fn parse_if_statement() -> impl Parser<Token, ast::Statement> {
    with_context(
        map(
            tuple3(
                preceded(keyword(Keyword::If), parse_expression()),
                parse_block(),
                optional(preceded(keyword(Keyword::Else), parse_else_branch())),
            ),
            |(condition, then_block, else_block)| ast::Statement::If {
                condition,
                then_block,
                else_block,
            },
        ),
        "if statement",
    )
}

/// `else { ... }` or `else if ...`, the latter as a one-statement block.
fn parse_else_branch() -> impl Parser<Token, Vec<ast::Statement>> {
    choice(vec![
        Box::new(parse_block()),
        Box::new(map(lazy(parse_if_statement), |statement| vec![statement])),
    ])
}

fn parse_for_statement() -> impl Parser<Token, ast::Statement> {
    with_context(
        map(
            tuple3(
                preceded(keyword(Keyword::For), parse_identifier()),
                preceded(keyword(Keyword::In), parse_expression()),
                parse_block(),
            ),
            |(variable, iterable, body)| ast::Statement::For {
                variable,
                iterable,
                body,
            },
        ),
        "for statement",
    )
}

fn parse_while_statement() -> impl Parser<Token, ast::Statement> {
    with_context(
        map(
            tuple2(
                preceded(keyword(Keyword::While), parse_expression()),
                parse_block(),
            ),
            |(condition, body)| ast::Statement::While { condition, body },
        ),
        "while statement",
    )
}

fn parse_return_statement() -> impl Parser<Token, ast::Statement> {
    with_context(
        map(
            preceded(keyword(Keyword::Return), optional(parse_expression())),
            ast::Statement::Return,
        ),
        "return statement",
    )
}
