use std::sync::Arc;

use tracing::trace;

use super::{
    EvalError, EvalResult,
    context::ExecutionContext,
    expression::ExpressionEvaluator,
    value::Value,
};
use crate::ast::{Expression, Program, Statement};

/// How control leaves a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal(Value),
    Return(Value),
}

impl Flow {
    pub fn into_value(self) -> Value {
        match self {
            Flow::Normal(value) | Flow::Return(value) => value,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StatementEvaluator;

impl StatementEvaluator {
    /// Runs a whole program at the current scope. The value is that of the
    /// last statement; a top-level `return` ends the program early.
    pub fn eval_program(&self, program: &Program, ctx: &mut ExecutionContext) -> EvalResult<Value> {
        self.eval_statements(&program.statements, ctx)
            .map(Flow::into_value)
    }

    /// Runs a block in the current scope; callers push a scope when one is needed.
    pub fn eval_block(
        &self,
        statements: &[Statement],
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Flow> {
        self.eval_statements(statements, ctx)
    }

    fn eval_statements(
        &self,
        statements: &[Statement],
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Flow> {
        let mut last = Value::Unit;
        for statement in statements {
            match self.eval_statement(statement, ctx)? {
                Flow::Normal(value) => last = value,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal(last))
    }

    fn eval_scoped(
        &self,
        statements: &[Statement],
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Flow> {
        ctx.push_scope();
        let result = self.eval_statements(statements, ctx);
        ctx.pop_scope();
        result
    }

    pub fn eval_statement(
        &self,
        statement: &Statement,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Flow> {
        ctx.check_interrupt()?;
        let expressions = ExpressionEvaluator;

        match statement {
            Statement::Let { name, value } => {
                let value = expressions.eval_expression(value, ctx)?;
                trace!(name = name.as_str(), "let");
                ctx.define(name, value);
                Ok(Flow::Normal(Value::Unit))
            }
            Statement::Assign { name, value } => {
                let value = expressions.eval_expression(value, ctx)?;
                ctx.assign(name, value);
                Ok(Flow::Normal(Value::Unit))
            }
            Statement::Function(def) => {
                ctx.define(&def.name, Value::Function(Arc::new(def.clone())));
                Ok(Flow::Normal(Value::Unit))
            }
            Statement::If {
                condition,
                then_block,
                else_block,
            } => {
                if self.eval_condition(condition, ctx)? {
                    self.eval_scoped(then_block, ctx)
                } else if let Some(else_block) = else_block {
                    self.eval_scoped(else_block, ctx)
                } else {
                    Ok(Flow::Normal(Value::Unit))
                }
            }
            Statement::For {
                variable,
                iterable,
                body,
            } => {
                let items = match expressions.eval_expression(iterable, ctx)? {
                    Value::List(items) => items,
                    Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
                    Value::Table { rows, .. } => rows.into_iter().map(Value::List).collect(),
                    other => {
                        return Err(EvalError::type_mismatch(format!(
                            "cannot iterate over {}",
                            other.kind()
                        )));
                    }
                };
                for item in items {
                    ctx.check_interrupt()?;
                    ctx.push_scope();
                    ctx.define(variable, item);
                    let result = self.eval_statements(body, ctx);
                    ctx.pop_scope();
                    if let flow @ Flow::Return(_) = result? {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal(Value::Unit))
            }
            Statement::While { condition, body } => {
                while self.eval_condition(condition, ctx)? {
                    ctx.check_interrupt()?;
                    if let flow @ Flow::Return(_) = self.eval_scoped(body, ctx)? {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal(Value::Unit))
            }
            Statement::Return(value) => {
                let value = match value {
                    Some(expression) => expressions.eval_expression(expression, ctx)?,
                    None => Value::Unit,
                };
                Ok(Flow::Return(value))
            }
            Statement::Expression(expression) => expressions
                .eval_expression(expression, ctx)
                .map(Flow::Normal),
        }
    }

    fn eval_condition(
        &self,
        condition: &Expression,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<bool> {
        match ExpressionEvaluator.eval_expression(condition, ctx)? {
            Value::Boolean(b) => Ok(b),
            other => Err(EvalError::type_mismatch(format!(
                "condition must be a boolean, found {}",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::parse_source;
    use crate::eval::context::{DEFAULT_MAX_CALL_DEPTH, Frame, FrameKind, InterruptFlag};

    fn run(source: &str, ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let program = parse_source(source)?;
        StatementEvaluator.eval_program(&program, ctx)
    }

    #[test]
    fn test_program_value_is_last_statement() {
        let mut ctx = ExecutionContext::default();
        assert_eq!(run("let x = 2; x * 21", &mut ctx), Ok(Value::Integer(42)));
        assert_eq!(run("let y = 1", &mut ctx), Ok(Value::Unit));
    }

    #[test]
    fn test_bindings_persist_between_programs() {
        let mut ctx = ExecutionContext::default();
        run("let total = 10", &mut ctx).unwrap();
        run("total = total + 5", &mut ctx).unwrap();
        assert_eq!(run("total", &mut ctx), Ok(Value::Integer(15)));
    }

    #[test]
    fn test_if_else_chain() {
        let mut ctx = ExecutionContext::default();
        let source = "
            fn sign(n) {
                if n < 0 { \"negative\" } else if n == 0 { \"zero\" } else { \"positive\" }
            }
            [sign(-3), sign(0), sign(8)]
        ";
        assert_eq!(
            run(source, &mut ctx),
            Ok(Value::List(vec![
                "negative".into(),
                "zero".into(),
                "positive".into()
            ]))
        );
    }

    #[test]
    fn test_loops_and_early_return() {
        let mut ctx = ExecutionContext::default();
        let source = "
            fn first_even(xs) {
                for x in xs {
                    if x % 2 == 0 { return x }
                }
                null
            }
            let i = 0
            let acc = 0
            while i < 4 { acc = acc + i; i = i + 1 }
            [first_even([1, 3, 6, 8]), first_even([1]), acc]
        ";
        assert_eq!(
            run(source, &mut ctx),
            Ok(Value::List(vec![
                Value::Integer(6),
                Value::Null,
                Value::Integer(6)
            ]))
        );
    }

    #[test]
    fn test_loop_variable_does_not_leak() {
        let mut ctx = ExecutionContext::default();
        run("for c in \"ab\" { let seen = c }", &mut ctx).unwrap();
        assert_eq!(ctx.lookup("c"), None);
        assert_eq!(ctx.lookup("seen"), None);
    }

    #[test]
    fn test_condition_must_be_boolean() {
        let mut ctx = ExecutionContext::default();
        assert!(matches!(
            run("if 1 { 2 }", &mut ctx),
            Err(EvalError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_recursion_depth_is_limited() {
        let mut ctx = ExecutionContext::new(InterruptFlag::new(), 16);
        let result = ctx.with_frame(Frame::top_level("doc.md, block 1"), |ctx| {
            run("fn down(n) { down(n + 1) }\ndown(0)", ctx)
        });
        assert_eq!(result, Err(EvalError::StackOverflow(16)));
        let trace = ctx.take_fault_trace();
        assert_eq!(trace.first().map(|f| f.kind), Some(FrameKind::Function));
        assert_eq!(trace.last().map(|f| f.kind), Some(FrameKind::TopLevel));
        ctx.reset_after_failure();
        assert_eq!(ctx.call_depth(), 0);
    }

    #[test]
    fn test_default_depth_limit_is_reached_before_the_native_stack() {
        let mut ctx = ExecutionContext::default();
        run("fn down(n) { if n == 0 { 0 } else { down(n - 1) } }", &mut ctx).unwrap();

        let deepest = format!("down({})", DEFAULT_MAX_CALL_DEPTH - 1);
        assert_eq!(run(&deepest, &mut ctx), Ok(Value::Integer(0)));
        assert_eq!(
            run("down(100000)", &mut ctx),
            Err(EvalError::StackOverflow(DEFAULT_MAX_CALL_DEPTH))
        );
    }

    #[test]
    fn test_interrupt_stops_an_infinite_loop() {
        let flag = InterruptFlag::new();
        let mut ctx = ExecutionContext::new(flag.clone(), 16);
        flag.trigger();
        assert_eq!(
            run("while true { 1 }", &mut ctx),
            Err(EvalError::Interrupted)
        );
    }
}
