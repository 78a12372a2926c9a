use std::cmp::Ordering;
use std::sync::Arc;

use tracing::trace;

use super::{
    EvalError, EvalResult, builtins,
    context::{ExecutionContext, Frame, Scope},
    statement::{Flow, StatementEvaluator},
    value::Value,
};
use crate::ast::{self, BinaryOperator, Expression, FunctionDef, UnaryOperator};

/// Free stack below which evaluation switches to a freshly allocated segment.
const STACK_RED_ZONE: usize = 64 * 1024;
/// Size of each additional stack segment.
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressionEvaluator;

impl ExpressionEvaluator {
    /// Nested expressions recurse on the native stack, which grows on demand
    /// so that only `max_call_depth` bounds how deep `lit` code may go.
    pub fn eval_expression(
        &self,
        expression: &Expression,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            self.eval_expression_inner(expression, ctx)
        })
    }

    fn eval_expression_inner(
        &self,
        expression: &Expression,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Value> {
        match expression {
            Expression::Literal(literal) => Ok(eval_literal(literal)),
            Expression::Interpolation(parts) => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        ast::InterpolationPart::Text(s) => text.push_str(s),
                        ast::InterpolationPart::Variable(name) => {
                            text.push_str(&ctx.lookup_variable(name)?.to_string())
                        }
                    }
                }
                Ok(Value::String(text))
            }
            Expression::Variable(name) => ctx.lookup_variable(name),
            Expression::List(items) => items
                .iter()
                .map(|item| self.eval_expression(item, ctx))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::List),
            Expression::Unary { op, operand } => {
                let value = self.eval_expression(operand, ctx)?;
                eval_unary(*op, value)
            }
            Expression::BinaryOp { op, left, right } => match op {
                BinaryOperator::And | BinaryOperator::Or => {
                    self.eval_logical(*op, left, right, ctx)
                }
                _ => {
                    let left = self.eval_expression(left, ctx)?;
                    let right = self.eval_expression(right, ctx)?;
                    eval_binary(*op, left, right)
                }
            },
            Expression::FunctionCall {
                function,
                arguments,
            } => self.eval_call(function, arguments, ctx),
            Expression::Index { target, index } => {
                let target = self.eval_expression(target, ctx)?;
                let index = self.eval_expression(index, ctx)?;
                eval_index(target, index)
            }
        }
    }

    fn eval_logical(
        &self,
        op: BinaryOperator,
        left: &Expression,
        right: &Expression,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Value> {
        let left = expect_bool(self.eval_expression(left, ctx)?, op)?;
        let short_circuit = match op {
            BinaryOperator::And => !left,
            _ => left,
        };
        if short_circuit {
            return Ok(Value::Boolean(left));
        }
        let right = expect_bool(self.eval_expression(right, ctx)?, op)?;
        Ok(Value::Boolean(right))
    }

    fn eval_call(
        &self,
        function: &Expression,
        arguments: &[Expression],
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Value> {
        ctx.check_interrupt()?;

        // User bindings shadow builtins of the same name.
        let callee = match function {
            Expression::Variable(name) => match ctx.lookup(name) {
                Some(value) => value.clone(),
                None => {
                    let builtin = builtins::lookup(name)
                        .ok_or_else(|| EvalError::UnknownFunction(name.clone()))?;
                    let args = self.eval_arguments(arguments, ctx)?;
                    trace!(name = name.as_str(), "call builtin");
                    return ctx.with_frame(Frame::builtin(name), |ctx| builtin(ctx, args));
                }
            },
            other => self.eval_expression(other, ctx)?,
        };

        match callee {
            Value::Function(def) => {
                let args = self.eval_arguments(arguments, ctx)?;
                self.call_function(&def, args, ctx)
            }
            other => Err(EvalError::type_mismatch(format!(
                "`{}` is a {}, not a function",
                function.callee_name(),
                other.kind()
            ))),
        }
    }

    fn eval_arguments(
        &self,
        arguments: &[Expression],
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Vec<Value>> {
        arguments
            .iter()
            .map(|argument| self.eval_expression(argument, ctx))
            .collect()
    }

    pub fn call_function(
        &self,
        def: &Arc<FunctionDef>,
        args: Vec<Value>,
        ctx: &mut ExecutionContext,
    ) -> EvalResult<Value> {
        if args.len() != def.params.len() {
            return Err(EvalError::Arity {
                name: def.name.clone(),
                expected: def.params.len().to_string(),
                found: args.len(),
            });
        }
        let scope: Scope = def.params.iter().cloned().zip(args).collect();

        let call = |ctx: &mut ExecutionContext| -> EvalResult<Value> {
            ctx.enter_call(scope)?;
            let result = StatementEvaluator.eval_block(&def.body, ctx);
            ctx.exit_call();
            match result? {
                Flow::Normal(value) | Flow::Return(value) => Ok(value),
            }
        };
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            ctx.with_frame(Frame::function(&def.name), call)
        })
    }
}

fn eval_literal(literal: &ast::Literal) -> Value {
    match literal {
        ast::Literal::Integer(n) => Value::Integer(*n),
        ast::Literal::Float(x) => Value::Float(*x),
        ast::Literal::String(s) => Value::String(s.clone()),
        ast::Literal::Boolean(b) => Value::Boolean(*b),
        ast::Literal::Null => Value::Null,
    }
}

fn expect_bool(value: Value, op: BinaryOperator) -> EvalResult<bool> {
    match value {
        Value::Boolean(b) => Ok(b),
        other => Err(EvalError::type_mismatch(format!(
            "`{}` expects booleans, found {}",
            op,
            other.kind()
        ))),
    }
}

fn eval_unary(op: UnaryOperator, value: Value) -> EvalResult<Value> {
    match (op, value) {
        (UnaryOperator::Negate, Value::Integer(n)) => {
            n.checked_neg().map(Value::Integer).ok_or(EvalError::Overflow)
        }
        (UnaryOperator::Negate, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (op, value) => Err(EvalError::type_mismatch(format!(
            "cannot apply `{}` to {}",
            op,
            value.kind()
        ))),
    }
}

fn mismatch(op: BinaryOperator, left: &Value, right: &Value) -> EvalError {
    EvalError::type_mismatch(format!(
        "cannot apply `{}` to {} and {}",
        op,
        left.kind(),
        right.kind()
    ))
}

pub(crate) fn eval_binary(op: BinaryOperator, left: Value, right: Value) -> EvalResult<Value> {
    use Value::{Float, Integer};

    match op {
        BinaryOperator::Add => match (left, right) {
            (Integer(a), Integer(b)) => a.checked_add(b).map(Integer).ok_or(EvalError::Overflow),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (Value::List(mut a), Value::List(b)) => {
                a.extend(b);
                Ok(Value::List(a))
            }
            (left, right) => float_op(op, &left, &right, |a, b| a + b),
        },
        BinaryOperator::Subtract => match (left, right) {
            (Integer(a), Integer(b)) => a.checked_sub(b).map(Integer).ok_or(EvalError::Overflow),
            (left, right) => float_op(op, &left, &right, |a, b| a - b),
        },
        BinaryOperator::Multiply => match (left, right) {
            (Integer(a), Integer(b)) => a.checked_mul(b).map(Integer).ok_or(EvalError::Overflow),
            (left, right) => float_op(op, &left, &right, |a, b| a * b),
        },
        BinaryOperator::Divide => match (left, right) {
            (Integer(_), Integer(0)) => Err(EvalError::DivisionByZero),
            (Integer(a), Integer(b)) => a.checked_div(b).map(Integer).ok_or(EvalError::Overflow),
            (left, right) => {
                if right.as_f64() == Some(0.0) {
                    return Err(EvalError::DivisionByZero);
                }
                float_op(op, &left, &right, |a, b| a / b)
            }
        },
        BinaryOperator::Modulo => match (left, right) {
            (Integer(_), Integer(0)) => Err(EvalError::DivisionByZero),
            (Integer(a), Integer(b)) => a.checked_rem(b).map(Integer).ok_or(EvalError::Overflow),
            (left, right) => {
                if right.as_f64() == Some(0.0) {
                    return Err(EvalError::DivisionByZero);
                }
                float_op(op, &left, &right, |a, b| a % b)
            }
        },
        BinaryOperator::Equal => Ok(Value::Boolean(values_equal(&left, &right))),
        BinaryOperator::NotEqual => Ok(Value::Boolean(!values_equal(&left, &right))),
        BinaryOperator::LessThan
        | BinaryOperator::LessThanEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanEqual => {
            let ordering = compare(&left, &right).ok_or_else(|| mismatch(op, &left, &right))?;
            let result = match op {
                BinaryOperator::LessThan => ordering == Ordering::Less,
                BinaryOperator::LessThanEqual => ordering != Ordering::Greater,
                BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Boolean(result))
        }
        BinaryOperator::And | BinaryOperator::Or => {
            let left = expect_bool(left, op)?;
            let right = expect_bool(right, op)?;
            Ok(Value::Boolean(if op == BinaryOperator::And {
                left && right
            } else {
                left || right
            }))
        }
    }
}

fn float_op(
    op: BinaryOperator,
    left: &Value,
    right: &Value,
    f: impl Fn(f64, f64) -> f64,
) -> EvalResult<Value> {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok(Value::Float(f(a, b))),
        _ => Err(mismatch(op, left, right)),
    }
}

/// Numbers compare by value across integer and float; everything else structurally.
pub(crate) fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
            (*a as f64) == *b
        }
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        _ => left == right,
    }
}

pub(crate) fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.as_f64()?.partial_cmp(&right.as_f64()?),
    }
}

fn eval_index(target: Value, index: Value) -> EvalResult<Value> {
    let position = match index {
        Value::Integer(n) => n,
        other => {
            return Err(EvalError::type_mismatch(format!(
                "index must be an integer, found {}",
                other.kind()
            )));
        }
    };
    let checked = |len: usize| -> EvalResult<usize> {
        usize::try_from(position)
            .ok()
            .filter(|i| *i < len)
            .ok_or(EvalError::IndexOutOfBounds {
                index: position,
                len,
            })
    };
    match target {
        Value::List(items) => {
            let i = checked(items.len())?;
            Ok(items[i].clone())
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = checked(chars.len())?;
            Ok(Value::String(chars[i].to_string()))
        }
        Value::Table { rows, .. } => {
            let i = checked(rows.len())?;
            Ok(Value::List(rows[i].clone()))
        }
        other => Err(EvalError::type_mismatch(format!(
            "cannot index into {}",
            other.kind()
        ))),
    }
}
