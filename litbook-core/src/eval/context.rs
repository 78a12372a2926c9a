//! The shared execution context.
//!
//! One [`ExecutionContext`] lives for a whole generation session and is passed
//! by `&mut` to every evaluation, so bindings made by one expression are seen
//! by every later one, across documents.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::{EvalError, EvalResult, value::Value};

pub type Scope = HashMap<String, Value>;

pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Nested block scopes of one activation (the top level, or one function call).
#[derive(Debug, Default, Clone)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_scope(scope: Scope) -> Self {
        Self {
            scopes: vec![scope],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::new());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }

    /// Binds in the innermost scope. Returns the value back when there is no scope.
    fn define(&mut self, name: &str, value: Value) -> Option<Value> {
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.insert(name.to_string(), value);
                None
            }
            None => Some(value),
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum FrameKind {
    Builtin,
    Function,
    TopLevel,
    Host,
}

/// One entry of the call stack, as it shows up in a diagnostic trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: FrameKind,
    pub name: String,
    pub location: Option<String>,
}

impl Frame {
    pub fn builtin(name: &str) -> Self {
        Self {
            kind: FrameKind::Builtin,
            name: name.to_string(),
            location: None,
        }
    }

    pub fn function(name: &str) -> Self {
        Self {
            kind: FrameKind::Function,
            name: name.to_string(),
            location: None,
        }
    }

    pub fn top_level(location: &str) -> Self {
        Self {
            kind: FrameKind::TopLevel,
            name: "top-level scope".to_string(),
            location: Some(location.to_string()),
        }
    }

    pub fn host(name: &str) -> Self {
        Self {
            kind: FrameKind::Host,
            name: name.to_string(),
            location: None,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FrameKind::Builtin => write!(f, "in builtin `{}`", self.name)?,
            FrameKind::Function => write!(f, "in function `{}`", self.name)?,
            FrameKind::TopLevel => write!(f, "{}", self.name)?,
            FrameKind::Host => write!(f, "in `{}`", self.name)?,
        }
        if let Some(location) = &self.location {
            write!(f, " at {}", location)?;
        }
        Ok(())
    }
}

/// Set from a signal handler, polled by the interpreter.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Bindings, call stack and interrupt state of one generation session.
pub struct ExecutionContext {
    globals: Scope,
    // stacks[0] is the top level; each user function call pushes one more
    stacks: Vec<ScopeStack>,
    call_stack: Vec<Frame>,
    fault_trace: Option<Vec<Frame>>,
    interrupt: InterruptFlag,
    max_call_depth: usize,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(InterruptFlag::new(), DEFAULT_MAX_CALL_DEPTH)
    }
}

impl ExecutionContext {
    pub fn new(interrupt: InterruptFlag, max_call_depth: usize) -> Self {
        Self {
            globals: Scope::new(),
            stacks: vec![ScopeStack::new()],
            call_stack: Vec::new(),
            fault_trace: None,
            interrupt,
            max_call_depth,
        }
    }

    fn current(&mut self) -> &mut ScopeStack {
        if self.stacks.is_empty() {
            self.stacks.push(ScopeStack::new());
        }
        let last = self.stacks.len() - 1;
        &mut self.stacks[last]
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.stacks
            .last()
            .and_then(|stack| stack.get(name))
            .or_else(|| self.globals.get(name))
    }

    pub fn lookup_variable(&self, name: &str) -> EvalResult<Value> {
        self.lookup(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
    }

    /// `let`: binds in the innermost block scope, or globally at the top level.
    pub fn define(&mut self, name: &str, value: Value) {
        if let Some(value) = self.current().define(name, value) {
            debug!(name, "define global");
            self.globals.insert(name.to_string(), value);
        }
    }

    /// Plain assignment: updates the nearest existing binding, or defines one.
    pub fn assign(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.current().get_mut(name) {
            *slot = value;
        } else if let Some(slot) = self.globals.get_mut(name) {
            *slot = value;
        } else {
            self.define(name, value);
        }
    }

    pub fn globals(&self) -> &Scope {
        &self.globals
    }

    pub fn push_scope(&mut self) {
        self.current().push();
    }

    pub fn pop_scope(&mut self) {
        self.current().pop();
    }

    /// Starts a user function activation whose parent scope is the global scope.
    pub fn enter_call(&mut self, arguments: Scope) -> EvalResult<()> {
        if self.call_depth() >= self.max_call_depth {
            return Err(EvalError::StackOverflow(self.max_call_depth));
        }
        self.stacks.push(ScopeStack::with_scope(arguments));
        Ok(())
    }

    pub fn exit_call(&mut self) {
        if self.stacks.len() > 1 {
            self.stacks.pop();
        }
    }

    pub fn call_depth(&self) -> usize {
        self.stacks.len().saturating_sub(1)
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// Runs `f` inside `frame`. The first error to leave a frame records the
    /// whole call stack, innermost first.
    pub fn with_frame<T>(
        &mut self,
        frame: Frame,
        f: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        self.call_stack.push(frame);
        let result = f(self);
        if result.is_err() && self.fault_trace.is_none() {
            self.fault_trace = Some(self.call_stack.iter().rev().cloned().collect());
        }
        self.call_stack.pop();
        result
    }

    /// Runs `f` with `frame` on the call stack. Unlike [`Self::with_frame`]
    /// nothing is recorded here; the frame only shows up in traces captured
    /// further in.
    pub fn within<T>(&mut self, frame: Frame, f: impl FnOnce(&mut Self) -> T) -> T {
        self.call_stack.push(frame);
        let result = f(self);
        self.call_stack.pop();
        result
    }

    pub fn call_stack(&self) -> &[Frame] {
        &self.call_stack
    }

    pub fn take_fault_trace(&mut self) -> Vec<Frame> {
        self.fault_trace.take().unwrap_or_default()
    }

    /// Drops anything left over from a failed evaluation: stale trace, open
    /// block scopes and unfinished calls.
    pub fn reset_after_failure(&mut self) {
        self.fault_trace = None;
        self.stacks.truncate(1);
        self.stacks[0] = ScopeStack::new();
    }

    pub fn interrupt_flag(&self) -> &InterruptFlag {
        &self.interrupt
    }

    pub fn check_interrupt(&self) -> EvalResult<()> {
        if self.interrupt.is_set() {
            Err(EvalError::Interrupted)
        } else {
            Ok(())
        }
    }
}
