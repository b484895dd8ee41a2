#![allow(dead_code)]

use std::collections::HashMap;

use tprobe_core::{ContextAccessor, ProbeError, Value};

/// Frame stub: variables by name, expressions by exact text.
#[derive(Debug, Default)]
pub struct StubFrame {
    pub variables: HashMap<String, Value>,
    pub expressions: HashMap<String, Result<Value, String>>,
    pub reads: Vec<String>,
}

impl StubFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(mut self, name: &str, value: Value) -> Self {
        self.variables.insert(name.to_string(), value);
        self
    }

    pub fn expr(mut self, text: &str, value: Value) -> Self {
        self.expressions.insert(text.to_string(), Ok(value));
        self
    }

    pub fn failing_expr(mut self, text: &str, message: &str) -> Self {
        self.expressions
            .insert(text.to_string(), Err(message.to_string()));
        self
    }
}

impl ContextAccessor for StubFrame {
    fn read_variable(&mut self, name: &str) -> Result<Value, ProbeError> {
        self.reads.push(name.to_string());
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| ProbeError::NameNotFound(name.into()))
    }

    fn evaluate_expression(&mut self, expr: &str) -> Result<Value, ProbeError> {
        self.reads.push(expr.to_string());
        match self.expressions.get(expr) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(ProbeError::evaluation(expr, message.as_str())),
            None => Err(ProbeError::evaluation(expr, "unknown expression")),
        }
    }
}
