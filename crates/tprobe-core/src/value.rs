//! Values read from a suspended frame.

#![allow(missing_docs)]

use std::fmt;

use smol_str::SmolStr;

use crate::error::ProbeError;

/// A value as reported by the host for one read.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(SmolStr),
    /// Raw pointer or address.
    Address(u64),
    /// Struct, class, or array the host does not expand.
    Aggregate { type_name: SmolStr },
}

impl Value {
    /// Whether a condition evaluating to this value lets a probe fire.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(value) => *value,
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Address(value) => *value != 0,
            Value::Null | Value::Text(_) | Value::Aggregate { .. } => false,
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Address(_) => "address",
            Value::Aggregate { type_name } => type_name,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Text(value) => f.write_str(value),
            Value::Address(value) => write!(f, "{value:#x}"),
            Value::Aggregate { type_name } => write!(f, "{type_name} {{...}}"),
        }
    }
}

/// Outcome of evaluating one read step.
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedValue {
    Captured { value: Value, text: String },
    Failed(ProbeError),
}

impl CapturedValue {
    /// Capture a value, keeping its textual form.
    #[must_use]
    pub fn captured(value: Value) -> Self {
        let text = value.to_string();
        Self::Captured { value, text }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Captured { .. })
    }

    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Captured { value, .. } => Some(value),
            Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Captured { text, .. } => Some(text),
            Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&ProbeError> {
        match self {
            Self::Captured { .. } => None,
            Self::Failed(err) => Some(err),
        }
    }
}

impl From<Result<Value, ProbeError>> for CapturedValue {
    fn from(result: Result<Value, ProbeError>) -> Self {
        match result {
            Ok(value) => Self::captured(value),
            Err(err) => Self::Failed(err),
        }
    }
}
