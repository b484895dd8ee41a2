//! Recorded frame acting as a context accessor.

use indexmap::IndexMap;
use serde_json::Value as Json;
use smol_str::SmolStr;
use tprobe_core::{ContextAccessor, ProbeError, Value};

use crate::error::HostError;
use crate::expr::{evaluate, parse_expression};
use crate::value::HostValue;

/// Variables visible in one suspended frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSnapshot {
    variables: IndexMap<SmolStr, HostValue>,
}

impl FrameSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from a JSON object of variable name to value.
    pub fn from_json(json: Json) -> Result<Self, HostError> {
        match json {
            Json::Null => Ok(Self::default()),
            Json::Object(object) => {
                let variables = object
                    .into_iter()
                    .map(|(name, value)| Ok((SmolStr::new(name), HostValue::from_json(value)?)))
                    .collect::<Result<_, HostError>>()?;
                Ok(Self { variables })
            }
            other => Err(HostError::InvalidValue(
                format!("frame must be an object, found {other}").into(),
            )),
        }
    }

    /// Add or replace a variable.
    #[must_use]
    pub fn with(mut self, name: impl Into<SmolStr>, value: HostValue) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HostValue> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&SmolStr, &HostValue)> {
        self.variables.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Evaluate an expression without mapping the error.
    pub fn evaluate(&self, source: &str) -> Result<HostValue, HostError> {
        let expr = parse_expression(source)?;
        evaluate(&expr, &self.variables)
    }
}

impl ContextAccessor for FrameSnapshot {
    fn read_variable(&mut self, name: &str) -> Result<Value, ProbeError> {
        self.variables
            .get(name)
            .map(HostValue::to_value)
            .ok_or_else(|| ProbeError::NameNotFound(name.into()))
    }

    fn evaluate_expression(&mut self, expr: &str) -> Result<Value, ProbeError> {
        let value = self.evaluate(expr).map_err(|err| {
            tracing::trace!(expr, error = %err, "frame evaluation failed");
            ProbeError::evaluation(expr, err.to_string())
        })?;
        Ok(value.to_value())
    }
}
