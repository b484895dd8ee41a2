//! Probe errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised while defining, firing, or emitting probes.
///
/// Per-hit variants (`NameNotFound`, `EvaluationError`, `DerivationError`)
/// are recorded inline in a [`DiagnosticRecord`](crate::DiagnosticRecord)
/// and never leave the probe that produced them. `SinkWriteError` is only
/// counted by the emitter. The remaining variants are setup-time failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Variable is not visible in the suspended frame.
    #[error("name not found '{0}'")]
    NameNotFound(SmolStr),

    /// The host could not evaluate an expression in the suspended frame.
    #[error("evaluation of '{expr}' failed: {message}")]
    EvaluationError { expr: SmolStr, message: SmolStr },

    /// A derived value could not be computed from the captured inputs.
    #[error("derivation failed: {0}")]
    DerivationError(SmolStr),

    /// The output sink rejected a record.
    #[error("sink write failed: {0}")]
    SinkWriteError(SmolStr),

    /// A session definition could not be parsed.
    #[error("malformed probe definition at line {line}: {reason}")]
    MalformedProbeDefinition { line: usize, reason: SmolStr },

    /// A location string could not be parsed.
    #[error("invalid location '{0}'")]
    InvalidLocation(SmolStr),

    /// Configuration error.
    #[error("invalid config '{0}'")]
    InvalidConfig(SmolStr),
}

impl ProbeError {
    /// Build an evaluation error from host diagnostic text.
    pub fn evaluation(expr: impl Into<SmolStr>, message: impl Into<SmolStr>) -> Self {
        Self::EvaluationError {
            expr: expr.into(),
            message: message.into(),
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<SmolStr>) -> Self {
        Self::MalformedProbeDefinition {
            line,
            reason: reason.into(),
        }
    }

    /// Short taxonomy name used in failure markers.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NameNotFound(_) => "NameNotFound",
            Self::EvaluationError { .. } => "EvaluationError",
            Self::DerivationError(_) => "DerivationError",
            Self::SinkWriteError(_) => "SinkWriteError",
            Self::MalformedProbeDefinition { .. } => "MalformedProbeDefinition",
            Self::InvalidLocation(_) => "InvalidLocation",
            Self::InvalidConfig(_) => "InvalidConfig",
        }
    }
}
