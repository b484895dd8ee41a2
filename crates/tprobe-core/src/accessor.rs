//! Context accessor trait.

use crate::error::ProbeError;
use crate::value::Value;

/// Narrow view of the frame the host suspended for the current hit.
///
/// Implementations are bound to exactly one suspended frame and are handed
/// to the dispatcher per hit; nothing is carried across hits. Reads must not
/// mutate target state beyond side effects of the evaluated expression.
pub trait ContextAccessor {
    /// Look up a variable visible in the current frame.
    ///
    /// Fails with [`ProbeError::NameNotFound`] when the name is not in scope.
    fn read_variable(&mut self, name: &str) -> Result<Value, ProbeError>;

    /// Evaluate an expression in the current frame's dialect.
    ///
    /// Fails with [`ProbeError::EvaluationError`] carrying the host's
    /// diagnostic text.
    fn evaluate_expression(&mut self, expr: &str) -> Result<Value, ProbeError>;
}

impl<T: ContextAccessor + ?Sized> ContextAccessor for &mut T {
    fn read_variable(&mut self, name: &str) -> Result<Value, ProbeError> {
        (**self).read_variable(name)
    }

    fn evaluate_expression(&mut self, expr: &str) -> Result<Value, ProbeError> {
        (**self).evaluate_expression(expr)
    }
}

