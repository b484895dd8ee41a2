//! Host-side errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors from expression evaluation and trace loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// Unrecognized character in an expression.
    #[error("unexpected character at offset {0}")]
    Lex(usize),

    /// Expression does not parse.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: SmolStr },

    /// Name is not visible in the frame.
    #[error("use of undeclared identifier '{0}'")]
    UndefinedName(SmolStr),

    /// Field lookup on a record without that field.
    #[error("no member named '{field}' in '{type_name}'")]
    NoMember { type_name: SmolStr, field: SmolStr },

    /// `.` on a pointer or `->` on a non-pointer.
    #[error("member reference type '{0}' is not valid for this operator")]
    BadMemberAccess(SmolStr),

    /// Dereference of a null pointer.
    #[error("null pointer dereference")]
    NullDereference,

    /// Pointer whose target was not captured in the frame.
    #[error("pointer target at {0:#x} not captured")]
    UncapturedTarget(u64),

    /// Operand types do not fit the operator.
    #[error("invalid operands '{left}' and '{right}'")]
    TypeMismatch { left: SmolStr, right: SmolStr },

    /// Operand type does not fit a unary operator.
    #[error("invalid operand '{operand}' to unary '{op}'")]
    InvalidOperand { op: SmolStr, operand: SmolStr },

    /// Division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,

    /// Frame value that cannot be represented.
    #[error("invalid frame value: {0}")]
    InvalidValue(SmolStr),

    /// Malformed trace line.
    #[error("invalid trace at line {line}: {message}")]
    Trace { line: usize, message: SmolStr },

    /// Trace file could not be read.
    #[error("failed to read trace: {0}")]
    Io(SmolStr),
}
