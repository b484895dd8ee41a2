//! Expression dialect evaluated against recorded frames.
//!
//! The dialect is a small C-like subset: names, literals, member access
//! with `.` and `->`, arithmetic, comparisons and short-circuit logic.

mod ast;
mod eval;
mod lexer;
mod parse;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use eval::evaluate;
pub use lexer::{tokenize, Token, TokenKind};
pub use parse::parse_expression;
