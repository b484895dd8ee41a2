use smol_str::SmolStr;
use tprobe_core::Value;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(SmolStr),
    /// `target.field`, or `target->field` when `deref` is set.
    Member {
        target: Box<Expr>,
        field: SmolStr,
        deref: bool,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Height of the tree; a leaf is 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Expr::Literal(_) | Expr::Name(_) => 1,
            Expr::Member { target, .. } => target.depth() + 1,
            Expr::Unary { expr, .. } => expr.depth() + 1,
            Expr::Binary { left, right, .. } => left.depth().max(right.depth()) + 1,
        }
    }
}
