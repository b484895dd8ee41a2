use std::cmp::Ordering;

use indexmap::IndexMap;
use smol_str::SmolStr;
use tprobe_core::Value;

use crate::error::HostError;
use crate::value::HostValue;

use super::ast::{BinaryOp, Expr, UnaryOp};

/// Evaluate `expr` against the variables of one frame.
pub fn evaluate(
    expr: &Expr,
    scope: &IndexMap<SmolStr, HostValue>,
) -> Result<HostValue, HostError> {
    match expr {
        Expr::Literal(value) => Ok(HostValue::Scalar(value.clone())),
        Expr::Name(name) => scope
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::UndefinedName(name.clone())),
        Expr::Member {
            target,
            field,
            deref,
        } => {
            let target = evaluate(target, scope)?;
            member(target, field, *deref)
        }
        Expr::Unary { op, expr } => {
            let value = evaluate(expr, scope)?.to_value();
            unary(*op, &value).map(HostValue::Scalar)
        }
        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => {
            let result = evaluate(left, scope)?.to_value().is_truthy()
                && evaluate(right, scope)?.to_value().is_truthy();
            Ok(HostValue::Scalar(Value::Bool(result)))
        }
        Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => {
            let result = evaluate(left, scope)?.to_value().is_truthy()
                || evaluate(right, scope)?.to_value().is_truthy();
            Ok(HostValue::Scalar(Value::Bool(result)))
        }
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, scope)?.to_value();
            let right = evaluate(right, scope)?.to_value();
            binary(*op, &left, &right).map(HostValue::Scalar)
        }
    }
}

fn member(target: HostValue, field: &SmolStr, deref: bool) -> Result<HostValue, HostError> {
    let record = match (target, deref) {
        (HostValue::Pointer { address: 0, .. } | HostValue::Scalar(Value::Null), true) => {
            return Err(HostError::NullDereference)
        }
        (HostValue::Pointer { address, target }, true) => match target {
            Some(target) => *target,
            None => return Err(HostError::UncapturedTarget(address)),
        },
        (record @ HostValue::Record { .. }, false) => record,
        (other, _) => return Err(HostError::BadMemberAccess(other.type_name())),
    };
    match record {
        HostValue::Record {
            type_name,
            mut fields,
        } => fields
            .swap_remove(field)
            .ok_or_else(|| HostError::NoMember {
                type_name,
                field: field.clone(),
            }),
        other => Err(HostError::BadMemberAccess(other.type_name())),
    }
}

fn unary(op: UnaryOp, value: &Value) -> Result<Value, HostError> {
    match (op, value) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnaryOp::Neg, Value::Int(value)) => {
            value.checked_neg().map(Value::Int).ok_or(HostError::Overflow)
        }
        (UnaryOp::Neg, Value::Float(value)) => Ok(Value::Float(-value)),
        (UnaryOp::Neg, other) => Err(HostError::InvalidOperand {
            op: SmolStr::new_inline("-"),
            operand: other.type_name().into(),
        }),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, HostError> {
    match op {
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            compare(op, left, right)
        }
        _ => arithmetic(op, left, right),
    }
}

fn mismatch(left: &Value, right: &Value) -> HostError {
    HostError::TypeMismatch {
        left: left.type_name().into(),
        right: right.type_name().into(),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, HostError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            if b == 0 && matches!(op, BinaryOp::Div | BinaryOp::Mod) {
                return Err(HostError::DivisionByZero);
            }
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div => a.checked_div(b),
                BinaryOp::Mod => a.checked_rem(b),
                _ => return Err(mismatch(left, right)),
            };
            result.map(Value::Int).ok_or(HostError::Overflow)
        }
        (Value::Address(base), Value::Int(offset))
            if matches!(op, BinaryOp::Add | BinaryOp::Sub) =>
        {
            let offset = if op == BinaryOp::Add {
                *offset
            } else {
                offset.checked_neg().ok_or(HostError::Overflow)?
            };
            base.checked_add_signed(offset)
                .map(Value::Address)
                .ok_or(HostError::Overflow)
        }
        (Value::Address(a), Value::Address(b)) if op == BinaryOp::Sub => {
            i64::try_from(i128::from(*a) - i128::from(*b))
                .map(Value::Int)
                .map_err(|_| HostError::Overflow)
        }
        _ => {
            let (Some(a), Some(b)) = (as_float(left), as_float(right)) else {
                return Err(mismatch(left, right));
            };
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Mod => a % b,
                _ => return Err(mismatch(left, right)),
            };
            Ok(Value::Float(result))
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(value) => Some(*value as f64),
        Value::Float(value) => Some(*value),
        _ => None,
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, HostError> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Address(a), Value::Address(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Address(a), Value::Null) => Some(a.cmp(&0)),
        (Value::Null, Value::Address(b)) => Some(0.cmp(b)),
        _ => {
            let (Some(a), Some(b)) = (as_float(left), as_float(right)) else {
                return Err(mismatch(left, right));
            };
            a.partial_cmp(&b)
        }
    };
    // NaN compares unequal to everything.
    let result = match (op, ordering) {
        (BinaryOp::Ne, None) => true,
        (_, None) => false,
        (BinaryOp::Eq, Some(ordering)) => ordering == Ordering::Equal,
        (BinaryOp::Ne, Some(ordering)) => ordering != Ordering::Equal,
        (BinaryOp::Lt, Some(ordering)) => ordering == Ordering::Less,
        (BinaryOp::Le, Some(ordering)) => ordering != Ordering::Greater,
        (BinaryOp::Gt, Some(ordering)) => ordering == Ordering::Greater,
        (BinaryOp::Ge, Some(ordering)) => ordering != Ordering::Less,
        _ => return Err(mismatch(left, right)),
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::expr::parse_expression;

    fn scope() -> IndexMap<SmolStr, HostValue> {
        let frame = json!({
            "count": 3,
            "ratio": 0.5,
            "name": "left",
            "this": { "$ptr": "0x1000", "$target": { "$type": "Segment", "mid": 4, "next": { "$ptr": 0 } } },
            "opaque": { "$ptr": "0x2000" },
            "seg": { "$type": "Segment", "mid": 9 }
        });
        let serde_json::Value::Object(object) = frame else {
            unreachable!()
        };
        object
            .into_iter()
            .map(|(name, value)| (SmolStr::new(name), HostValue::from_json(value).unwrap()))
            .collect()
    }

    fn eval(source: &str) -> Result<Value, HostError> {
        let expr = parse_expression(source)?;
        evaluate(&expr, &scope()).map(|value| value.to_value())
    }

    #[test]
    fn arithmetic_and_members() {
        assert_eq!(eval("this -> mid"), Ok(Value::Int(4)));
        assert_eq!(eval("seg.mid - this->mid * 2"), Ok(Value::Int(1)));
        assert_eq!(eval("count + ratio"), Ok(Value::Float(3.5)));
        assert_eq!(eval("-count % 2"), Ok(Value::Int(-1)));
        assert_eq!(eval("this + 8"), Ok(Value::Address(0x1008)));
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(eval("count > 2 && name == \"left\""), Ok(Value::Bool(true)));
        assert_eq!(eval("this->next == nullptr"), Ok(Value::Bool(true)));
        assert_eq!(eval("!count || missing"), Err(HostError::UndefinedName("missing".into())));
        assert_eq!(eval("count == 3 || missing"), Ok(Value::Bool(true)));
    }

    #[test]
    fn evaluation_errors() {
        assert_eq!(eval("this.mid"), Err(HostError::BadMemberAccess("Segment *".into())));
        assert_eq!(eval("seg->mid"), Err(HostError::BadMemberAccess("Segment".into())));
        assert_eq!(eval("this->next->mid"), Err(HostError::NullDereference));
        assert_eq!(eval("opaque->mid"), Err(HostError::UncapturedTarget(0x2000)));
        assert_eq!(
            eval("seg.len"),
            Err(HostError::NoMember {
                type_name: "Segment".into(),
                field: "len".into()
            })
        );
        assert_eq!(eval("count / 0"), Err(HostError::DivisionByZero));
        assert_eq!(
            eval("name + 1"),
            Err(HostError::TypeMismatch {
                left: "text".into(),
                right: "int".into()
            })
        );
    }
}
