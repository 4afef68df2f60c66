//! Compile-time constant evaluator (§4.3, C3). Folds closed-form expressions over
//! literals and pure arithmetic/comparison/boolean/unary operators into a
//! [`ComptimeValue`]. Returns `None` rather than a partial result on anything it can't
//! fully fold, including division by zero.

use crate::{
    ast::{BoolOperator, CmpOp, Expr, ExprKind, Literal, Operator, UnaryOperator},
    types::ComptimeValue,
};

pub fn eval_const(expr: &Expr) -> Option<ComptimeValue> {
    match expr.kind.as_ref() {
        ExprKind::Constant(lit) => eval_literal(lit),
        ExprKind::UnaryOp { op, operand } => eval_unary(*op, eval_const(operand)?),
        ExprKind::BinOp { left, op, right } => eval_binop(eval_const(left)?, *op, eval_const(right)?),
        ExprKind::BoolOp { op, values } => eval_bool_op(*op, values),
        ExprKind::Compare { left, ops, comparators } => eval_compare(left, ops, comparators),
        ExprKind::Tuple(elems) | ExprKind::List(elems) => {
            let mut out = Vec::with_capacity(elems.len());
            for e in elems {
                out.push(eval_const(e)?);
            }
            Some(ComptimeValue::List(out))
        }
        _ => None,
    }
}

fn eval_literal(lit: &Literal) -> Option<ComptimeValue> {
    match lit {
        Literal::Int(i) => Some(ComptimeValue::Int(*i)),
        Literal::Float(f) => Some(ComptimeValue::Float(*f)),
        Literal::Bool(b) => Some(ComptimeValue::Bool(*b)),
        Literal::Str(s) => Some(ComptimeValue::String(s.as_bytes().to_vec())),
        Literal::None => None,
    }
}

fn eval_unary(op: UnaryOperator, value: ComptimeValue) -> Option<ComptimeValue> {
    match (op, value) {
        (UnaryOperator::Not, v) => Some(ComptimeValue::Bool(!truthy(&v))),
        (UnaryOperator::USub, ComptimeValue::Int(i)) => Some(ComptimeValue::Int(-i)),
        (UnaryOperator::USub, ComptimeValue::Float(f)) => Some(ComptimeValue::Float(-f)),
        (UnaryOperator::UAdd, v @ (ComptimeValue::Int(_) | ComptimeValue::Float(_))) => Some(v),
        (UnaryOperator::Invert, ComptimeValue::Int(i)) => Some(ComptimeValue::Int(!i)),
        _ => None,
    }
}

fn truthy(v: &ComptimeValue) -> bool {
    match v {
        ComptimeValue::Int(i) => *i != 0,
        ComptimeValue::Float(f) => *f != 0.0,
        ComptimeValue::Bool(b) => *b,
        ComptimeValue::String(s) => !s.is_empty(),
        ComptimeValue::List(items) => !items.is_empty(),
    }
}

fn as_f64(v: &ComptimeValue) -> Option<f64> {
    match v {
        ComptimeValue::Int(i) => Some(*i as f64),
        ComptimeValue::Float(f) => Some(*f),
        ComptimeValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn as_i64(v: &ComptimeValue) -> Option<i64> {
    match v {
        ComptimeValue::Int(i) => Some(*i),
        ComptimeValue::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// String concatenation folds at this layer so the inferrer can answer "is this
/// expression constant", but per §4.3 it is never emitted as a constant — the emitter
/// re-generates the runtime concat path (§4.6.1 step 7) regardless.
fn eval_binop(left: ComptimeValue, op: Operator, right: ComptimeValue) -> Option<ComptimeValue> {
    if let (ComptimeValue::String(a), Operator::Add, ComptimeValue::String(b)) = (&left, op, &right) {
        let mut out = a.clone();
        out.extend_from_slice(b);
        return Some(ComptimeValue::String(out));
    }

    if let (Some(a), Some(b)) = (as_i64(&left), as_i64(&right)) {
        if matches!(left, ComptimeValue::Int(_) | ComptimeValue::Bool(_)) && matches!(right, ComptimeValue::Int(_) | ComptimeValue::Bool(_)) {
            return eval_int_binop(a, op, b);
        }
    }

    let (Some(a), Some(b)) = (as_f64(&left), as_f64(&right)) else { return None };
    eval_float_binop(a, op, b)
}

fn eval_int_binop(a: i64, op: Operator, b: i64) -> Option<ComptimeValue> {
    match op {
        Operator::Add => Some(ComptimeValue::Int(a.wrapping_add(b))),
        Operator::Sub => Some(ComptimeValue::Int(a.wrapping_sub(b))),
        Operator::Mult => Some(ComptimeValue::Int(a.wrapping_mul(b))),
        Operator::FloorDiv => (b != 0).then(|| ComptimeValue::Int(a.div_euclid(b))),
        Operator::Mod => (b != 0).then(|| ComptimeValue::Int(a.rem_euclid(b))),
        Operator::Div => (b != 0).then(|| ComptimeValue::Float(a as f64 / b as f64)),
        Operator::Pow => u32::try_from(b).ok().map(|e| ComptimeValue::Int(a.pow(e))),
        Operator::BitOr => Some(ComptimeValue::Int(a | b)),
        Operator::BitXor => Some(ComptimeValue::Int(a ^ b)),
        Operator::BitAnd => Some(ComptimeValue::Int(a & b)),
        Operator::LShift => u32::try_from(b).ok().map(|s| ComptimeValue::Int(a.wrapping_shl(s))),
        Operator::RShift => u32::try_from(b).ok().map(|s| ComptimeValue::Int(a.wrapping_shr(s))),
        Operator::MatMult => None,
    }
}

fn eval_float_binop(a: f64, op: Operator, b: f64) -> Option<ComptimeValue> {
    match op {
        Operator::Add => Some(ComptimeValue::Float(a + b)),
        Operator::Sub => Some(ComptimeValue::Float(a - b)),
        Operator::Mult => Some(ComptimeValue::Float(a * b)),
        Operator::Div => (b != 0.0).then(|| ComptimeValue::Float(a / b)),
        Operator::FloorDiv => (b != 0.0).then(|| ComptimeValue::Float((a / b).floor())),
        Operator::Mod => (b != 0.0).then(|| ComptimeValue::Float(a.rem_euclid(b))),
        Operator::Pow => Some(ComptimeValue::Float(a.powf(b))),
        _ => None,
    }
}

fn eval_bool_op(op: BoolOperator, values: &[Expr]) -> Option<ComptimeValue> {
    let mut result = None;
    for value in values {
        let v = eval_const(value)?;
        let t = truthy(&v);
        result = Some(v);
        match op {
            BoolOperator::And if !t => return result,
            BoolOperator::Or if t => return result,
            _ => {}
        }
    }
    result
}

fn eval_compare(left: &Expr, ops: &[CmpOp], comparators: &[Expr]) -> Option<ComptimeValue> {
    let mut prev = eval_const(left)?;
    for (op, next_expr) in ops.iter().zip(comparators) {
        let next = eval_const(next_expr)?;
        if !eval_cmp(&prev, *op, &next)? {
            return Some(ComptimeValue::Bool(false));
        }
        prev = next;
    }
    Some(ComptimeValue::Bool(true))
}

fn eval_cmp(a: &ComptimeValue, op: CmpOp, b: &ComptimeValue) -> Option<bool> {
    let ordering = match (a, b) {
        (ComptimeValue::String(x), ComptimeValue::String(y)) => x.partial_cmp(y)?,
        _ => as_f64(a)?.partial_cmp(&as_f64(b)?)?,
    };
    Some(match op {
        CmpOp::Eq => ordering.is_eq(),
        CmpOp::NotEq => !ordering.is_eq(),
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::LtE => ordering.is_le(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::GtE => ordering.is_ge(),
        CmpOp::Is | CmpOp::IsNot | CmpOp::In | CmpOp::NotIn => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Range;

    fn lit(l: Literal) -> Expr {
        Expr::new(Range::default(), ExprKind::Constant(l))
    }

    #[test]
    fn folds_arithmetic() {
        let expr = Expr::new(
            Range::default(),
            ExprKind::BinOp {
                left: lit(Literal::Int(2)),
                op: Operator::Add,
                right: Expr::new(
                    Range::default(),
                    ExprKind::BinOp { left: lit(Literal::Int(3)), op: Operator::Mult, right: lit(Literal::Int(4)) },
                ),
            },
        );
        assert_eq!(eval_const(&expr), Some(ComptimeValue::Int(14)));
    }

    #[test]
    fn division_by_zero_yields_none() {
        let expr = Expr::new(
            Range::default(),
            ExprKind::BinOp { left: lit(Literal::Int(10)), op: Operator::FloorDiv, right: lit(Literal::Int(0)) },
        );
        assert_eq!(eval_const(&expr), None);
    }

    #[test]
    fn string_concat_is_foldable_but_not_emittable() {
        let expr = Expr::new(
            Range::default(),
            ExprKind::BinOp {
                left: lit(Literal::Str("a".into())),
                op: Operator::Add,
                right: lit(Literal::Str("b".into())),
            },
        );
        let folded = eval_const(&expr).unwrap();
        assert!(!folded.is_emittable_constant());
    }
}
