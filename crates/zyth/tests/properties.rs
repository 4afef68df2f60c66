//! Property tests over a small recursive strategy generating accepted-subset integer
//! expressions (§8/§9 ambient test tooling: "testable properties" exercised as
//! `proptest`s where the property quantifies over any AST in the accepted subset).

use proptest::prelude::*;
use zyth::{
    ast::{Expr, ExprKind, Literal, Operator, Range},
    infer::Inferrer,
    types::Type,
    vars::VarTracker,
};

fn int_literal(i: i64) -> Expr {
    Expr::new(Range::default(), ExprKind::Constant(Literal::Int(i)))
}

fn arithmetic_expr() -> impl Strategy<Value = Expr> {
    let leaf = any::<i16>().prop_map(|i| int_literal(i64::from(i)));
    leaf.prop_recursive(4, 64, 4, |inner| {
        (inner.clone(), arithmetic_op(), inner).prop_map(|(left, op, right)| {
            Expr::new(Range::default(), ExprKind::BinOp { left, op, right })
        })
    })
}

fn arithmetic_op() -> impl Strategy<Value = Operator> {
    prop_oneof![Just(Operator::Add), Just(Operator::Sub), Just(Operator::Mult)]
}

proptest! {
    /// Testable property 7: inferring an expression's type twice in a row yields the
    /// same result, because `infer_expr` never mutates the inferrer or the scope.
    #[test]
    fn type_inference_is_idempotent(expr in arithmetic_expr()) {
        let inferrer = Inferrer::new();
        let vars = VarTracker::new();
        let first = inferrer.infer_expr(&expr, &vars);
        let second = inferrer.infer_expr(&expr, &vars);
        prop_assert_eq!(first, second);
    }

    /// Any all-integer arithmetic expression built only from `+`, `-`, `*` infers to `Int`.
    #[test]
    fn all_int_arithmetic_infers_to_int(expr in arithmetic_expr()) {
        let inferrer = Inferrer::new();
        let vars = VarTracker::new();
        prop_assert_eq!(inferrer.infer_expr(&expr, &vars), Type::Int);
    }

    /// Constant-folding an all-integer arithmetic expression never panics and, when it
    /// succeeds, produces a value whose inferred type matches the folded value's type.
    #[test]
    fn constant_fold_agrees_with_inference(expr in arithmetic_expr()) {
        let inferrer = Inferrer::new();
        let vars = VarTracker::new();
        let inferred = inferrer.infer_expr(&expr, &vars);
        if let Some(folded) = zyth::comptime::eval_const(&expr) {
            prop_assert_eq!(folded.type_of(), inferred);
        }
    }
}
