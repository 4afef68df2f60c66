//! Type inferrer (§4.1, C1). `infer_expr` is a pure function over the AST shape; it is
//! idempotent (§8 property 7) because it only ever reads already-recorded function/class
//! signatures and the current binding table — it never mutates either while inferring.

use indexmap::IndexMap;

use crate::{
    ast::{BoolOperator, CmpOp, Expr, ExprKind, Literal, Operator},
    builtins,
    types::{ClassInfo, FunctionSig, Type},
    vars::VarTracker,
};

/// Owns the recorded function/class signatures the inferrer consults (§4.1).
#[derive(Debug, Default)]
pub struct Inferrer {
    functions: IndexMap<String, FunctionSig>,
    classes: IndexMap<String, ClassInfo>,
}

impl Inferrer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_function(&mut self, sig: FunctionSig) {
        self.functions.insert(sig.name.clone(), sig);
    }

    pub fn record_class_fields(&mut self, info: ClassInfo) {
        self.classes.insert(info.name.clone(), info);
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSig> {
        self.functions.get(name)
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut ClassInfo> {
        self.classes.get_mut(name)
    }

    /// Infers the type of `expr` given the current variable scope. Pure: never mutates
    /// `vars`, `self.functions`, or `self.classes`.
    pub fn infer_expr(&self, expr: &Expr, vars: &VarTracker) -> Type {
        match expr.kind.as_ref() {
            ExprKind::Constant(lit) => Self::literal_type(lit),
            ExprKind::Name(name) => vars.binding(name).map_or(Type::Unknown, |b| b.ty.clone()),
            ExprKind::BinOp { left, op, right } => self.infer_binop(left, *op, right, vars),
            ExprKind::UnaryOp { op, operand } => self.infer_unaryop(*op, operand, vars),
            ExprKind::BoolOp { .. } | ExprKind::Compare { .. } => Type::Bool,
            ExprKind::IfExpr { body, orelse, .. } => {
                self.infer_expr(body, vars).join(&self.infer_expr(orelse, vars))
            }
            ExprKind::List(elems) => self.infer_sequence_literal(elems, vars, Type::list_of),
            ExprKind::Tuple(elems) => Type::Tuple(elems.iter().map(|e| self.infer_expr(e, vars)).collect()),
            ExprKind::Set(elems) => self.infer_sequence_literal(elems, vars, Type::list_of),
            ExprKind::Dict(items) => self.infer_dict_literal(items, vars),
            ExprKind::ListComp { element, .. } => Type::list_of(self.infer_expr(element, vars)),
            ExprKind::SetComp { element, .. } => Type::list_of(self.infer_expr(element, vars)),
            ExprKind::GeneratorExp { element, .. } => Type::list_of(self.infer_expr(element, vars)),
            ExprKind::DictComp { key, value, .. } => {
                Type::dict_of(self.infer_expr(key, vars), self.infer_expr(value, vars))
            }
            ExprKind::Subscript { value, index } => self.infer_subscript(value, index, vars),
            ExprKind::Slice { .. } => Type::Unknown,
            ExprKind::Attribute { value, attr } => self.infer_attribute(value, attr, vars),
            ExprKind::Call { func, .. } => self.infer_call(func, vars),
            ExprKind::Lambda { .. } => Type::Closure(0),
            ExprKind::NamedExpr { value, .. } => self.infer_expr(value, vars),
            ExprKind::Starred(inner) | ExprKind::Await(inner) => self.infer_expr(inner, vars),
            ExprKind::Ellipsis => Type::None,
        }
    }

    fn literal_type(lit: &Literal) -> Type {
        match lit {
            Literal::Int(_) => Type::Int,
            Literal::Float(_) => Type::Float,
            Literal::Bool(_) => Type::Bool,
            Literal::Str(_) => Type::String,
            Literal::None => Type::None,
        }
    }

    fn infer_binop(&self, left: &Expr, op: Operator, right: &Expr, vars: &VarTracker) -> Type {
        let lt = self.infer_expr(left, vars);
        let rt = self.infer_expr(right, vars);
        if op == Operator::Add && (lt == Type::String || rt == Type::String) {
            return Type::String;
        }
        if op == Operator::Add {
            if let (Type::List(a), Type::List(_)) = (&lt, &rt) {
                return Type::list_of((**a).clone());
            }
        }
        if op == Operator::Mult {
            if let (Type::List(a), Type::Int) | (Type::Int, Type::List(a)) = (&lt, &rt) {
                return Type::list_of((**a).clone());
            }
        }
        match (lt, rt) {
            (Type::Int, Type::Int) => Type::Int,
            (Type::Float, other) | (other, Type::Float) if other.is_numeric() => Type::Float,
            _ => Type::Unknown,
        }
    }

    fn infer_unaryop(&self, op: crate::ast::UnaryOperator, operand: &Expr, vars: &VarTracker) -> Type {
        use crate::ast::UnaryOperator as U;
        match op {
            U::Not => Type::Bool,
            U::USub | U::UAdd => {
                let t = self.infer_expr(operand, vars);
                if t.is_numeric() { t } else { Type::Unknown }
            }
            U::Invert => Type::Int,
        }
    }

    /// Empty ⇒ `List(Int)` by default; non-empty homogeneous ⇒ `List(T)`; mixed ⇒ widen
    /// via `Type::join`, which degrades to `Unknown` for incompatible pairs (§4.1).
    fn infer_sequence_literal(&self, elems: &[Expr], vars: &VarTracker, wrap: fn(Type) -> Type) -> Type {
        let mut iter = elems.iter().map(|e| self.infer_expr(e, vars));
        let Some(first) = iter.next() else {
            return wrap(Type::Int);
        };
        let joined = iter.fold(first, |acc, t| acc.join(&t));
        wrap(joined)
    }

    fn infer_dict_literal(&self, items: &[(Option<Expr>, Expr)], vars: &VarTracker) -> Type {
        let mut key_ty: Option<Type> = None;
        let mut val_ty: Option<Type> = None;
        for (k, v) in items {
            let Some(k) = k else { continue }; // `**unpack` entry widens to Unknown below
            let kt = self.infer_expr(k, vars);
            let vt = self.infer_expr(v, vars);
            key_ty = Some(key_ty.map_or(kt.clone(), |acc| acc.join(&kt)));
            val_ty = Some(val_ty.map_or(vt.clone(), |acc| acc.join(&vt)));
        }
        match (key_ty, val_ty) {
            (Some(k), Some(v)) if items.iter().all(|(k, _)| k.is_some()) => Type::dict_of(k, v),
            _ => Type::dict_of(Type::Unknown, Type::Unknown),
        }
    }

    fn infer_subscript(&self, value: &Expr, _index: &Expr, vars: &VarTracker) -> Type {
        match self.infer_expr(value, vars) {
            Type::List(t) | Type::Array(t, _) => *t,
            Type::Dict(_, v) => *v,
            Type::Tuple(elems) => elems.first().cloned().unwrap_or(Type::Unknown),
            Type::String => Type::String,
            _ => Type::Unknown,
        }
    }

    fn infer_attribute(&self, value: &Expr, attr: &str, vars: &VarTracker) -> Type {
        if let Type::ClassInstance(name) = self.infer_expr(value, vars) {
            if let Some(info) = self.classes.get(&name) {
                return info.fields.get(attr).cloned().unwrap_or(Type::Unknown);
            }
        }
        Type::Unknown
    }

    fn infer_call(&self, func: &Expr, vars: &VarTracker) -> Type {
        if let ExprKind::Name(name) = func.kind.as_ref() {
            if let Some(sig) = self.functions.get(name) {
                return sig.return_type.clone();
            }
            if let Some(info) = self.classes.get(name) {
                return Type::ClassInstance(info.name.clone());
            }
            if let Some(ty) = builtins::builtin_return_type(name) {
                return ty;
            }
        }
        if let ExprKind::Attribute { value, attr } = func.kind.as_ref() {
            if let ExprKind::Name(module) = value.kind.as_ref() {
                if let Some(ty) = builtins::module_function_return_type(module, attr) {
                    return ty;
                }
            }
        }
        Type::Unknown
    }
}

/// Chained comparisons `a < b < c` fold to `(a < b) and (b < c)` with the middle
/// operand evaluated once (§4.5 Comparison). The inferrer doesn't need the temp
/// binding itself (C6 emits it); it only needs to know the result type, which is
/// always `Bool` for any non-empty `ops` list.
pub fn comparison_result_type(ops: &[CmpOp]) -> Type {
    debug_assert!(!ops.is_empty());
    Type::Bool
}

pub fn bool_op_result_type(_op: BoolOperator) -> Type {
    Type::Bool
}
