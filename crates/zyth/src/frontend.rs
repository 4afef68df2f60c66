//! AST lowering (§4.0, C0). Walks a `ruff_python_ast::ModModule` and produces an owned
//! [`crate::ast::Module`] whose shape is exactly the sum-type this crate's core consumes.
//! Everything downstream of [`lower_module`] only ever sees [`crate::ast`] types —
//! `ruff_python_ast` itself never leaks past this module, which keeps the parser
//! swappable the way `ouros`'s own `parse.rs` keeps its VM decoupled from ruff.

use ruff_python_ast::{self as rast, Expr as RExpr, Stmt as RStmt};
use ruff_text_size::Ranged;

use crate::{
    ast::{
        Alias, BoolOperator, ClassDef, CmpOp, Comprehension, Expr, ExprKind, FunctionDef, Keyword, Literal, Module,
        Operator, Param, Range, Stmt, StmtKind, Try, UnaryOperator, With, WithItem,
    },
    errors::{Component, Result, TranslateError},
};

pub fn lower_module(parsed: &rast::ModModule) -> Result<Module> {
    Ok(Module { body: lower_body(&parsed.body)? })
}

fn lower_body(body: &[RStmt]) -> Result<Vec<Stmt>> {
    body.iter().map(lower_stmt).collect()
}

fn not_implemented(what: &str) -> TranslateError {
    TranslateError::internal(Component::Lowering, format!("{what} is outside the accepted subset"))
}

fn lower_stmt(stmt: &RStmt) -> Result<Stmt> {
    let range = stmt.range();
    let kind = match stmt {
        RStmt::Assign(rast::StmtAssign { targets, value, .. }) => {
            StmtKind::Assign { targets: targets.iter().map(lower_expr).collect::<Result<_>>()?, value: lower_expr(value)? }
        }
        RStmt::AugAssign(rast::StmtAugAssign { target, op, value, .. }) => StmtKind::AugAssign {
            target: Box::new(lower_expr(target)?),
            op: lower_operator(*op),
            value: Box::new(lower_expr(value)?),
        },
        RStmt::AnnAssign(rast::StmtAnnAssign { target, annotation, value, .. }) => StmtKind::AnnAssign {
            target: Box::new(lower_expr(target)?),
            annotation: Box::new(lower_expr(annotation)?),
            value: value.as_deref().map(lower_expr).transpose()?.map(Box::new),
        },
        RStmt::If(rast::StmtIf { test, body, elif_else_clauses, .. }) => {
            StmtKind::If { test: lower_expr(test)?, body: lower_body(body)?, orelse: lower_elif_chain(elif_else_clauses)? }
        }
        RStmt::While(rast::StmtWhile { test, body, orelse, .. }) => {
            StmtKind::While { test: lower_expr(test)?, body: lower_body(body)?, orelse: lower_body(orelse)? }
        }
        RStmt::For(rast::StmtFor { target, iter, body, orelse, is_async, .. }) => {
            if *is_async {
                return Err(not_implemented("async for"));
            }
            StmtKind::For { target: lower_expr(target)?, iter: lower_expr(iter)?, body: lower_body(body)?, orelse: lower_body(orelse)? }
        }
        RStmt::FunctionDef(f) => StmtKind::FunctionDef(lower_function_def(f)?),
        RStmt::ClassDef(c) => StmtKind::ClassDef(lower_class_def(c)?),
        RStmt::Try(t) => StmtKind::Try(lower_try(t)?),
        RStmt::With(w) => StmtKind::With(lower_with(w)?),
        RStmt::Raise(rast::StmtRaise { exc, cause, .. }) => StmtKind::Raise {
            exc: exc.as_deref().map(lower_expr).transpose()?,
            cause: cause.as_deref().map(lower_expr).transpose()?,
        },
        RStmt::Return(rast::StmtReturn { value, .. }) => StmtKind::Return(value.as_deref().map(lower_expr).transpose()?),
        RStmt::Import(rast::StmtImport { names, .. }) => StmtKind::Import(lower_aliases(names)),
        RStmt::ImportFrom(rast::StmtImportFrom { module, names, level, .. }) => {
            StmtKind::ImportFrom { module: module.as_ref().map(ToString::to_string), names: lower_aliases(names), level: *level }
        }
        RStmt::Global(rast::StmtGlobal { names, .. }) => StmtKind::Global(names.iter().map(ToString::to_string).collect()),
        RStmt::Delete(rast::StmtDelete { targets, .. }) => StmtKind::Del(targets.iter().map(lower_expr).collect::<Result<_>>()?),
        RStmt::Assert(rast::StmtAssert { test, msg, .. }) => {
            StmtKind::Assert { test: lower_expr(test)?, msg: msg.as_deref().map(lower_expr).transpose()? }
        }
        RStmt::Expr(rast::StmtExpr { value, .. }) => StmtKind::ExprStmt(lower_expr(value)?),
        RStmt::Pass(_) => StmtKind::Pass,
        RStmt::Break(_) => StmtKind::Break,
        RStmt::Continue(_) => StmtKind::Continue,
        RStmt::Nonlocal(_) => return Err(not_implemented("nonlocal")),
        RStmt::Match(_) => return Err(not_implemented("match statements")),
        RStmt::TypeAlias(_) => return Err(not_implemented("PEP 695 type aliases")),
        RStmt::IpyEscapeCommand(_) => return Err(not_implemented("IPython escape commands")),
    };
    Ok(Stmt::new(range, kind))
}

fn lower_elif_chain(clauses: &[rast::ElifElseClause]) -> Result<Vec<Stmt>> {
    let Some((first, rest)) = clauses.split_first() else { return Ok(Vec::new()) };
    match &first.test {
        Some(test) => {
            let range = first.range();
            Ok(vec![Stmt::new(
                range,
                StmtKind::If { test: lower_expr(test)?, body: lower_body(&first.body)?, orelse: lower_elif_chain(rest)? },
            )])
        }
        None => lower_body(&first.body),
    }
}

fn lower_aliases(names: &[rast::Alias]) -> Vec<Alias> {
    names.iter().map(|a| Alias { name: a.name.to_string(), asname: a.asname.as_ref().map(ToString::to_string) }).collect()
}

fn lower_function_def(f: &rast::StmtFunctionDef) -> Result<FunctionDef> {
    if f.is_async {
        return Err(not_implemented("async def"));
    }
    let mut params = Vec::new();
    for p in f.parameters.iter_non_variadic_params() {
        params.push(Param {
            name: p.parameter.name.to_string(),
            annotation: p.parameter.annotation.as_deref().map(lower_expr).transpose()?,
            default: p.default.as_deref().map(lower_expr).transpose()?,
        });
    }
    Ok(FunctionDef {
        name: f.name.to_string(),
        params,
        returns: f.returns.as_deref().map(lower_expr).transpose()?,
        body: lower_body(&f.body)?,
        is_async: f.is_async,
        decorators: f.decorator_list.iter().map(|d| lower_expr(&d.expression)).collect::<Result<_>>()?,
    })
}

fn lower_class_def(c: &rast::StmtClassDef) -> Result<ClassDef> {
    let bases = c
        .arguments
        .as_deref()
        .map(|a| a.args.iter().map(lower_expr).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();
    Ok(ClassDef { name: c.name.to_string(), bases, body: lower_body(&c.body)? })
}

fn lower_try(t: &rast::StmtTry) -> Result<Try> {
    if t.is_star {
        return Err(not_implemented("except*"));
    }
    let mut handlers = Vec::with_capacity(t.handlers.len());
    for handler in &t.handlers {
        let rast::ExceptHandler::ExceptHandler(h) = handler;
        handlers.push(crate::ast::ExceptHandler {
            exc_type: h.type_.as_deref().map(lower_expr).transpose()?,
            name: h.name.as_ref().map(ToString::to_string),
            body: lower_body(&h.body)?,
        });
    }
    Ok(Try { body: lower_body(&t.body)?, handlers, orelse: lower_body(&t.orelse)?, finalbody: lower_body(&t.finalbody)? })
}

fn lower_with(w: &rast::StmtWith) -> Result<With> {
    if w.is_async {
        return Err(not_implemented("async with"));
    }
    let mut items = Vec::with_capacity(w.items.len());
    for item in &w.items {
        items.push(WithItem {
            context_expr: lower_expr(&item.context_expr)?,
            optional_vars: item.optional_vars.as_deref().map(lower_expr).transpose()?,
        });
    }
    Ok(With { items, body: lower_body(&w.body)? })
}

fn lower_operator(op: rast::Operator) -> Operator {
    match op {
        rast::Operator::Add => Operator::Add,
        rast::Operator::Sub => Operator::Sub,
        rast::Operator::Mult => Operator::Mult,
        rast::Operator::Div => Operator::Div,
        rast::Operator::FloorDiv => Operator::FloorDiv,
        rast::Operator::Mod => Operator::Mod,
        rast::Operator::Pow => Operator::Pow,
        rast::Operator::LShift => Operator::LShift,
        rast::Operator::RShift => Operator::RShift,
        rast::Operator::BitOr => Operator::BitOr,
        rast::Operator::BitXor => Operator::BitXor,
        rast::Operator::BitAnd => Operator::BitAnd,
        rast::Operator::MatMult => Operator::MatMult,
    }
}

fn lower_unary(op: rast::UnaryOp) -> UnaryOperator {
    match op {
        rast::UnaryOp::Invert => UnaryOperator::Invert,
        rast::UnaryOp::Not => UnaryOperator::Not,
        rast::UnaryOp::UAdd => UnaryOperator::UAdd,
        rast::UnaryOp::USub => UnaryOperator::USub,
    }
}

fn lower_bool_op(op: rast::BoolOp) -> BoolOperator {
    match op {
        rast::BoolOp::And => BoolOperator::And,
        rast::BoolOp::Or => BoolOperator::Or,
    }
}

fn lower_cmp_op(op: rast::CmpOp) -> CmpOp {
    match op {
        rast::CmpOp::Eq => CmpOp::Eq,
        rast::CmpOp::NotEq => CmpOp::NotEq,
        rast::CmpOp::Lt => CmpOp::Lt,
        rast::CmpOp::LtE => CmpOp::LtE,
        rast::CmpOp::Gt => CmpOp::Gt,
        rast::CmpOp::GtE => CmpOp::GtE,
        rast::CmpOp::Is => CmpOp::Is,
        rast::CmpOp::IsNot => CmpOp::IsNot,
        rast::CmpOp::In => CmpOp::In,
        rast::CmpOp::NotIn => CmpOp::NotIn,
    }
}

fn lower_expr(expr: &RExpr) -> Result<Expr> {
    let range = expr.range();
    let kind = match expr {
        RExpr::Name(rast::ExprName { id, .. }) => ExprKind::Name(id.to_string()),
        RExpr::NoneLiteral(_) => ExprKind::Constant(Literal::None),
        RExpr::BooleanLiteral(rast::ExprBooleanLiteral { value, .. }) => ExprKind::Constant(Literal::Bool(*value)),
        RExpr::EllipsisLiteral(_) => ExprKind::Ellipsis,
        RExpr::StringLiteral(rast::ExprStringLiteral { value, .. }) => ExprKind::Constant(Literal::Str(value.to_string())),
        RExpr::NumberLiteral(rast::ExprNumberLiteral { value, .. }) => match value {
            rast::Number::Int(i) => ExprKind::Constant(Literal::Int(i.as_i64().ok_or_else(|| not_implemented("integer literal wider than i64"))?)),
            rast::Number::Float(f) => ExprKind::Constant(Literal::Float(*f)),
            rast::Number::Complex { .. } => return Err(not_implemented("complex literals")),
        },
        RExpr::BytesLiteral(_) => return Err(not_implemented("bytes literals")),
        RExpr::FString(_) | RExpr::TString(_) => return Err(not_implemented("interpolated strings")),
        RExpr::Call(rast::ExprCall { func, arguments, .. }) => {
            if arguments.args.iter().any(|a| matches!(a, RExpr::Starred(_))) {
                return Err(not_implemented("*args call expansion"));
            }
            ExprKind::Call {
                func: lower_expr(func)?,
                args: arguments.args.iter().map(lower_expr).collect::<Result<_>>()?,
                keywords: arguments
                    .keywords
                    .iter()
                    .map(|k| Ok(Keyword { arg: k.arg.as_ref().map(ToString::to_string), value: lower_expr(&k.value)? }))
                    .collect::<Result<_>>()?,
            }
        }
        RExpr::Attribute(rast::ExprAttribute { value, attr, .. }) => ExprKind::Attribute { value: lower_expr(value)?, attr: attr.to_string() },
        RExpr::Subscript(rast::ExprSubscript { value, slice, .. }) => ExprKind::Subscript { value: lower_expr(value)?, index: lower_expr(slice)? },
        RExpr::Slice(rast::ExprSlice { lower, upper, step, .. }) => ExprKind::Slice {
            lower: lower.as_deref().map(lower_expr).transpose()?,
            upper: upper.as_deref().map(lower_expr).transpose()?,
            step: step.as_deref().map(lower_expr).transpose()?,
        },
        RExpr::BinOp(rast::ExprBinOp { left, op, right, .. }) => {
            ExprKind::BinOp { left: lower_expr(left)?, op: lower_operator(*op), right: lower_expr(right)? }
        }
        RExpr::UnaryOp(rast::ExprUnaryOp { op, operand, .. }) => ExprKind::UnaryOp { op: lower_unary(*op), operand: lower_expr(operand)? },
        RExpr::BoolOp(rast::ExprBoolOp { op, values, .. }) => {
            ExprKind::BoolOp { op: lower_bool_op(*op), values: values.iter().map(lower_expr).collect::<Result<_>>()? }
        }
        RExpr::Compare(rast::ExprCompare { left, ops, comparators, .. }) => ExprKind::Compare {
            left: lower_expr(left)?,
            ops: ops.iter().map(|o| lower_cmp_op(*o)).collect(),
            comparators: comparators.iter().map(lower_expr).collect::<Result<_>>()?,
        },
        RExpr::If(rast::ExprIf { test, body, orelse, .. }) => {
            ExprKind::IfExpr { test: lower_expr(test)?, body: lower_expr(body)?, orelse: lower_expr(orelse)? }
        }
        RExpr::Lambda(rast::ExprLambda { parameters, body, .. }) => ExprKind::Lambda {
            params: parameters.iter().flat_map(|ps| ps.iter_non_variadic_params()).map(|p| p.parameter.name.to_string()).collect(),
            body: lower_expr(body)?,
        },
        RExpr::List(rast::ExprList { elts, .. }) => ExprKind::List(elts.iter().map(lower_expr).collect::<Result<_>>()?),
        RExpr::Tuple(rast::ExprTuple { elts, .. }) => ExprKind::Tuple(elts.iter().map(lower_expr).collect::<Result<_>>()?),
        RExpr::Set(rast::ExprSet { elts, .. }) => ExprKind::Set(elts.iter().map(lower_expr).collect::<Result<_>>()?),
        RExpr::Dict(rast::ExprDict { items, .. }) => ExprKind::Dict(
            items
                .iter()
                .map(|item| Ok((item.key.as_ref().map(lower_expr).transpose()?, lower_expr(&item.value)?)))
                .collect::<Result<_>>()?,
        ),
        RExpr::ListComp(rast::ExprListComp { elt, generators, .. }) => {
            ExprKind::ListComp { element: lower_expr(elt)?, generators: lower_generators(generators)? }
        }
        RExpr::SetComp(rast::ExprSetComp { elt, generators, .. }) => {
            ExprKind::SetComp { element: lower_expr(elt)?, generators: lower_generators(generators)? }
        }
        RExpr::Generator(rast::ExprGenerator { elt, generators, .. }) => {
            ExprKind::GeneratorExp { element: lower_expr(elt)?, generators: lower_generators(generators)? }
        }
        RExpr::DictComp(rast::ExprDictComp { key, value, generators, .. }) => {
            ExprKind::DictComp { key: lower_expr(key)?, value: lower_expr(value)?, generators: lower_generators(generators)? }
        }
        RExpr::Named(rast::ExprNamed { target, value, .. }) => {
            let target_expr = lower_expr(target)?;
            let ExprKind::Name(name) = *target_expr.kind else {
                return Err(not_implemented("walrus target that is not a bare name"));
            };
            ExprKind::NamedExpr { target: name, value: lower_expr(value)? }
        }
        RExpr::Starred(rast::ExprStarred { value, .. }) => ExprKind::Starred(lower_expr(value)?),
        RExpr::Await(rast::ExprAwait { value, .. }) => ExprKind::Await(lower_expr(value)?),
        RExpr::Yield(_) | RExpr::YieldFrom(_) => return Err(not_implemented("generator yield")),
        RExpr::IpyEscapeCommand(_) => return Err(not_implemented("IPython escape commands")),
    };
    Ok(Expr::new(range, kind))
}

fn lower_generators(generators: &[rast::Comprehension]) -> Result<Vec<Comprehension>> {
    generators
        .iter()
        .map(|g| {
            if g.is_async {
                return Err(not_implemented("async comprehension"));
            }
            Ok(Comprehension { target: lower_expr(&g.target)?, iter: lower_expr(&g.iter)?, ifs: g.ifs.iter().map(lower_expr).collect::<Result<_>>()? })
        })
        .collect()
}
