//! Mutation / lifetime analyzer (§4.2, C2). A preliminary pass over the AST executed
//! before the statement walk begins, so C7 can ask "is this binding ever mutated" and
//! "is it captured by a nested closure" while it is still deciding declaration keywords.

use indexmap::{IndexMap, IndexSet};

use crate::ast::{Expr, ExprKind, FunctionDef, Stmt, StmtKind};

/// Functions known to mutate the sequence/dict they're called on, keyed by attribute
/// name (method dispatch is resolved structurally, not nominally — any `x.append(...)`
/// counts, matching the pattern used throughout the builtin dispatcher in C8).
const MUTATING_METHODS: &[&str] = &["append", "extend", "insert", "pop", "remove", "sort", "reverse", "clear", "update", "add", "discard"];

#[derive(Debug, Clone, Default)]
pub struct MutationInfo {
    pub assign_sites: u32,
    pub aug_assign_sites: u32,
    pub subscript_store_sites: u32,
    pub attribute_store_sites: u32,
    pub mutating_method_calls: u32,
    pub is_captured_by_closure: bool,
}

impl MutationInfo {
    /// `is_mutated` is true iff any mutation-causing site count is >= 1 beyond the
    /// initial declaring assignment (§4.2).
    pub fn is_mutated(&self) -> bool {
        self.assign_sites > 1
            || self.aug_assign_sites > 0
            || self.subscript_store_sites > 0
            || self.attribute_store_sites > 0
            || self.mutating_method_calls > 0
    }
}

#[derive(Debug, Default)]
pub struct MutationAnalysis {
    pub names: IndexMap<String, MutationInfo>,
    /// Classes whose methods contain `self.field = …` outside `__init__` — constructors
    /// of these classes must be declared mutable (§4.2).
    pub mutable_classes: IndexMap<String, bool>,
}

impl MutationAnalysis {
    pub fn get(&self, name: &str) -> MutationInfo {
        self.names.get(name).cloned().unwrap_or_default()
    }
}

pub fn analyze(module: &[Stmt]) -> MutationAnalysis {
    let mut analysis = MutationAnalysis::default();
    for stmt in module {
        walk_stmt(stmt, &mut analysis);
    }
    analysis
}

fn entry<'a>(analysis: &'a mut MutationAnalysis, name: &str) -> &'a mut MutationInfo {
    analysis.names.entry(name.to_owned()).or_default()
}

fn walk_stmt(stmt: &Stmt, analysis: &mut MutationAnalysis) {
    match &stmt.kind {
        StmtKind::Assign { targets, value } => {
            for target in targets {
                record_store(target, analysis);
            }
            walk_expr(value, analysis);
        }
        StmtKind::AugAssign { target, value, .. } => {
            if let ExprKind::Name(name) = target.kind.as_ref() {
                entry(analysis, name).aug_assign_sites += 1;
            } else {
                record_store(target, analysis);
            }
            walk_expr(value, analysis);
        }
        StmtKind::AnnAssign { target, value, .. } => {
            record_store(target, analysis);
            if let Some(v) = value {
                walk_expr(v, analysis);
            }
        }
        StmtKind::If { test, body, orelse } | StmtKind::While { test, body, orelse } => {
            walk_expr(test, analysis);
            walk_body(body, analysis);
            walk_body(orelse, analysis);
        }
        StmtKind::For { target, iter, body, orelse } => {
            record_store(target, analysis);
            walk_expr(iter, analysis);
            walk_body(body, analysis);
            walk_body(orelse, analysis);
        }
        StmtKind::FunctionDef(f) => walk_function(f, analysis),
        StmtKind::ClassDef(c) => walk_class(c, analysis),
        StmtKind::Try(t) => {
            walk_body(&t.body, analysis);
            for handler in &t.handlers {
                walk_body(&handler.body, analysis);
            }
            walk_body(&t.orelse, analysis);
            walk_body(&t.finalbody, analysis);
        }
        StmtKind::With(w) => {
            for item in &w.items {
                walk_expr(&item.context_expr, analysis);
                if let Some(target) = &item.optional_vars {
                    record_store(target, analysis);
                }
            }
            walk_body(&w.body, analysis);
        }
        StmtKind::Raise { exc, cause } => {
            exc.iter().chain(cause.iter()).for_each(|e| walk_expr(e, analysis));
        }
        StmtKind::Return(Some(e)) | StmtKind::ExprStmt(e) => walk_expr(e, analysis),
        StmtKind::Assert { test, msg } => {
            walk_expr(test, analysis);
            if let Some(m) = msg {
                walk_expr(m, analysis);
            }
        }
        StmtKind::Del(targets) => targets.iter().for_each(|e| walk_expr(e, analysis)),
        StmtKind::Return(None)
        | StmtKind::Import(_)
        | StmtKind::ImportFrom { .. }
        | StmtKind::Global(_)
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Pass => {}
    }
}

fn walk_body(body: &[Stmt], analysis: &mut MutationAnalysis) {
    for stmt in body {
        walk_stmt(stmt, analysis);
    }
}

fn record_store(target: &Expr, analysis: &mut MutationAnalysis) {
    match target.kind.as_ref() {
        ExprKind::Name(name) => entry(analysis, name).assign_sites += 1,
        ExprKind::Subscript { value, index } => {
            if let ExprKind::Name(name) = value.kind.as_ref() {
                entry(analysis, name).subscript_store_sites += 1;
            }
            walk_expr(index, analysis);
        }
        ExprKind::Attribute { value, .. } => {
            if let ExprKind::Name(name) = value.kind.as_ref() {
                if name == "self" {
                    // handled by walk_class (marks the owning class mutable); still
                    // counts as a store against `self` for completeness.
                }
                entry(analysis, name).attribute_store_sites += 1;
            }
        }
        ExprKind::Tuple(elems) | ExprKind::List(elems) => {
            for e in elems {
                record_store(e, analysis);
            }
        }
        ExprKind::Starred(inner) => record_store(inner, analysis),
        _ => {}
    }
}

fn walk_expr(expr: &Expr, analysis: &mut MutationAnalysis) {
    match expr.kind.as_ref() {
        ExprKind::Name(_) | ExprKind::Constant(_) | ExprKind::Ellipsis => {}
        ExprKind::Call { func, args, keywords } => {
            if let ExprKind::Attribute { value, attr } = func.kind.as_ref() {
                if MUTATING_METHODS.contains(&attr.as_str()) {
                    if let ExprKind::Name(name) = value.kind.as_ref() {
                        entry(analysis, name).mutating_method_calls += 1;
                    }
                }
                walk_expr(value, analysis);
            } else {
                walk_expr(func, analysis);
            }
            args.iter().for_each(|a| walk_expr(a, analysis));
            keywords.iter().for_each(|k| walk_expr(&k.value, analysis));
        }
        ExprKind::Attribute { value, .. } => walk_expr(value, analysis),
        ExprKind::Subscript { value, index } => {
            walk_expr(value, analysis);
            walk_expr(index, analysis);
        }
        ExprKind::Slice { lower, upper, step } => {
            [lower, upper, step].into_iter().flatten().for_each(|e| walk_expr(e, analysis));
        }
        ExprKind::BinOp { left, right, .. } => {
            walk_expr(left, analysis);
            walk_expr(right, analysis);
        }
        ExprKind::UnaryOp { operand, .. } | ExprKind::Starred(operand) | ExprKind::Await(operand) => {
            walk_expr(operand, analysis);
        }
        ExprKind::Compare { left, comparators, .. } => {
            walk_expr(left, analysis);
            comparators.iter().for_each(|e| walk_expr(e, analysis));
        }
        ExprKind::BoolOp { values, .. } => values.iter().for_each(|e| walk_expr(e, analysis)),
        ExprKind::IfExpr { test, body, orelse } => {
            walk_expr(test, analysis);
            walk_expr(body, analysis);
            walk_expr(orelse, analysis);
        }
        ExprKind::Lambda { body, .. } => {
            mark_captures(body, analysis);
            walk_expr(body, analysis);
        }
        ExprKind::List(elems) | ExprKind::Tuple(elems) | ExprKind::Set(elems) => {
            elems.iter().for_each(|e| walk_expr(e, analysis));
        }
        ExprKind::Dict(items) => {
            for (k, v) in items {
                if let Some(k) = k {
                    walk_expr(k, analysis);
                }
                walk_expr(v, analysis);
            }
        }
        ExprKind::ListComp { element, generators } | ExprKind::SetComp { element, generators } | ExprKind::GeneratorExp { element, generators } => {
            walk_expr(element, analysis);
            walk_generators(generators, analysis);
        }
        ExprKind::DictComp { key, value, generators } => {
            walk_expr(key, analysis);
            walk_expr(value, analysis);
            walk_generators(generators, analysis);
        }
        ExprKind::NamedExpr { value, .. } => walk_expr(value, analysis),
    }
}

/// Collects every `Name` read inside `expr` into `out`, for callers outside this module
/// that need a free-variable set without the full mutation count (e.g. the try/except
/// capture-partitioning in C7).
pub fn walk_expr_public(expr: &Expr, out: &mut IndexSet<String>) {
    collect_names(expr, out);
}

fn collect_names(expr: &Expr, out: &mut IndexSet<String>) {
    if let ExprKind::Name(name) = expr.kind.as_ref() {
        out.insert(name.clone());
    }
    match expr.kind.as_ref() {
        ExprKind::Call { func, args, keywords } => {
            collect_names(func, out);
            args.iter().for_each(|a| collect_names(a, out));
            keywords.iter().for_each(|k| collect_names(&k.value, out));
        }
        ExprKind::Attribute { value, .. } => collect_names(value, out),
        ExprKind::Subscript { value, index } => {
            collect_names(value, out);
            collect_names(index, out);
        }
        ExprKind::Slice { lower, upper, step } => {
            [lower, upper, step].into_iter().flatten().for_each(|e| collect_names(e, out));
        }
        ExprKind::BinOp { left, right, .. } => {
            collect_names(left, out);
            collect_names(right, out);
        }
        ExprKind::UnaryOp { operand, .. } | ExprKind::Starred(operand) | ExprKind::Await(operand) => collect_names(operand, out),
        ExprKind::Compare { left, comparators, .. } => {
            collect_names(left, out);
            comparators.iter().for_each(|e| collect_names(e, out));
        }
        ExprKind::BoolOp { values, .. } | ExprKind::List(values) | ExprKind::Tuple(values) | ExprKind::Set(values) => {
            values.iter().for_each(|e| collect_names(e, out));
        }
        ExprKind::Dict(items) => {
            for (k, v) in items {
                if let Some(k) = k {
                    collect_names(k, out);
                }
                collect_names(v, out);
            }
        }
        ExprKind::IfExpr { test, body, orelse } => {
            collect_names(test, out);
            collect_names(body, out);
            collect_names(orelse, out);
        }
        ExprKind::NamedExpr { value, .. } => collect_names(value, out),
        _ => {}
    }
}

fn walk_generators(generators: &[crate::ast::Comprehension], analysis: &mut MutationAnalysis) {
    for gen in generators {
        walk_expr(&gen.iter, analysis);
        gen.ifs.iter().for_each(|e| walk_expr(e, analysis));
    }
}

/// Scans a lambda/nested-function body for free-variable references and marks each as
/// captured (§4.2: "Separately computes `is_captured_by_closure` by scanning lambda and
/// nested-function bodies for name references to outer scope"). We don't have full
/// scope resolution here, so this conservatively marks every `Name` read inside the
/// closure body; the variable tracker filters down to names that actually exist in an
/// outer scope when it consumes this.
fn mark_captures(expr: &Expr, analysis: &mut MutationAnalysis) {
    if let ExprKind::Name(name) = expr.kind.as_ref() {
        entry(analysis, name).is_captured_by_closure = true;
    }
    walk_expr(expr, analysis);
}

fn walk_function(f: &FunctionDef, analysis: &mut MutationAnalysis) {
    for stmt in &f.body {
        if let StmtKind::FunctionDef(nested) = &stmt.kind {
            scan_nested_captures(nested, analysis);
        }
        walk_stmt(stmt, analysis);
    }
}

fn scan_nested_captures(f: &FunctionDef, analysis: &mut MutationAnalysis) {
    for stmt in &f.body {
        if let StmtKind::Return(Some(e)) | StmtKind::ExprStmt(e) = &stmt.kind {
            mark_captures(e, analysis);
        }
    }
}

fn walk_class(c: &crate::ast::ClassDef, analysis: &mut MutationAnalysis) {
    let mut is_mutable = false;
    for stmt in &c.body {
        if let StmtKind::FunctionDef(method) = &stmt.kind {
            if method.name != "__init__" && method_mutates_self(method) {
                is_mutable = true;
            }
            walk_function(method, analysis);
        }
    }
    analysis.mutable_classes.insert(c.name.clone(), is_mutable);
}

fn method_mutates_self(method: &FunctionDef) -> bool {
    method.body.iter().any(stmt_mutates_self)
}

fn stmt_mutates_self(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Assign { targets, .. } => targets.iter().any(is_self_attr_target),
        StmtKind::AugAssign { target, .. } => is_self_attr_target(target),
        StmtKind::If { body, orelse, .. } | StmtKind::While { body, orelse, .. } | StmtKind::For { body, orelse, .. } => {
            body.iter().chain(orelse).any(stmt_mutates_self)
        }
        StmtKind::Try(t) => t.body.iter().chain(t.finalbody.iter()).any(stmt_mutates_self),
        StmtKind::With(w) => w.body.iter().any(stmt_mutates_self),
        _ => false,
    }
}

fn is_self_attr_target(expr: &Expr) -> bool {
    matches!(expr.kind.as_ref(), ExprKind::Attribute { value, .. } if matches!(value.kind.as_ref(), ExprKind::Name(n) if n == "self"))
}
