//! Expression emitter (§4.5, C6). Every public function here returns the emitted Zig
//! text for one expression; comprehensions, chained comparisons, and slices return a
//! self-contained labeled-block expression (`blk: { ...; break :blk value; }`) rather
//! than relying on an out-of-band statement prelude, since Zig expressions may embed
//! statements this way.

use crate::{
    ast::{BoolOperator, CmpOp, Expr, ExprKind, Literal, Operator, UnaryOperator},
    builtins::{self, BuiltinDispatch},
    comptime,
    context::EmitContext,
    diagnostics::DiagnosticCode,
    errors::Result,
    types::Type,
};

pub fn emit_expr(ctx: &mut EmitContext, expr: &Expr) -> Result<String> {
    match expr.kind.as_ref() {
        ExprKind::Constant(lit) => Ok(emit_literal(lit)),
        ExprKind::Name(name) => Ok(emit_name(ctx, name)),
        ExprKind::BinOp { left, op, right } => emit_binop(ctx, left, *op, right),
        ExprKind::UnaryOp { op, operand } => emit_unaryop(ctx, *op, operand),
        ExprKind::Compare { left, ops, comparators } => emit_compare(ctx, left, ops, comparators),
        ExprKind::BoolOp { op, values } => emit_bool_op(ctx, *op, values),
        ExprKind::IfExpr { test, body, orelse } => emit_if_expr(ctx, test, body, orelse),
        ExprKind::Call { func, args, keywords } => emit_call(ctx, expr, func, args, keywords),
        ExprKind::Subscript { value, index } => emit_subscript(ctx, value, index),
        ExprKind::Slice { lower, upper, step } => emit_slice(ctx, lower.as_ref(), upper.as_ref(), step.as_ref()),
        ExprKind::Attribute { value, attr } => emit_attribute(ctx, value, attr),
        ExprKind::List(elems) => emit_list_literal(ctx, elems),
        ExprKind::Tuple(elems) => emit_tuple_literal(ctx, elems),
        ExprKind::Set(elems) => emit_set_literal(ctx, elems),
        ExprKind::Dict(items) => emit_dict_literal(ctx, items),
        ExprKind::ListComp { element, generators } => emit_comprehension(ctx, element, generators, Comp::List),
        ExprKind::SetComp { element, generators } => emit_comprehension(ctx, element, generators, Comp::Set),
        ExprKind::GeneratorExp { element, generators } => emit_comprehension(ctx, element, generators, Comp::List),
        ExprKind::DictComp { key, value, generators } => emit_dict_comprehension(ctx, key, value, generators),
        ExprKind::Lambda { params, body } => emit_lambda(ctx, params, body),
        ExprKind::Starred(inner) | ExprKind::Await(inner) => emit_expr(ctx, inner),
        ExprKind::NamedExpr { target, value } => emit_named_expr(ctx, target, value),
        ExprKind::Ellipsis => Ok("{}".to_owned()),
    }
}

fn emit_literal(lit: &Literal) -> String {
    match lit {
        Literal::Int(i) => i.to_string(),
        Literal::Float(f) => format_float(*f),
        Literal::Bool(b) => b.to_string(),
        Literal::Str(s) => quote_string(s),
        Literal::None => "null".to_owned(),
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

/// Quotes a string with JSON-like escapes (§4.5 Literal: string).
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn emit_name(ctx: &mut EmitContext, name: &str) -> String {
    if let Some(binding) = ctx.vars.binding_mut(name) {
        binding.is_used = true;
    }
    if let Some(renamed) = ctx.vars.var_renames.get(name) {
        return renamed.clone();
    }
    ctx.escape_ident(name)
}

fn emit_binop(ctx: &mut EmitContext, left: &Expr, op: Operator, right: &Expr) -> Result<String> {
    let lt = ctx.inferrer.infer_expr(left, &ctx.vars);
    let rt = ctx.inferrer.infer_expr(right, &ctx.vars);

    if op == Operator::Add && (lt == Type::String || rt == Type::String) {
        return emit_string_concat(ctx, left, right);
    }
    if op == Operator::Add && matches!((&lt, &rt), (Type::List(_), Type::List(_))) {
        let l = emit_expr(ctx, left)?;
        let r = emit_expr(ctx, right)?;
        return Ok(format!("runtime.listConcat({l}, {r})"));
    }
    if op == Operator::Mult && (matches!(lt, Type::List(_)) || matches!(rt, Type::List(_))) {
        let l = emit_expr(ctx, left)?;
        let r = emit_expr(ctx, right)?;
        return Ok(format!("runtime.listRepeat({l}, {r})"));
    }

    let l = emit_expr(ctx, left)?;
    let r = emit_expr(ctx, right)?;
    Ok(match op {
        Operator::Add => format!("({l} + {r})"),
        Operator::Sub => format!("({l} - {r})"),
        Operator::Mult => format!("({l} * {r})"),
        // `/` between ints produces a float in a plain expression (source semantics, §4.5).
        Operator::Div if lt == Type::Int && rt == Type::Int => {
            format!("(@as(f64, @floatFromInt({l})) / @as(f64, @floatFromInt({r})))")
        }
        Operator::Div => format!("({l} / {r})"),
        Operator::FloorDiv => format!("@divFloor({l}, {r})"),
        Operator::Mod => format!("@mod({l}, {r})"),
        Operator::Pow => format!("std.math.pow(i64, {l}, {r})"),
        Operator::LShift => format!("({l} << @as(u6, @intCast({r})))"),
        Operator::RShift => format!("({l} >> @as(u6, @intCast({r})))"),
        Operator::BitOr => format!("({l} | {r})"),
        Operator::BitXor => format!("({l} ^ {r})"),
        Operator::BitAnd => format!("({l} & {r})"),
        Operator::MatMult => format!("runtime.matmul({l}, {r})"),
    })
}

/// Flattens nested `+` of strings into a single runtime concat call (§4.6.1 step 7,
/// reused here for the expression-position case).
fn emit_string_concat(ctx: &mut EmitContext, left: &Expr, right: &Expr) -> Result<String> {
    let mut parts = Vec::new();
    flatten_string_concat(left, &mut parts);
    flatten_string_concat(right, &mut parts);
    let mut emitted = Vec::with_capacity(parts.len());
    for part in parts {
        emitted.push(emit_expr(ctx, part)?);
    }
    Ok(format!("try runtime.stringConcat(allocator, &.{{ {} }})", emitted.join(", ")))
}

fn flatten_string_concat<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    if let ExprKind::BinOp { left, op: Operator::Add, right } = expr.kind.as_ref() {
        flatten_string_concat(left, out);
        flatten_string_concat(right, out);
    } else {
        out.push(expr);
    }
}

fn emit_unaryop(ctx: &mut EmitContext, op: UnaryOperator, operand: &Expr) -> Result<String> {
    let o = emit_expr(ctx, operand)?;
    Ok(match op {
        UnaryOperator::Not => format!("!{}", truthy(ctx, operand, &o)?),
        UnaryOperator::USub => format!("(-{o})"),
        UnaryOperator::UAdd => o,
        UnaryOperator::Invert => format!("(~{o})"),
    })
}

/// Truthiness (§4.5): zero-valued primitives and empty containers are falsy; container
/// truthiness inspects length; `Unknown` defaults to truthy.
fn truthy(ctx: &mut EmitContext, expr: &Expr, emitted: &str) -> Result<String> {
    Ok(match ctx.inferrer.infer_expr(expr, &ctx.vars) {
        Type::Bool => emitted.to_owned(),
        Type::Int => format!("({emitted} != 0)"),
        Type::Float => format!("({emitted} != 0.0)"),
        Type::String => format!("({emitted}.len != 0)"),
        Type::List(_) | Type::Array(_, _) => format!("({emitted}.items.len != 0)"),
        Type::Dict(_, _) => format!("({emitted}.count() != 0)"),
        Type::None => "false".to_owned(),
        _ => format!("({emitted} != null)"),
    })
}

pub fn emit_truthy(ctx: &mut EmitContext, expr: &Expr) -> Result<String> {
    let emitted = emit_expr(ctx, expr)?;
    truthy(ctx, expr, &emitted)
}

fn cmp_token(op: CmpOp) -> Option<&'static str> {
    Some(match op {
        CmpOp::Eq => "==",
        CmpOp::NotEq => "!=",
        CmpOp::Lt => "<",
        CmpOp::LtE => "<=",
        CmpOp::Gt => ">",
        CmpOp::GtE => ">=",
        CmpOp::Is | CmpOp::IsNot | CmpOp::In | CmpOp::NotIn => return None,
    })
}

fn emit_single_cmp(ctx: &mut EmitContext, lhs: &str, op: CmpOp, rhs_expr: &Expr, rhs: &str) -> Result<String> {
    if let Some(token) = cmp_token(op) {
        let lhs_ty = Type::Unknown; // comparand types already resolved by caller context
        let _ = lhs_ty;
        if matches!(op, CmpOp::Eq | CmpOp::NotEq) && ctx.inferrer.infer_expr(rhs_expr, &ctx.vars) == Type::String {
            let eq = format!("runtime.stringEq({lhs}, {rhs})");
            return Ok(if op == CmpOp::Eq { eq } else { format!("!{eq}") });
        }
        return Ok(format!("({lhs} {token} {rhs})"));
    }
    Ok(match op {
        CmpOp::Is => format!("({lhs} == {rhs})"),
        CmpOp::IsNot => format!("({lhs} != {rhs})"),
        CmpOp::In => format!("runtime.contains({rhs}, {lhs})"),
        CmpOp::NotIn => format!("!runtime.contains({rhs}, {lhs})"),
        _ => unreachable!("handled by cmp_token"),
    })
}

/// Chained comparisons `a < b < c` fold to `(a < b) and (b < c)` with each interior
/// operand evaluated exactly once via a temp binding (§4.5 Comparison).
fn emit_compare(ctx: &mut EmitContext, left: &Expr, ops: &[CmpOp], comparators: &[Expr]) -> Result<String> {
    if ops.len() == 1 {
        let l = emit_expr(ctx, left)?;
        let r = emit_expr(ctx, &comparators[0])?;
        return emit_single_cmp(ctx, &l, ops[0], &comparators[0], &r);
    }

    let label = ctx.gensym_cmp_tmp();
    let mut block = format!("{label}: {{\n");
    let inner_indent = format!("{}    ", ctx.indent_str());
    let mut prev_emitted = emit_expr(ctx, left)?;
    let mut clauses = Vec::new();
    for (i, (op, comparator)) in ops.iter().zip(comparators).enumerate() {
        let rhs_emitted = emit_expr(ctx, comparator)?;
        let tmp = format!("__cmp_operand_{}_{i}", label.trim_start_matches("__cmp_tmp_"));
        if i + 1 < ops.len() {
            block.push_str(&format!("{inner_indent}const {tmp} = {rhs_emitted};\n"));
            clauses.push(emit_single_cmp(ctx, &prev_emitted, *op, comparator, &tmp)?);
            prev_emitted = tmp;
        } else {
            clauses.push(emit_single_cmp(ctx, &prev_emitted, *op, comparator, &rhs_emitted)?);
        }
    }
    block.push_str(&format!("{inner_indent}break :{label} {};\n", clauses.join(" and ")));
    block.push_str(&format!("{}}}", ctx.indent_str()));
    Ok(block)
}

fn emit_bool_op(ctx: &mut EmitContext, op: BoolOperator, values: &[Expr]) -> Result<String> {
    let token = match op {
        BoolOperator::And => "and",
        BoolOperator::Or => "or",
    };
    let mut parts = Vec::with_capacity(values.len());
    for v in values {
        parts.push(emit_truthy(ctx, v)?);
    }
    Ok(format!("({})", parts.join(&format!(" {token} "))))
}

fn emit_if_expr(ctx: &mut EmitContext, test: &Expr, body: &Expr, orelse: &Expr) -> Result<String> {
    let t = emit_truthy(ctx, test)?;
    let b = emit_expr(ctx, body)?;
    let e = emit_expr(ctx, orelse)?;
    Ok(format!("(if ({t}) {b} else {e})"))
}

fn emit_named_expr(ctx: &mut EmitContext, target: &str, value: &Expr) -> Result<String> {
    let v = emit_expr(ctx, value)?;
    let ty = ctx.inferrer.infer_expr(value, &ctx.vars);
    let escaped = ctx.escape_ident(target);
    if !ctx.vars.is_declared_in_current_scope(target) {
        ctx.vars.declare(crate::vars::Binding::new(target, ty))?;
    }
    Ok(format!("blk: {{ {escaped} = {v}; break :blk {escaped}; }}"))
}

fn emit_call(ctx: &mut EmitContext, call_expr: &Expr, func: &Expr, args: &[Expr], keywords: &[crate::ast::Keyword]) -> Result<String> {
    // Resolution order (§4.5 Call): (1) known builtin, (2) module.function, (3) user
    // function needing the allocator, (4) direct call.
    if let ExprKind::Attribute { value, attr } = func.kind.as_ref() {
        if let ExprKind::Name(module) = value.kind.as_ref() {
            if ctx.imports.is_skipped_module(module) {
                let (line, column) = (0, 0);
                ctx.diagnostics.push(DiagnosticCode::SkippedModuleReference, "builtins", line, column, format!("call to {module}.{attr} dropped"));
                return Ok("undefined".to_owned());
            }
            if ctx.imports.lookup(module).is_some() {
                return emit_module_call(ctx, module, attr, args);
            }
        }
        return emit_method_call(ctx, value, attr, args);
    }

    if let ExprKind::Name(name) = func.kind.as_ref() {
        if let Some(dispatch) = builtins::dispatch(name) {
            return emit_builtin_call(ctx, name, &dispatch, args);
        }
        if let Some(class) = ctx.inferrer.class(name) {
            let class_name = class.name.clone();
            return emit_constructor_call(ctx, &class_name, args, keywords);
        }
        let mut emitted_args = Vec::with_capacity(args.len());
        for a in args {
            emitted_args.push(emit_expr(ctx, a)?);
        }
        for kw in keywords {
            emitted_args.push(emit_expr(ctx, &kw.value)?);
        }
        let needs_allocator = ctx.inferrer.function(name).is_some_and(|sig| sig.needs_allocator);
        if needs_allocator {
            emitted_args.push("allocator".to_owned());
        }
        let may_fail = ctx.inferrer.function(name).is_some_and(|sig| sig.return_type != Type::None) || needs_allocator;
        let prefix = if may_fail { "try " } else { "" };
        return Ok(format!("{prefix}{}({})", ctx.escape_ident(name), emitted_args.join(", ")));
    }

    let _ = call_expr;
    let f = emit_expr(ctx, func)?;
    let mut emitted_args = Vec::with_capacity(args.len());
    for a in args {
        emitted_args.push(emit_expr(ctx, a)?);
    }
    Ok(format!("{f}.invoke({})", emitted_args.join(", ")))
}

fn emit_builtin_call(ctx: &mut EmitContext, name: &str, dispatch: &BuiltinDispatch, args: &[Expr]) -> Result<String> {
    match dispatch {
        BuiltinDispatch::RuntimeCall(symbol) => {
            let mut emitted = Vec::with_capacity(args.len());
            for a in args {
                emitted.push(emit_expr(ctx, a)?);
            }
            Ok(format!("try {symbol}({})", emitted.join(", ")))
        }
        BuiltinDispatch::Stub(symbol) => Ok((*symbol).to_owned()),
        BuiltinDispatch::Inline => emit_inline_builtin(ctx, name, args),
    }
}

fn emit_inline_builtin(ctx: &mut EmitContext, name: &str, args: &[Expr]) -> Result<String> {
    match name {
        "len" => {
            let arg = &args[0];
            let emitted = emit_expr(ctx, arg)?;
            Ok(match ctx.inferrer.infer_expr(arg, &ctx.vars) {
                Type::List(_) => format!("{emitted}.items.len"),
                Type::Dict(_, _) => format!("{emitted}.count()"),
                Type::String => format!("{emitted}.len"),
                _ => format!("{emitted}.len"),
            })
        }
        "print" => {
            let mut emitted = Vec::with_capacity(args.len());
            for a in args {
                emitted.push(emit_expr(ctx, a)?);
            }
            Ok(format!("try runtime.print(.{{ {} }})", emitted.join(", ")))
        }
        "range" => emit_range_literal(ctx, args),
        "abs" => Ok(format!("@abs({})", emit_expr(ctx, &args[0])?)),
        "int" => Ok(format!("@as(i64, @intFromFloat({}))", emit_expr(ctx, &args[0])?)),
        "float" => Ok(format!("@as(f64, @floatFromInt({}))", emit_expr(ctx, &args[0])?)),
        "bool" => emit_truthy(ctx, &args[0]),
        "str" => Ok(format!("try runtime.toString(allocator, {})", emit_expr(ctx, &args[0])?)),
        "sum" => Ok(format!("runtime.sum({})", emit_expr(ctx, &args[0])?)),
        "min" => emit_variadic_runtime(ctx, "runtime.min", args),
        "max" => emit_variadic_runtime(ctx, "runtime.max", args),
        "sorted" => Ok(format!("try runtime.sorted(allocator, {})", emit_expr(ctx, &args[0])?)),
        "reversed" => Ok(format!("runtime.reversed({})", emit_expr(ctx, &args[0])?)),
        "repr" => Ok(format!("try runtime.repr(allocator, {})", emit_expr(ctx, &args[0])?)),
        "isinstance" => Ok("true".to_owned()),
        "list" | "set" | "tuple" | "dict" | "enumerate" | "zip" => Ok("undefined".to_owned()),
        _ => Ok("undefined".to_owned()),
    }
}

fn emit_variadic_runtime(ctx: &mut EmitContext, symbol: &str, args: &[Expr]) -> Result<String> {
    let mut emitted = Vec::with_capacity(args.len());
    for a in args {
        emitted.push(emit_expr(ctx, a)?);
    }
    Ok(format!("{symbol}(.{{ {} }})", emitted.join(", ")))
}

fn emit_range_literal(ctx: &mut EmitContext, args: &[Expr]) -> Result<String> {
    let (start, stop, step) = match args {
        [stop] => ("0".to_owned(), emit_expr(ctx, stop)?, "1".to_owned()),
        [start, stop] => (emit_expr(ctx, start)?, emit_expr(ctx, stop)?, "1".to_owned()),
        [start, stop, step] => (emit_expr(ctx, start)?, emit_expr(ctx, stop)?, emit_expr(ctx, step)?),
        _ => return Ok("undefined".to_owned()),
    };
    Ok(format!("runtime.Range{{ .start = {start}, .stop = {stop}, .step = {step} }}"))
}

fn emit_module_call(ctx: &mut EmitContext, module: &str, attr: &str, args: &[Expr]) -> Result<String> {
    if let Some(stub_ty) = builtins::module_function_return_type(module, attr) {
        let mut emitted = Vec::with_capacity(args.len());
        for a in args {
            emitted.push(emit_expr(ctx, a)?);
        }
        return Ok(match stub_ty {
            Type::String if emitted.is_empty() => "\".\"".to_owned(),
            _ => format!("try runtime.{module}.{attr}({})", emitted.join(", ")),
        });
    }
    Ok("undefined".to_owned())
}

fn emit_method_call(ctx: &mut EmitContext, receiver: &Expr, attr: &str, args: &[Expr]) -> Result<String> {
    let recv_ty = ctx.inferrer.infer_expr(receiver, &ctx.vars);
    let recv = emit_expr(ctx, receiver)?;
    let mut emitted_args = Vec::with_capacity(args.len());
    for a in args {
        emitted_args.push(emit_expr(ctx, a)?);
    }
    let joined = emitted_args.join(", ");

    if recv_ty == Type::String && builtins::string_method_allocates(attr) {
        return Ok(format!("try runtime.str.{attr}(allocator, {recv}, {joined})"));
    }

    Ok(match (&recv_ty, attr) {
        (Type::List(_), "append") => format!("try {recv}.append(allocator, {joined})"),
        (Type::List(_), "pop") => format!("{recv}.pop()"),
        (Type::List(_), "extend") => format!("try {recv}.appendSlice(allocator, {joined})"),
        (Type::List(_), "sort") => format!("std.sort.block(@TypeOf({recv}.items[0]), {recv}.items, {{}}, runtime.lessThan)"),
        (Type::List(_), "reverse") => format!("std.mem.reverse(@TypeOf({recv}.items[0]), {recv}.items)"),
        (Type::List(_), "clear") => format!("{recv}.clearRetainingCapacity()"),
        (Type::Dict(_, _), "get") => format!("{recv}.get({joined})"),
        (Type::Dict(_, _), "keys") => format!("{recv}.keys()"),
        (Type::Dict(_, _), "values") => format!("{recv}.values()"),
        (Type::Dict(_, _), "items") => format!("{recv}.iterator()"),
        (Type::String, "startswith") => format!("std.mem.startsWith(u8, {recv}, {joined})"),
        (Type::String, "endswith") => format!("std.mem.endsWith(u8, {recv}, {joined})"),
        (Type::String, "find") => format!("runtime.str.find({recv}, {joined})"),
        (_, _) => format!("{recv}.{attr}({joined})"),
    })
}

fn emit_constructor_call(ctx: &mut EmitContext, class_name: &str, args: &[Expr], keywords: &[crate::ast::Keyword]) -> Result<String> {
    let mut emitted = Vec::with_capacity(args.len() + keywords.len());
    for a in args {
        emitted.push(emit_expr(ctx, a)?);
    }
    for kw in keywords {
        emitted.push(emit_expr(ctx, &kw.value)?);
    }
    let class = ctx.escape_ident(class_name);
    Ok(format!("try {class}.init(allocator, {})", emitted.join(", ")))
}

fn emit_subscript(ctx: &mut EmitContext, value: &Expr, index: &Expr) -> Result<String> {
    let value_ty = ctx.inferrer.infer_expr(value, &ctx.vars);
    let v = emit_expr(ctx, value)?;

    if matches!(index.kind.as_ref(), ExprKind::Slice { .. }) {
        let ExprKind::Slice { lower, upper, step } = index.kind.as_ref() else { unreachable!() };
        return emit_slice_of(ctx, &v, lower.as_ref(), upper.as_ref(), step.as_ref());
    }

    let i = emit_expr(ctx, index)?;
    match value_ty {
        Type::Dict(_, _) => Ok(format!("{v}.get({i}).?")),
        Type::List(_) | Type::Array(_, _) | Type::String => Ok(format!("{v}.items[@as(usize, @intCast({i}))]")),
        _ => Ok(format!("{v}[@as(usize, @intCast({i}))]")),
    }
}

/// Bare slice expression, e.g. as a comprehension/standalone operand rather than
/// inside a subscript — folds to the same labeled block as `emit_slice_of`.
fn emit_slice(ctx: &mut EmitContext, lower: Option<&Expr>, upper: Option<&Expr>, step: Option<&Expr>) -> Result<String> {
    emit_slice_of(ctx, "self", lower, upper, step)
}

/// Computes bounds with Python semantics (negative indices counted from end, clamped)
/// and returns a new sub-sequence via a labeled block (§4.5 Subscript: slice).
fn emit_slice_of(ctx: &mut EmitContext, target: &str, lower: Option<&Expr>, upper: Option<&Expr>, step: Option<&Expr>) -> Result<String> {
    let label = ctx.gensym_attr_tmp();
    let ind = ctx.indent_str();
    let inner = format!("{ind}    ");
    let lower_e = match lower {
        Some(e) => emit_expr(ctx, e)?,
        None => "0".to_owned(),
    };
    let upper_e = match upper {
        Some(e) => emit_expr(ctx, e)?,
        None => format!("{target}.items.len"),
    };
    let step_e = match step {
        Some(e) => emit_expr(ctx, e)?,
        None => "1".to_owned(),
    };
    let mut block = format!("{label}: {{\n");
    block.push_str(&format!("{inner}const __lo = runtime.clampIndex({target}.items.len, {lower_e});\n"));
    block.push_str(&format!("{inner}const __hi = runtime.clampIndex({target}.items.len, {upper_e});\n"));
    block.push_str(&format!("{inner}break :{label} try runtime.slice(allocator, {target}, __lo, __hi, {step_e});\n"));
    block.push_str(&format!("{ind}}}"));
    Ok(block)
}

fn emit_attribute(ctx: &mut EmitContext, value: &Expr, attr: &str) -> Result<String> {
    if let ExprKind::Name(module) = value.kind.as_ref() {
        if ctx.imports.lookup(module).is_some() {
            return Ok(format!("runtime.{module}.{attr}"));
        }
    }
    let value_ty = ctx.inferrer.infer_expr(value, &ctx.vars);
    let v = emit_expr(ctx, value)?;
    match value_ty {
        Type::ClassInstance(class_name) => {
            let declares_field = ctx.inferrer.class(&class_name).is_some_and(|c| c.fields.contains_key(attr));
            if declares_field {
                Ok(format!("{v}.{attr}"))
            } else {
                Ok(format!("{v}.__dict__.get(\"{attr}\").?"))
            }
        }
        Type::Unknown => Ok(format!("runtime.dynGet({v}, \"{attr}\")")),
        _ => Ok(format!("{v}.{attr}")),
    }
}

fn emit_list_literal(ctx: &mut EmitContext, elems: &[Expr]) -> Result<String> {
    let mut emitted = Vec::with_capacity(elems.len());
    for e in elems {
        emitted.push(emit_expr(ctx, e)?);
    }
    Ok(format!("try runtime.listFrom(allocator, &.{{ {} }})", emitted.join(", ")))
}

fn emit_tuple_literal(ctx: &mut EmitContext, elems: &[Expr]) -> Result<String> {
    let mut emitted = Vec::with_capacity(elems.len());
    for e in elems {
        emitted.push(emit_expr(ctx, e)?);
    }
    Ok(format!(".{{ {} }}", emitted.join(", ")))
}

fn emit_set_literal(ctx: &mut EmitContext, elems: &[Expr]) -> Result<String> {
    let mut emitted = Vec::with_capacity(elems.len());
    for e in elems {
        emitted.push(emit_expr(ctx, e)?);
    }
    Ok(format!("try runtime.setFrom(allocator, &.{{ {} }})", emitted.join(", ")))
}

/// Dict literals whose keys and values are all compile-time and type-compatible emit a
/// compile-time map (§4.5 literal rule); otherwise a heap dictionary built at runtime.
fn emit_dict_literal(ctx: &mut EmitContext, items: &[(Option<Expr>, Expr)]) -> Result<String> {
    let all_const = items.iter().all(|(k, v)| {
        k.as_ref().is_some_and(|k| comptime::eval_const(k).is_some_and(|c| c.is_emittable_constant()))
            && comptime::eval_const(v).is_some_and(|c| c.is_emittable_constant())
    });

    let mut pairs = Vec::with_capacity(items.len());
    for (k, v) in items {
        let key = match k {
            Some(k) => emit_expr(ctx, k)?,
            None => continue, // `**unpack` entries widen the literal to a runtime dict already
        };
        let value = emit_expr(ctx, v)?;
        pairs.push(format!(".{{ {key}, {value} }}"));
    }

    if all_const {
        Ok(format!("comptime runtime.comptimeMapFrom(.{{ {} }})", pairs.join(", ")))
    } else {
        Ok(format!("try runtime.dictFrom(allocator, &.{{ {} }})", pairs.join(", ")))
    }
}

enum Comp {
    List,
    Set,
}

/// Comprehensions emit a labeled block that allocates the result container, runs the
/// nested `for`/`if` clauses in declaration order, appends, and yields the container
/// (§4.5 comprehension rule).
fn emit_comprehension(ctx: &mut EmitContext, element: &Expr, generators: &[crate::ast::Comprehension], kind: Comp) -> Result<String> {
    let label = ctx.gensym_attr_tmp();
    let ind = ctx.indent_str();
    ctx.push_scope(false);

    // Declare the generator targets in a throwaway scope just to infer the element's
    // type, then pop it — the real declarations happen as emit_comprehension_body
    // walks the nested `for` clauses below.
    ctx.push_scope(false);
    for gen in generators {
        if let ExprKind::Name(name) = gen.target.kind.as_ref() {
            ctx.vars.declare(crate::vars::Binding::new(name, Type::Unknown))?;
        }
    }
    let elem_ty = ctx.inferrer.infer_expr(element, &ctx.vars);
    ctx.pop_scope()?;
    let elem_zig_ty = crate::emit::stmt::zig_type(&elem_ty);

    let ctor = match kind {
        Comp::List => format!("runtime.List({elem_zig_ty}).init(allocator)"),
        Comp::Set => format!("runtime.Set({elem_zig_ty}).init(allocator)"),
    };
    let mut body = format!("{label}: {{\n");
    let depth1 = format!("{ind}    ");
    body.push_str(&format!("{depth1}var __result = {ctor};\n"));
    let nested = emit_comprehension_body(ctx, element, generators, 0, &depth1)?;
    body.push_str(&nested);
    body.push_str(&format!("{depth1}break :{label} __result;\n"));
    body.push_str(&format!("{ind}}}"));
    ctx.pop_scope()?;
    Ok(body)
}

fn emit_comprehension_body(ctx: &mut EmitContext, element: &Expr, generators: &[crate::ast::Comprehension], idx: usize, indent: &str) -> Result<String> {
    if idx == generators.len() {
        let elem = emit_expr(ctx, element)?;
        return Ok(format!("{indent}try __result.append(allocator, {elem});\n"));
    }
    let gen = &generators[idx];
    let iter = emit_expr(ctx, &gen.iter)?;
    let ExprKind::Name(target_name) = gen.target.kind.as_ref() else {
        return Ok(format!("{indent}// unsupported comprehension target\n"));
    };
    let target_ty = Type::Unknown;
    ctx.vars.declare(crate::vars::Binding::new(target_name, target_ty))?;
    let target = ctx.escape_ident(target_name);
    let mut out = format!("{indent}for ({iter}.items) |{target}| {{\n");
    let inner_indent = format!("{indent}    ");
    for cond in &gen.ifs {
        let c = emit_truthy(ctx, cond)?;
        out.push_str(&format!("{inner_indent}if (!({c})) continue;\n"));
    }
    out.push_str(&emit_comprehension_body(ctx, element, generators, idx + 1, &inner_indent)?);
    out.push_str(&format!("{indent}}}\n"));
    Ok(out)
}

fn emit_dict_comprehension(ctx: &mut EmitContext, key: &Expr, value: &Expr, generators: &[crate::ast::Comprehension]) -> Result<String> {
    let label = ctx.gensym_attr_tmp();
    let ind = ctx.indent_str();
    ctx.push_scope(false);

    ctx.push_scope(false);
    for gen in generators {
        if let ExprKind::Name(name) = gen.target.kind.as_ref() {
            ctx.vars.declare(crate::vars::Binding::new(name, Type::Unknown))?;
        }
    }
    let key_ty = ctx.inferrer.infer_expr(key, &ctx.vars);
    let value_ty = ctx.inferrer.infer_expr(value, &ctx.vars);
    ctx.pop_scope()?;
    let key_zig_ty = crate::emit::stmt::zig_type(&key_ty);
    let value_zig_ty = crate::emit::stmt::zig_type(&value_ty);

    let mut body = format!("{label}: {{\n");
    let depth1 = format!("{ind}    ");
    body.push_str(&format!("{depth1}var __result = runtime.Dict({key_zig_ty}, {value_zig_ty}).init(allocator);\n"));
    let nested = emit_dict_comprehension_body(ctx, key, value, generators, 0, &depth1)?;
    body.push_str(&nested);
    body.push_str(&format!("{depth1}break :{label} __result;\n"));
    body.push_str(&format!("{ind}}}"));
    ctx.pop_scope()?;
    Ok(body)
}

fn emit_dict_comprehension_body(ctx: &mut EmitContext, key: &Expr, value: &Expr, generators: &[crate::ast::Comprehension], idx: usize, indent: &str) -> Result<String> {
    if idx == generators.len() {
        let k = emit_expr(ctx, key)?;
        let v = emit_expr(ctx, value)?;
        return Ok(format!("{indent}try __result.put(allocator, {k}, {v});\n"));
    }
    let gen = &generators[idx];
    let iter = emit_expr(ctx, &gen.iter)?;
    let ExprKind::Name(target_name) = gen.target.kind.as_ref() else {
        return Ok(format!("{indent}// unsupported comprehension target\n"));
    };
    ctx.vars.declare(crate::vars::Binding::new(target_name, Type::Unknown))?;
    let target = ctx.escape_ident(target_name);
    let mut out = format!("{indent}for ({iter}.items) |{target}| {{\n");
    let inner_indent = format!("{indent}    ");
    for cond in &gen.ifs {
        let c = emit_truthy(ctx, cond)?;
        out.push_str(&format!("{inner_indent}if (!({c})) continue;\n"));
    }
    out.push_str(&emit_dict_comprehension_body(ctx, key, value, generators, idx + 1, &inner_indent)?);
    out.push_str(&format!("{indent}}}\n"));
    Ok(out)
}

/// Lambdas that capture no outer names become a free function (the binding becomes a
/// function pointer); capturing lambdas become a closure struct with an `invoke`
/// method (§4.5 Lambda).
fn emit_lambda(ctx: &mut EmitContext, params: &[String], body: &Expr) -> Result<String> {
    let captures = free_names(body, params);
    ctx.push_scope(true);
    for p in params {
        ctx.vars.declare(crate::vars::Binding::new(p, Type::Unknown))?;
    }
    let body_text = emit_expr(ctx, body)?;
    ctx.pop_scope()?;

    let param_list = params.iter().map(|p| format!("{}: anytype", ctx.escape_ident(p))).collect::<Vec<_>>().join(", ");

    if captures.is_empty() {
        Ok(format!("struct {{ pub fn call({param_list}) @TypeOf({body_text}) {{ return {body_text}; }} }}.call"))
    } else {
        let capture_fields = captures.iter().map(|c| format!("{}: @TypeOf({})", ctx.escape_ident(c), ctx.escape_ident(c))).collect::<Vec<_>>().join(", ");
        let capture_init = captures.iter().map(|c| ctx.escape_ident(c)).collect::<Vec<_>>().join(", ");
        Ok(format!(
            "(struct {{ {capture_fields}, pub fn invoke(self: @This(), {param_list}) @TypeOf({body_text}) {{ _ = self; return {body_text}; }} }}){{ {capture_init} }}"
        ))
    }
}

fn free_names(expr: &Expr, bound: &[String]) -> Vec<String> {
    let mut names = Vec::new();
    collect_names(expr, &mut names);
    names.into_iter().filter(|n| !bound.contains(n)).collect()
}

fn collect_names(expr: &Expr, out: &mut Vec<String>) {
    if let ExprKind::Name(n) = expr.kind.as_ref() {
        if !out.contains(n) {
            out.push(n.clone());
        }
    }
    match expr.kind.as_ref() {
        ExprKind::BinOp { left, right, .. } => {
            collect_names(left, out);
            collect_names(right, out);
        }
        ExprKind::UnaryOp { operand, .. } | ExprKind::Starred(operand) | ExprKind::Await(operand) => collect_names(operand, out),
        ExprKind::Call { func, args, .. } => {
            collect_names(func, out);
            args.iter().for_each(|a| collect_names(a, out));
        }
        ExprKind::Attribute { value, .. } => collect_names(value, out),
        ExprKind::Subscript { value, index } => {
            collect_names(value, out);
            collect_names(index, out);
        }
        ExprKind::IfExpr { test, body, orelse } => {
            collect_names(test, out);
            collect_names(body, out);
            collect_names(orelse, out);
        }
        ExprKind::Compare { left, comparators, .. } => {
            collect_names(left, out);
            comparators.iter().for_each(|e| collect_names(e, out));
        }
        ExprKind::BoolOp { values, .. } | ExprKind::List(values) | ExprKind::Tuple(values) | ExprKind::Set(values) => {
            values.iter().for_each(|e| collect_names(e, out));
        }
        _ => {}
    }
}
