//! Emitter context (§4.4, C5). Threaded by mutable reference through every emission
//! call: the output buffer, indent depth, gensym counters, the rename map, and a
//! handful of emission flags.

use indexmap::IndexSet;

use crate::{config::Config, diagnostics::Diagnostics, imports::ImportRegistry, infer::Inferrer, mutation::MutationAnalysis, vars::VarTracker};

#[derive(Debug, Default)]
struct GensymCounters {
    try_helper: u32,
    unpack_tmp: u32,
    zip_iter: u32,
    enum_idx: u32,
    attr_tmp: u32,
    cmp_tmp: u32,
    assert_block: u32,
}

/// Output buffer, indent level, and helper state threaded through the whole emission
/// pipeline (§3 "Emitter context (C5)").
pub struct EmitContext<'a> {
    pub out: String,
    indent: u32,
    pub vars: VarTracker,
    pub inferrer: Inferrer,
    pub mutation: &'a MutationAnalysis,
    pub imports: ImportRegistry,
    pub diagnostics: Diagnostics,
    pub config: &'a Config,
    counters: GensymCounters,
    /// Name of the function currently being emitted, for tail-call detection (§4.6.4).
    pub current_function: Option<String>,
    pub in_assert_raises_context: bool,
    declared_reserved: IndexSet<String>,
    /// One entry per currently-open loop; `Some(flag)` names the `bool` variable a
    /// `while`/`for`-`else` clause is guarded by, so `break` can clear it before jumping
    /// out (§4.6.3). `None` for loops with no `else` clause.
    loop_else_flags: Vec<Option<String>>,
}

impl<'a> EmitContext<'a> {
    pub fn new(mutation: &'a MutationAnalysis, config: &'a Config) -> Self {
        Self {
            out: String::new(),
            indent: 0,
            vars: VarTracker::new(),
            inferrer: Inferrer::new(),
            mutation,
            imports: ImportRegistry::new(&config.runtime_module_names, &config.inline_module_names),
            diagnostics: Diagnostics::new(),
            config,
            counters: GensymCounters::default(),
            current_function: None,
            in_assert_raises_context: false,
            declared_reserved: config.reserved_keywords.clone(),
            loop_else_flags: Vec::new(),
        }
    }

    pub fn push_scope(&mut self, is_function_scope: bool) {
        self.vars.push_scope(is_function_scope);
        self.indent += 1;
    }

    pub fn pop_scope(&mut self) -> crate::errors::Result<Vec<crate::vars::Binding>> {
        self.indent = self.indent.saturating_sub(1);
        self.vars.pop_scope()
    }

    pub fn indent_str(&self) -> String {
        "    ".repeat(self.indent as usize)
    }

    pub fn write_line(&mut self, line: &str) {
        self.out.push_str(&self.indent_str());
        self.out.push_str(line);
        self.out.push('\n');
    }

    pub fn write_raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Escapes `name` if it collides with a target reserved word (§4.4, testable
    /// property 6). Zig's escape hatch is the `@"..."` syntactic wrapper.
    pub fn escape_ident(&self, name: &str) -> String {
        if self.declared_reserved.contains(name) {
            format!("@\"{name}\"")
        } else {
            name.to_owned()
        }
    }

    pub fn gensym_try_helper(&mut self) -> String {
        self.counters.try_helper += 1;
        format!("__try_helper_{}", self.counters.try_helper)
    }

    pub fn gensym_unpack_tmp(&mut self) -> String {
        self.counters.unpack_tmp += 1;
        format!("__unpack_tmp_{}", self.counters.unpack_tmp)
    }

    pub fn gensym_zip_iter(&mut self) -> String {
        self.counters.zip_iter += 1;
        format!("__zip_iter_{}", self.counters.zip_iter)
    }

    pub fn gensym_enum_idx(&mut self) -> String {
        self.counters.enum_idx += 1;
        format!("__enum_idx_{}", self.counters.enum_idx)
    }

    pub fn gensym_attr_tmp(&mut self) -> String {
        self.counters.attr_tmp += 1;
        format!("__attr_tmp_{}", self.counters.attr_tmp)
    }

    pub fn gensym_cmp_tmp(&mut self) -> String {
        self.counters.cmp_tmp += 1;
        format!("__cmp_tmp_{}", self.counters.cmp_tmp)
    }

    pub fn gensym_assert_block(&mut self) -> String {
        self.counters.assert_block += 1;
        format!("__assert_block_{}", self.counters.assert_block)
    }

    pub fn loc(&self, range: ruff_text_size::TextRange, source: &str) -> (u32, u32) {
        line_col(source, range)
    }

    pub fn push_loop(&mut self, else_flag: Option<String>) {
        self.loop_else_flags.push(else_flag);
    }

    pub fn pop_loop(&mut self) {
        self.loop_else_flags.pop();
    }

    /// The `else`-guard flag of the innermost currently-open loop, if it has one.
    pub fn current_loop_else_flag(&self) -> Option<&str> {
        self.loop_else_flags.last().and_then(|f| f.as_deref())
    }
}

/// Computes a 1-based (line, column) pair for a byte offset, used only for diagnostic
/// reporting — never influences emitted output, preserving determinism (§5).
fn line_col(source: &str, range: ruff_text_size::TextRange) -> (u32, u32) {
    let offset = usize::from(range.start());
    let mut line = 1u32;
    let mut col = 1u32;
    for ch in source[..offset.min(source.len())].chars() {
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}
