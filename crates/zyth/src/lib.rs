#![doc = include_str!("../../../README.md")]

pub mod ast;
pub mod builtins;
pub mod comptime;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod emit;
pub mod errors;
pub mod frontend;
pub mod imports;
pub mod infer;
pub mod mutation;
pub mod types;
pub mod vars;

use diagnostics::Diagnostic;
use errors::{Component, Result, TranslateError};

/// The translated output plus any non-fatal diagnostics accumulated along the way
/// (§4.11, C11).
#[derive(Debug, Clone)]
pub struct Translation {
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Translates an already-parsed module. The public entry point for callers that have
/// their own `ruff_python_parser` pipeline (editor integrations, batch tooling).
pub fn translate(module: &ast::Module, config: &config::Config) -> Result<Translation> {
    let mutation = mutation::analyze(&module.body);
    let mut ctx = context::EmitContext::new(&mutation, config);

    ctx.write_line("const std = @import(\"std\");");
    ctx.write_line("const runtime = @import(\"runtime.zig\");");
    ctx.write_raw("\n");

    emit::stmt::emit_block(&mut ctx, &module.body)?;

    Ok(Translation { source: ctx.out, diagnostics: ctx.diagnostics.into_vec() })
}

/// Parses `source` and translates it in one step (§4.11).
pub fn translate_source(source: &str, path: &str, config: &config::Config) -> Result<Translation> {
    let parsed = ruff_python_parser::parse_module(source)
        .map_err(|err| TranslateError::ParseFailure(format!("{path}: {err}")))?;
    let module = frontend::lower_module(parsed.syntax()).map_err(|err| match err {
        TranslateError::InternalInconsistency { detail, .. } => TranslateError::ParseFailure(format!("{path}: {detail}")),
        other => other,
    })?;
    translate(&module, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn translates_trivial_assignment() {
        let config = config::Config::default();
        let result = translate_source("x = 1\n", "<test>", &config).expect("translation should succeed");
        assert!(result.source.contains("const x = 1;"));
    }

    #[test]
    fn rejects_unsupported_syntax_as_parse_failure() {
        let config = config::Config::default();
        let err = translate_source("match x:\n    case _:\n        pass\n", "<test>", &config).unwrap_err();
        assert!(matches!(err, TranslateError::ParseFailure(_)));
    }

    #[test]
    fn determinism_same_input_same_output() {
        let config = config::Config::default();
        let source = "def add(a, b):\n    return a + b\n";
        let first = translate_source(source, "<test>", &config).unwrap();
        let second = translate_source(source, "<test>", &config).unwrap();
        assert_eq!(first.source, second.source);
    }

    #[test]
    fn unknown_component_reported_as_internal_inconsistency() {
        let err = TranslateError::internal(Component::Emitter, "scope stack underflow");
        assert!(matches!(err, TranslateError::InternalInconsistency { .. }));
    }
}
