//! Warn-and-continue recoveries (§7, §4.10). These never abort translation; they are
//! both logged through `tracing` as they happen and accumulated so a caller (the CLI,
//! an editor integration) can inspect the full list without re-scanning stderr.

use std::fmt;

/// A stable machine-readable recovery code, independent of the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCode {
    SkippedModuleReference,
    UnsupportedConstruct,
    UnknownType,
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SkippedModuleReference => "skipped-module-reference",
            Self::UnsupportedConstruct => "unsupported-construct",
            Self::UnknownType => "unknown-type",
        };
        f.write_str(s)
    }
}

/// A single non-fatal recovery recorded during translation.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub component: &'static str,
    pub line: u32,
    pub column: u32,
    pub detail: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: [{}] {}: {}", self.line, self.column, self.component, self.code, self.detail)
    }
}

/// Accumulates diagnostics during a single `translate` call and mirrors each one to
/// `tracing` as it is recorded, so `RUST_LOG=warn` streams them live even for a
/// translation unit that never completes (e.g. it is later aborted by a fatal error).
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, code: DiagnosticCode, component: &'static str, line: u32, column: u32, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::warn!(component, code = %code, line, column, %detail, "translation recovery");
        self.records.push(Diagnostic { code, component, line, column, detail });
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
