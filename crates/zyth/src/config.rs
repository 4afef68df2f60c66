//! The configuration bundle §6 describes as part of the translator's input, alongside
//! the AST. `serde`-derived so the CLI can load a project-level override file instead
//! of always relying on `Config::default()`.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetLanguage {
    Zig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub target_language: TargetLanguage,
    pub runtime_module_names: Vec<String>,
    pub inline_module_names: Vec<String>,
    pub reserved_keywords: IndexSet<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_language: TargetLanguage::Zig,
            runtime_module_names: vec!["json".to_owned(), "random".to_owned()],
            inline_module_names: vec!["math".to_owned(), "os".to_owned()],
            reserved_keywords: ZIG_RESERVED_KEYWORDS.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

/// Zig's reserved-word set (https://ziglang.org/documentation/master/#Keyword-Reference),
/// used by the emitter context to decide when an identifier needs `@"..."` escaping (§4.4).
pub const ZIG_RESERVED_KEYWORDS: &[&str] = &[
    "align", "allowzero", "and", "anyframe", "anytype", "asm", "async", "await", "break", "callconv", "catch",
    "comptime", "const", "continue", "defer", "else", "enum", "errdefer", "error", "export", "extern", "fn", "for",
    "if", "inline", "noalias", "noinline", "nosuspend", "opaque", "or", "orelse", "packed", "pub", "resume", "return",
    "linksection", "struct", "suspend", "switch", "test", "threadlocal", "try", "union", "unreachable", "usingnamespace",
    "var", "volatile", "while",
];
