//! Fatal error model (§7). Non-fatal recoveries are represented by [`crate::diagnostics::Diagnostic`]
//! rather than by this enum — only conditions that abort the current translation unit live here.

use std::fmt;

/// Where in the pipeline a fatal failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Lowering,
    Inferrer,
    Mutation,
    Emitter,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lowering => "lowering",
            Self::Inferrer => "inferrer",
            Self::Mutation => "mutation",
            Self::Emitter => "emitter",
        };
        f.write_str(name)
    }
}

/// Fatal errors the translator can raise. See SPEC_FULL.md §7.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// The input could not be parsed, or the parsed syntax falls outside the
    /// accepted subset in a way that cannot be recovered from locally.
    #[error("parse failure: {0}")]
    ParseFailure(String),

    /// A translator-internal invariant was violated (double scope pop, rename-map
    /// collision, a name re-declared as fresh in a scope that already declared it, …).
    /// Always a translator bug, never a property of the input program.
    #[error("internal inconsistency in {component}: {detail}")]
    InternalInconsistency { component: Component, detail: String },

    /// Class inheritance forms a cycle.
    #[error("cyclic base class in {class_name!r}")]
    CyclicInheritance { class_name: String },

    /// A name was read before ever being bound in any reachable scope.
    #[error("name {name!r} is never bound")]
    UnboundName { name: String },

    /// The host ran out of memory while translating. Propagated unchanged.
    #[error("out of memory while translating")]
    OutOfMemory,
}

impl TranslateError {
    pub fn internal(component: Component, detail: impl Into<String>) -> Self {
        Self::InternalInconsistency { component, detail: detail.into() }
    }
}

pub type Result<T> = std::result::Result<T, TranslateError>;
