//! Builtin & module dispatch (§4.7, C8). A fixed table keyed by source name selects
//! one of: an inline expansion into target code, a call into the runtime library, or a
//! `Type::Unknown`-typed stub wrapped in a discard when unused.

use crate::types::Type;

/// How a call to a known builtin should be lowered by the expression emitter (C6).
#[derive(Debug, Clone)]
pub enum BuiltinDispatch {
    /// Expand inline, e.g. `len(x)` → `.len()` or `.items.len` depending on the
    /// argument's type (decided by the emitter, not here — this variant just says
    /// "this name is handled inline").
    Inline,
    /// Call straight into the runtime support library under this symbol name.
    RuntimeCall(&'static str),
    /// No target-side mapping exists; emit a type-consistent stub so downstream code
    /// keeps type-checking (§4.7 `nt.getcwd()` example).
    Stub(&'static str),
}

/// Fixed table of source built-in function names this translator understands.
pub fn dispatch(name: &str) -> Option<BuiltinDispatch> {
    use BuiltinDispatch::{Inline, RuntimeCall};
    Some(match name {
        "len" | "print" | "range" | "enumerate" | "zip" | "min" | "max" | "abs" | "sum" | "sorted" | "reversed" | "int" | "float" | "str" | "bool" | "list" | "dict" | "set" | "tuple" | "isinstance" | "repr" => Inline,
        "input" => RuntimeCall("runtime.readLine"),
        "open" => RuntimeCall("runtime.fileOpen"),
        "round" => RuntimeCall("runtime.round"),
        _ => return None,
    })
}

/// Return type of a call to a known built-in (§4.1 Call rule 2: "call of a known
/// builtin consults a fixed table").
pub fn builtin_return_type(name: &str) -> Option<Type> {
    Some(match name {
        "len" => Type::Int,
        "abs" | "sum" | "int" => Type::Int,
        "round" | "float" => Type::Float,
        "str" | "repr" | "input" => Type::String,
        "bool" | "isinstance" => Type::Bool,
        "list" | "sorted" | "reversed" => Type::list_of(Type::Unknown),
        "dict" => Type::dict_of(Type::Unknown, Type::Unknown),
        "print" => Type::None,
        "range" => Type::Unknown, // an iterator, never bound to a value type itself
        "min" | "max" => Type::Unknown,
        _ => return None,
    })
}

/// Whether `strip`/`lower`/etc. return a freshly heap-allocated string that the
/// binding it's assigned to must release — Open Question (b) in SPEC_FULL.md §9,
/// resolved by this fixed allocation table rather than guessed per call site.
pub fn string_method_allocates(method: &str) -> bool {
    matches!(method, "strip" | "lstrip" | "rstrip" | "lower" | "upper" | "replace" | "join" | "format")
}

/// `module.function` return type, consulted when a call target is `Attribute { Name(module), attr }`.
pub fn module_function_return_type(module: &str, attr: &str) -> Option<Type> {
    match (module, attr) {
        ("math", "sqrt" | "floor" | "ceil" | "pow" | "log" | "sin" | "cos") => Some(Type::Float),
        ("math", "gcd" | "factorial") => Some(Type::Int),
        ("os", "getcwd") => Some(Type::String),
        ("json", "dumps") => Some(Type::String),
        ("json", "loads") => Some(Type::Unknown),
        ("random", "random") => Some(Type::Float),
        ("random", "randint") => Some(Type::Int),
        _ => None,
    }
}

/// Closed set of source exceptions the try/except emitter (§4.6.5) maps to target
/// error tags. Order here is the fixed precedence order handlers are tested in.
pub const KNOWN_EXCEPTIONS: &[&str] = &[
    "ValueError",
    "TypeError",
    "RuntimeError",
    "KeyError",
    "IndexError",
    "ZeroDivisionError",
    "AttributeError",
    "NameError",
    "FileNotFoundError",
    "IOError",
    "Exception",
    "StopIteration",
    "NotImplementedError",
    "AssertionError",
    "OverflowError",
    "ImportError",
    "OSError",
    "PermissionError",
    "TimeoutError",
    "ConnectionError",
    "RecursionError",
    "MemoryError",
    "LookupError",
    "ArithmeticError",
    "BufferError",
    "EOFError",
    "GeneratorExit",
    "SystemExit",
    "KeyboardInterrupt",
];

/// Maps a known source exception name to the target error tag emitted in a Zig error
/// set (§4.6.5). Exhaustive over `KNOWN_EXCEPTIONS` by construction.
pub fn exception_error_tag(name: &str) -> Option<&'static str> {
    KNOWN_EXCEPTIONS.iter().find(|&&n| n == name).map(|_| match name {
        "ValueError" => "error.ValueError",
        "TypeError" => "error.TypeError",
        "RuntimeError" => "error.RuntimeError",
        "KeyError" => "error.KeyError",
        "IndexError" => "error.IndexError",
        "ZeroDivisionError" => "error.DivByZero",
        "AttributeError" => "error.AttributeError",
        "NameError" => "error.NameError",
        "FileNotFoundError" => "error.FileNotFoundError",
        "IOError" | "OSError" => "error.IoError",
        "Exception" => "error.Exception",
        "StopIteration" => "error.StopIteration",
        "NotImplementedError" => "error.NotImplemented",
        "AssertionError" => "error.AssertionFailed",
        "OverflowError" => "error.Overflow",
        "ImportError" => "error.ImportError",
        "PermissionError" => "error.PermissionDenied",
        "TimeoutError" => "error.Timeout",
        "ConnectionError" => "error.ConnectionError",
        "RecursionError" => "error.RecursionLimit",
        "MemoryError" => "error.OutOfMemory",
        "LookupError" => "error.LookupError",
        "ArithmeticError" => "error.ArithmeticError",
        "BufferError" => "error.BufferError",
        "EOFError" => "error.EndOfFile",
        "GeneratorExit" => "error.GeneratorExit",
        "SystemExit" => "error.SystemExit",
        "KeyboardInterrupt" => "error.KeyboardInterrupt",
        _ => unreachable!("name was found in KNOWN_EXCEPTIONS"),
    })
}
