//! The inferred-type lattice (§3, C1). `Type` is the value every expression node
//! resolves to; join-like widening rules live on [`Type::join`].

use indexmap::IndexMap;

pub type ClassName = String;
pub type ClosureId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    Bool,
    String,
    None,
    List(Box<Type>),
    Array(Box<Type>, usize),
    Tuple(Vec<Type>),
    Dict(Box<Type>, Box<Type>),
    ClassInstance(ClassName),
    Closure(ClosureId),
    /// Escape hatch for values whose static type cannot be determined.
    Unknown,
}

impl Type {
    pub fn list_of(t: Type) -> Type {
        Type::List(Box::new(t))
    }

    pub fn dict_of(k: Type, v: Type) -> Type {
        Type::Dict(Box::new(k), Box::new(v))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// True for the primitive tags `ComptimeValue` can hold and the emitter can fold into
    /// a compile-time constant (§4.3): ints, floats, bools.
    pub fn is_foldable_primitive(&self) -> bool {
        matches!(self, Type::Int | Type::Float | Type::Bool)
    }

    /// Whether a binding of this type owns heap memory and therefore needs exactly one
    /// release statement at scope exit (§3 invariants, testable property 4).
    pub fn is_heap_owning(&self) -> bool {
        match self {
            Type::String | Type::List(_) | Type::Dict(_, _) => true,
            Type::Array(elem, _) => elem.is_heap_owning(),
            Type::Tuple(elems) => elems.iter().any(Type::is_heap_owning),
            Type::ClassInstance(_) | Type::Closure(_) => false,
            Type::Int | Type::Float | Type::Bool | Type::None | Type::Unknown => false,
        }
    }

    pub fn is_arraylist_candidate(&self) -> bool {
        matches!(self, Type::List(_))
    }

    /// Join-like widening used when unifying heterogeneous literal collections
    /// (§4.1): compatible numeric pairs widen to `Float`, anything else widens to
    /// `Unknown` rather than failing, because the translator must still emit *something*.
    pub fn join(&self, other: &Type) -> Type {
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (Type::Int, Type::Float) | (Type::Float, Type::Int) => Type::Float,
            (Type::List(a), Type::List(b)) => Type::list_of(a.join(b)),
            _ => Type::Unknown,
        }
    }
}

/// Per-variable / per-value constant folded by the compile-time evaluator (§3, C3).
#[derive(Debug, Clone, PartialEq)]
pub enum ComptimeValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(Vec<u8>),
    List(Vec<ComptimeValue>),
}

impl ComptimeValue {
    pub fn type_of(&self) -> Type {
        match self {
            ComptimeValue::Int(_) => Type::Int,
            ComptimeValue::Float(_) => Type::Float,
            ComptimeValue::Bool(_) => Type::Bool,
            ComptimeValue::String(_) => Type::String,
            ComptimeValue::List(items) => {
                let elem = items.first().map_or(Type::Int, ComptimeValue::type_of);
                Type::list_of(elem)
            }
        }
    }

    /// Only `Int | Float | Bool` are ever emitted as compile-time constants (§4.3);
    /// strings/lists fall through to runtime code.
    pub fn is_emittable_constant(&self) -> bool {
        matches!(self, ComptimeValue::Int(_) | ComptimeValue::Float(_) | ComptimeValue::Bool(_))
    }
}

/// A function's recorded signature (§3). Populated by [`crate::infer::Inferrer::record_function`]
/// before the statement emitter walks the body.
#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub name: String,
    pub params: Vec<(String, Type)>,
    pub return_type: Type,
    pub needs_allocator: bool,
    pub is_async: bool,
    pub is_recursive: bool,
}

/// A class's field layout (§3). Field order equals declaration order in `__init__`
/// (invariant); `IndexMap` preserves that without a separate order vector.
#[derive(Debug, Clone, Default)]
pub struct ClassInfo {
    pub name: String,
    pub fields: IndexMap<String, Type>,
    pub methods: Vec<MethodInfo>,
    pub is_mutable: bool,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    pub mutates_self: bool,
}
