//! Variable binding metadata and the per-scope tracker (§3 `Binding`, §2 C4).

use indexmap::IndexMap;

use crate::types::Type;

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub ty: Type,
    pub is_mutated: bool,
    pub is_used: bool,
    pub is_captured_by_closure: bool,
    pub allocates: bool,
    pub is_arraylist: bool,
    pub is_global: bool,
    pub is_hoisted: bool,
}

impl Binding {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        let allocates = ty.is_heap_owning();
        let is_arraylist = ty.is_arraylist_candidate();
        Self {
            name: name.into(),
            ty,
            is_mutated: false,
            is_used: false,
            is_captured_by_closure: false,
            allocates,
            is_arraylist,
            is_global: false,
            is_hoisted: false,
        }
    }

    /// Declared-immutable iff never mutated and not itself a collection requiring a
    /// `mutable` keyword regardless of mutation count (§4.6.1 step 5).
    pub fn is_declared_mutable(&self, is_dict: bool, is_mutable_class_instance: bool, is_listcomp: bool) -> bool {
        self.is_arraylist || is_dict || is_mutable_class_instance || self.is_mutated || is_listcomp
    }
}

/// One lexical scope: loop body, function body, comprehension, try-helper, or module top level.
#[derive(Debug, Default)]
pub struct Scope {
    pub declared: IndexMap<String, Binding>,
    pub hoisted: Vec<String>,
    pub is_function_scope: bool,
}

/// Per-scope set of declared/hoisted/global/renamed names (§2 C4).
///
/// `var_renames` backs the exception-handler pointer-capture substitution described in
/// §4.6.5: a name that must be read through a helper's by-pointer parameter is mapped to
/// its dereferenced emitted form for the duration of that helper's body.
#[derive(Debug, Default)]
pub struct VarTracker {
    scopes: Vec<Scope>,
    pub var_renames: IndexMap<String, String>,
    global_names: IndexMap<String, Binding>,
}

impl VarTracker {
    pub fn new() -> Self {
        let mut tracker = Self::default();
        tracker.push_scope(true);
        tracker
    }

    pub fn push_scope(&mut self, is_function_scope: bool) {
        self.scopes.push(Scope { is_function_scope, ..Scope::default() });
    }

    /// Pops the current scope, returning its bindings so the emitter can generate LIFO
    /// release statements before the enclosing braces close (invariant: release order is
    /// reverse to creation order).
    pub fn pop_scope(&mut self) -> crate::errors::Result<Vec<Binding>> {
        let scope = self.scopes.pop().ok_or_else(|| {
            crate::errors::TranslateError::internal(crate::errors::Component::Emitter, "popped an empty scope stack")
        })?;
        let mut bindings: Vec<Binding> = scope.declared.into_values().collect();
        bindings.reverse();
        Ok(bindings)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|s| s.declared.contains_key(name)) || self.global_names.contains_key(name)
    }

    pub fn is_declared_in_current_scope(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|s| s.declared.contains_key(name))
    }

    pub fn is_global_var(&self, name: &str) -> bool {
        self.global_names.contains_key(name) && !self.scopes.last().is_some_and(|s| s.declared.contains_key(name))
    }

    pub fn declare(&mut self, binding: Binding) -> crate::errors::Result<()> {
        let scope = self.scopes.last_mut().ok_or_else(|| {
            crate::errors::TranslateError::internal(crate::errors::Component::Emitter, "no scope to declare into")
        })?;
        if scope.declared.contains_key(&binding.name) {
            return Err(crate::errors::TranslateError::internal(
                crate::errors::Component::Emitter,
                format!("{} redeclared in the same scope", binding.name),
            ));
        }
        scope.declared.insert(binding.name.clone(), binding);
        Ok(())
    }

    pub fn declare_global(&mut self, binding: Binding) {
        self.global_names.insert(binding.name.clone(), binding);
    }

    pub fn mark_global(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.hoisted.retain(|n| n != name);
        }
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|s| s.declared.get(name)).or_else(|| self.global_names.get(name))
    }

    pub fn binding_mut(&mut self, name: &str) -> Option<&mut Binding> {
        for scope in self.scopes.iter_mut().rev() {
            if scope.declared.contains_key(name) {
                return scope.declared.get_mut(name);
            }
        }
        self.global_names.get_mut(name)
    }

    pub fn hoist(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.hoisted.push(name.to_owned());
        }
    }
}
