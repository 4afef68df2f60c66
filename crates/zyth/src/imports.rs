//! Import registry (§4.8, C9). Resolves source module imports to either a target
//! runtime module or an inline-codegen marker; modules absent from the registry are
//! "skipped" and any statement that transitively references them is dropped.

use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportInfo {
    /// The module has a runtime-library counterpart reachable at this target path.
    RuntimeModule(String),
    /// The module has no runtime counterpart; call sites are expanded inline by C8.
    InlineCodegen,
}

#[derive(Debug, Default)]
pub struct ImportRegistry {
    known: IndexMap<String, ImportInfo>,
    /// Names bound by `from module import name` where `module` has no runtime
    /// counterpart — consulted by C8 so bare references still resolve (§4.6.9).
    local_from_imports: IndexMap<String, String>,
    skipped: IndexMap<String, ()>,
}

impl ImportRegistry {
    pub fn new(runtime_module_names: &[String], inline_module_names: &[String]) -> Self {
        let mut known = IndexMap::new();
        for name in runtime_module_names {
            known.insert(name.clone(), ImportInfo::RuntimeModule(name.clone()));
        }
        for name in inline_module_names {
            known.insert(name.clone(), ImportInfo::InlineCodegen);
        }
        Self { known, local_from_imports: IndexMap::new(), skipped: IndexMap::new() }
    }

    pub fn lookup(&self, name: &str) -> Option<&ImportInfo> {
        self.known.get(name)
    }

    /// Registers a module import; returns `false` (and records it as skipped) if the
    /// module is unknown, so the caller can drop the `import` statement silently.
    pub fn register_import(&mut self, module: &str) -> bool {
        if self.known.contains_key(module) {
            true
        } else {
            self.skipped.insert(module.to_owned(), ());
            false
        }
    }

    pub fn register_from_import(&mut self, module: &str, local_name: &str) -> bool {
        if self.known.contains_key(module) {
            true
        } else {
            self.skipped.insert(module.to_owned(), ());
            self.local_from_imports.insert(local_name.to_owned(), module.to_owned());
            false
        }
    }

    pub fn is_skipped_module(&self, module: &str) -> bool {
        self.skipped.contains_key(module)
    }

    pub fn is_from_skipped_module(&self, local_name: &str) -> bool {
        self.local_from_imports.contains_key(local_name)
    }
}
