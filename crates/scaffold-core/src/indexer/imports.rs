//! Import-relationship extraction from lowered modules.

use crate::indexer::syntax::{walk_module, Import, ImportFrom, Module, Visitor};

#[derive(Default)]
struct ImportCollector {
    qualified: Vec<String>,
    modules: Vec<String>,
}

impl Visitor for ImportCollector {
    fn visit_import(&mut self, import: &Import) {
        self.qualified.extend(import.names.iter().cloned());
        self.modules.extend(import.names.iter().cloned());
    }

    fn visit_import_from(&mut self, import: &ImportFrom) {
        for name in &import.names {
            self.qualified.push(join_module(&import.module, name));
        }
        self.modules.push(import.module.clone());
    }
}

fn join_module(module: &str, name: &str) -> String {
    if module.ends_with('.') {
        format!("{module}{name}")
    } else {
        format!("{module}.{name}")
    }
}

/// Every import in the file, qualified by its source module:
/// `import a.b` → `a.b`, `from x import y` → `x.y`, `from . import z` → `.z`.
pub fn qualified_imports(module: &Module) -> Vec<String> {
    let mut collector = ImportCollector::default();
    walk_module(&mut collector, module);
    collector.qualified
}

/// Module names the file depends on: `import a.b` → `a.b`,
/// `from x import y` → `x`.
pub fn imported_modules(module: &Module) -> Vec<String> {
    let mut collector = ImportCollector::default();
    walk_module(&mut collector, module);
    collector.modules
}
