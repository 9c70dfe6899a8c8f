//! Shared typed models used across scanning, extraction, generation, and
//! the editor bridge.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Contract constants
// ---------------------------------------------------------------------------

/// A fixed set of method names a class in a given role must implement.
///
/// Contracts are compiled in; nothing scanned from disk can change them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterfaceContract {
    /// Human-readable role, e.g. "Controller".
    pub role: &'static str,
    /// Base identifier a class uses to claim the contract.
    pub interface: &'static str,
    pub required_methods: &'static [&'static str],
    /// `(alternate, canonical)` method name pairs flagged for renaming.
    pub aliases: &'static [(&'static str, &'static str)],
}

impl InterfaceContract {
    pub fn requires(&self, method: &str) -> bool {
        self.required_methods.contains(&method)
    }
}

pub const CONTROLLER_CONTRACT: InterfaceContract = InterfaceContract {
    role: "Controller",
    interface: "IController",
    required_methods: &["get", "post", "put", "destroy"],
    aliases: &[("delete", "destroy")],
};

pub const MODEL_CONTRACT: InterfaceContract = InterfaceContract {
    role: "Model",
    interface: "IModel",
    required_methods: &["create", "single", "list", "update", "remove"],
    aliases: &[("delete", "remove"), ("get", "single")],
};

/// LSP completion kind for snippets.
pub const COMPLETION_KIND_SNIPPET: u32 = 15;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Architectural role of a source file, derived from its directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Controller,
    Model,
    Table,
    Helper,
    Interface,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Controller,
        Category::Model,
        Category::Table,
        Category::Helper,
        Category::Interface,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Controller => "controller",
            Category::Model => "model",
            Category::Table => "table",
            Category::Helper => "helper",
            Category::Interface => "interface",
        }
    }

    /// Canonical pluralized key used in [`ProjectStructure`].
    pub fn plural(self) -> &'static str {
        match self {
            Category::Controller => "controllers",
            Category::Model => "models",
            Category::Table => "tables",
            Category::Helper => "helpers",
            Category::Interface => "interfaces",
        }
    }

    /// Glob selecting this category's files under a project root.
    pub fn default_glob(self) -> String {
        format!("{}/*.py", self.as_str())
    }

    /// Accepts the singular or plural form, case-insensitively.
    pub fn parse(value: &str) -> Option<Category> {
        let lowered = value.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered || c.plural() == lowered)
    }

    /// Contract implied by the category alone, if any.
    pub fn contract(self) -> Option<&'static InterfaceContract> {
        match self {
            Category::Controller => Some(&CONTROLLER_CONTRACT),
            Category::Model => Some(&MODEL_CONTRACT),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Project structure
// ---------------------------------------------------------------------------

/// Structural facts recorded for one class definition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub methods: Vec<String>,
    pub parent_class: Option<String>,
    pub imports: Vec<String>,
}

/// Category (plural) → class name → record, in discovery order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectStructure {
    categories: IndexMap<String, IndexMap<String, ClassRecord>>,
}

impl Default for ProjectStructure {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectStructure {
    /// An empty structure with every known category present.
    pub fn new() -> Self {
        let categories = Category::ALL
            .iter()
            .map(|c| (c.plural().to_string(), IndexMap::new()))
            .collect();
        Self { categories }
    }

    pub fn insert(&mut self, category: Category, class_name: String, record: ClassRecord) {
        self.categories
            .entry(category.plural().to_string())
            .or_default()
            .insert(class_name, record);
    }

    pub fn classes(&self, category: Category) -> Option<&IndexMap<String, ClassRecord>> {
        self.categories.get(category.plural())
    }

    pub fn get(&self, category: Category, class_name: &str) -> Option<&ClassRecord> {
        self.classes(category)?.get(class_name)
    }

    pub fn class_count(&self) -> usize {
        self.categories.values().map(IndexMap::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexMap<String, ClassRecord>)> {
        self.categories.iter()
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// Heuristic shape of one function definition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    pub argument_names: Vec<String>,
    pub decorator_names: Vec<String>,
    pub has_guarded_block: bool,
    pub returns_response_wrapper: bool,
    pub uses_scoped_session: bool,
    pub validates_input: bool,
}

impl Pattern {
    /// `(label, value)` pairs for the boolean characteristics.
    pub fn characteristics(&self) -> [(&'static str, bool); 4] {
        [
            ("Has Guarded Block", self.has_guarded_block),
            ("Returns Response Wrapper", self.returns_response_wrapper),
            ("Uses Scoped Session", self.uses_scoped_session),
            ("Validates Input", self.validates_input),
        ]
    }
}

/// Shape of one try block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorHandlingPattern {
    pub exceptions: Vec<String>,
    pub has_finally: bool,
    pub has_else: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameKind {
    Class,
    Method,
    Variable,
}

impl NameKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NameKind::Class => "class",
            NameKind::Method => "method",
            NameKind::Variable => "variable",
        }
    }
}

/// `{category}_{class|method|variable}` → observed identifiers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamingConventions {
    entries: IndexMap<String, IndexSet<String>>,
}

impl NamingConventions {
    pub fn key(category: Category, kind: NameKind) -> String {
        format!("{}_{}", category.as_str(), kind.as_str())
    }

    pub fn record(&mut self, category: Category, kind: NameKind, name: &str) {
        self.entries
            .entry(Self::key(category, kind))
            .or_default()
            .insert(name.to_string());
    }

    pub fn get(&self, category: Category, kind: NameKind) -> Option<&IndexSet<String>> {
        self.entries.get(&Self::key(category, kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexSet<String>)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn merge(&mut self, other: NamingConventions) {
        for (key, names) in other.entries {
            self.entries.entry(key).or_default().extend(names);
        }
    }
}

// ---------------------------------------------------------------------------
// Editor-integration records
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Suggestion => "suggestion",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(
        file: impl Into<String>,
        line: usize,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
            severity,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub label: String,
    #[serde(rename = "insertText")]
    pub insert_text: String,
    pub detail: String,
    pub kind: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub prefix: String,
    pub body: Vec<String>,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Generated bundle
// ---------------------------------------------------------------------------

/// Source text synthesized for one resource.
///
/// Either all three entries are non-empty, or all three are empty and the
/// generation failed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedBundle {
    pub controller: String,
    pub model: String,
    pub table: String,
}

impl GeneratedBundle {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.controller.is_empty() && self.model.is_empty() && self.table.is_empty()
    }

    pub fn entries(&self) -> [(&'static str, &str); 3] {
        [
            ("controller", self.controller.as_str()),
            ("model", self.model.as_str()),
            ("table", self.table.as_str()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_accepts_plural_and_case() {
        assert_eq!(Category::parse("Controllers"), Some(Category::Controller));
        assert_eq!(Category::parse("model"), Some(Category::Model));
        assert_eq!(Category::parse("views"), None);
    }

    #[test]
    fn test_project_structure_starts_with_all_categories() {
        let structure = ProjectStructure::new();
        let keys: Vec<&String> = structure.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["controllers", "models", "tables", "helpers", "interfaces"]
        );
        assert_eq!(structure.class_count(), 0);
    }

    #[test]
    fn test_naming_conventions_dedupe_in_discovery_order() {
        let mut naming = NamingConventions::default();
        naming.record(Category::Model, NameKind::Method, "list");
        naming.record(Category::Model, NameKind::Method, "create");
        naming.record(Category::Model, NameKind::Method, "list");
        let methods: Vec<&String> = naming
            .get(Category::Model, NameKind::Method)
            .unwrap()
            .iter()
            .collect();
        assert_eq!(methods, vec!["list", "create"]);
    }

    #[test]
    fn test_completion_serializes_insert_text_camel_case() {
        let completion = Completion {
            label: "UserController".into(),
            insert_text: "class UserController".into(),
            detail: "Create new controllers UserController".into(),
            kind: COMPLETION_KIND_SNIPPET,
        };
        let json = serde_json::to_value(&completion).unwrap();
        assert_eq!(json["insertText"], "class UserController");
        assert_eq!(json["kind"], 15);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
