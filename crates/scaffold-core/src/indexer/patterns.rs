//! Structural pattern extraction from Python sources.
//!
//! The per-function characteristics are shape and substring heuristics over
//! the lowered tree, not semantic analysis: a method that calls
//! `self.validate_later()` counts as validating input, and a `with` over
//! anything whose text mentions `Session` counts as a scoped session. False
//! positives are acceptable because the results are advisory.

use indexmap::{IndexMap, IndexSet};

use crate::errors::ScaffoldResult;
use crate::indexer::imports::{imported_modules, qualified_imports};
use crate::indexer::parser::PythonParser;
use crate::indexer::syntax::{
    descendants, walk_module, walk_nodes, walk_try, Assign, Callee, ClassDef, FunctionDef,
    Module, SyntaxNode, TryBlock, Visitor,
};
use crate::models::{
    Category, ClassRecord, ErrorHandlingPattern, NameKind, NamingConventions, Pattern,
    ProjectStructure,
};

/// A class definition together with where it was found.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedClass {
    pub name: String,
    pub line: usize,
    /// Identifier bases only, in header order.
    pub base_names: Vec<String>,
    pub record: ClassRecord,
}

/// Everything extracted from one file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileExtraction {
    pub classes: Vec<ExtractedClass>,
    pub patterns: Vec<Pattern>,
    pub error_handling: Vec<ErrorHandlingPattern>,
    pub naming: NamingConventions,
    /// Imported module names.
    pub relationships: Vec<String>,
}

impl FileExtraction {
    /// The file's contribution to a [`ProjectStructure`].
    pub fn structure_fragment(&self, category: Category) -> ProjectStructure {
        let mut structure = ProjectStructure::new();
        for class in &self.classes {
            structure.insert(category, class.name.clone(), class.record.clone());
        }
        structure
    }
}

/// Everything extracted for one category, in discovery order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryCatalog {
    pub method_patterns: Vec<Pattern>,
    pub error_handling: Vec<ErrorHandlingPattern>,
    pub naming: NamingConventions,
    pub relationships: IndexSet<String>,
}

/// Per-category accumulation of [`FileExtraction`]s for one session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatternCatalog {
    categories: IndexMap<Category, CategoryCatalog>,
}

impl PatternCatalog {
    pub fn absorb(&mut self, category: Category, extraction: &FileExtraction) {
        let entry = self.categories.entry(category).or_default();
        entry
            .method_patterns
            .extend(extraction.patterns.iter().cloned());
        entry
            .error_handling
            .extend(extraction.error_handling.iter().cloned());
        entry.naming.merge(extraction.naming.clone());
        entry
            .relationships
            .extend(extraction.relationships.iter().cloned());
    }

    pub fn get(&self, category: Category) -> Option<&CategoryCatalog> {
        self.categories.get(&category)
    }

    pub fn pattern_count(&self) -> usize {
        self.categories
            .values()
            .map(|c| c.method_patterns.len())
            .sum()
    }
}

pub struct PatternExtractor {
    parser: PythonParser,
}

impl PatternExtractor {
    pub fn new() -> ScaffoldResult<Self> {
        Ok(Self {
            parser: PythonParser::new()?,
        })
    }

    /// Parse `text` and extract it. Fails only with a parse error.
    pub fn extract(
        &mut self,
        text: &str,
        category: Category,
        path: &str,
    ) -> ScaffoldResult<FileExtraction> {
        let module = self.parser.parse(text, path)?;
        Ok(extract_module(&module, category))
    }
}

/// Extract an already-parsed module.
pub fn extract_module(module: &Module, category: Category) -> FileExtraction {
    let mut visitor = FileVisitor {
        category,
        imports: qualified_imports(module),
        out: FileExtraction {
            relationships: imported_modules(module),
            ..FileExtraction::default()
        },
    };
    walk_module(&mut visitor, module);
    visitor.out
}

struct FileVisitor {
    category: Category,
    imports: Vec<String>,
    out: FileExtraction,
}

impl Visitor for FileVisitor {
    fn visit_class(&mut self, class: &ClassDef) {
        self.out
            .naming
            .record(self.category, NameKind::Class, &class.name);
        self.out.classes.push(ExtractedClass {
            name: class.name.clone(),
            line: class.line,
            base_names: class
                .bases
                .iter()
                .filter_map(|b| b.name().map(str::to_string))
                .collect(),
            record: ClassRecord {
                methods: class.methods().map(|m| m.name.clone()).collect(),
                parent_class: class
                    .bases
                    .first()
                    .and_then(|b| b.name())
                    .map(str::to_string),
                imports: self.imports.clone(),
            },
        });
        walk_nodes(self, &class.body);
    }

    fn visit_function(&mut self, function: &FunctionDef) {
        self.out
            .naming
            .record(self.category, NameKind::Method, &function.name);
        self.out.patterns.push(method_pattern(function));
        walk_nodes(self, &function.body);
    }

    fn visit_try(&mut self, block: &TryBlock) {
        self.out.error_handling.push(ErrorHandlingPattern {
            exceptions: block
                .handlers
                .iter()
                .flat_map(|h| h.exceptions.iter().cloned())
                .collect(),
            has_finally: block.finalbody.is_some(),
            has_else: block.orelse.is_some(),
        });
        walk_try(self, block);
    }

    fn visit_assign(&mut self, assign: &Assign) {
        for target in &assign.targets {
            self.out
                .naming
                .record(self.category, NameKind::Variable, target);
        }
        walk_nodes(self, &assign.value);
    }
}

/// Heuristic characteristics of one function body.
pub fn method_pattern(function: &FunctionDef) -> Pattern {
    let nodes = descendants(&function.body);
    Pattern {
        name: function.name.clone(),
        argument_names: function.params.clone(),
        decorator_names: function.decorators.clone(),
        has_guarded_block: nodes.iter().any(|n| matches!(n, SyntaxNode::Try(_))),
        returns_response_wrapper: nodes.iter().any(|n| is_response_return(n)),
        uses_scoped_session: nodes.iter().any(|n| is_session_scope(n)),
        validates_input: nodes.iter().any(|n| is_validate_call(n)),
    }
}

/// `return Response.success(...)`, `return self.JsonResponse(...)`.
pub fn is_response_return(node: &SyntaxNode) -> bool {
    let SyntaxNode::Return(ret) = node else {
        return false;
    };
    match ret.value.as_deref() {
        Some(SyntaxNode::Call(call)) => match &call.callee {
            Callee::Attribute { receiver, member } => {
                receiver == "Response" || member.contains("Response")
            }
            _ => false,
        },
        _ => false,
    }
}

/// `with self.Session() as session:` and friends.
pub fn is_session_scope(node: &SyntaxNode) -> bool {
    match node {
        SyntaxNode::With(block) => block
            .items
            .first()
            .map(|item| item.contains("Session"))
            .unwrap_or(false),
        _ => false,
    }
}

/// Any attribute call whose member mentions `validate`.
pub fn is_validate_call(node: &SyntaxNode) -> bool {
    match node {
        SyntaxNode::Call(call) => call
            .callee
            .member()
            .map(|m| m.to_lowercase().contains("validate"))
            .unwrap_or(false),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL_SRC: &str = "\
from table.User import User as UserRow
from table.DBConnection import DBConnection
from sqlalchemy.exc import SQLAlchemyError
from interface.IModel import IModel

class UserModel(IModel):
    def __init__(self):
        self.Session = DBConnection.Session
        self.error = None

    def create(self, **data):
        if not self.__validateData(**data):
            return False
        return True

    def list(self):
        with self.Session() as session:
            try:
                items = session.query(UserRow).all()
                return [item.to_dict() for item in items]
            except SQLAlchemyError as e:
                self.error = str(e)
                return None
            finally:
                count = 0
";

    const CONTROLLER_SRC: &str = "\
from helper.Response import Response

class UserController:
    def get(self, data):
        try:
            return Response.success(data)
        except Exception as e:
            return Response.internal_error(str(e))
";

    fn extract(src: &str, category: Category) -> FileExtraction {
        PatternExtractor::new()
            .unwrap()
            .extract(src, category, "x.py")
            .unwrap()
    }

    #[test]
    fn test_class_record() {
        let out = extract(MODEL_SRC, Category::Model);
        assert_eq!(out.classes.len(), 1);
        let class = &out.classes[0];
        assert_eq!(class.name, "UserModel");
        assert_eq!(class.line, 6);
        assert_eq!(class.base_names, vec!["IModel"]);
        assert_eq!(class.record.methods, vec!["__init__", "create", "list"]);
        assert_eq!(class.record.parent_class.as_deref(), Some("IModel"));
        assert_eq!(class.record.imports[0], "table.User.User");
        assert_eq!(class.record.imports.len(), 4);

        let fragment = out.structure_fragment(Category::Model);
        assert!(fragment.get(Category::Model, "UserModel").is_some());
    }

    #[test]
    fn test_method_patterns() {
        let out = extract(MODEL_SRC, Category::Model);
        let names: Vec<&str> = out.patterns.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["__init__", "create", "list"]);

        let create = &out.patterns[1];
        assert_eq!(create.argument_names, vec!["self"]);
        assert!(create.validates_input);
        assert!(!create.has_guarded_block);

        let list = &out.patterns[2];
        assert!(list.uses_scoped_session);
        assert!(list.has_guarded_block);
        assert!(!list.returns_response_wrapper);
    }

    #[test]
    fn test_response_wrapper_detection() {
        let out = extract(CONTROLLER_SRC, Category::Controller);
        let get = &out.patterns[0];
        assert!(get.returns_response_wrapper);
        assert!(get.has_guarded_block);
        assert!(!get.validates_input);
        assert_eq!(out.classes[0].record.parent_class, None);
    }

    #[test]
    fn test_response_receiver_must_be_response() {
        let returns = |body: &str| {
            let src = format!("class C:\n    def get(self, data):\n        return {body}\n");
            extract(&src, Category::Controller).patterns[0].returns_response_wrapper
        };
        assert!(returns("Response.ok(data)"));
        assert!(returns("self.JsonResponse(data)"));
        assert!(!returns("ResponseBuilder.ok(data)"));
        assert!(!returns("helper.Response.ok(data)"));
    }

    #[test]
    fn test_error_handling_and_naming() {
        let out = extract(MODEL_SRC, Category::Model);
        assert_eq!(out.error_handling.len(), 1);
        assert_eq!(out.error_handling[0].exceptions, vec!["SQLAlchemyError"]);
        assert!(out.error_handling[0].has_finally);
        assert!(!out.error_handling[0].has_else);

        let vars: Vec<&String> = out
            .naming
            .get(Category::Model, NameKind::Variable)
            .unwrap()
            .iter()
            .collect();
        assert_eq!(vars, vec!["session", "items", "count"]);
        assert!(out
            .naming
            .get(Category::Model, NameKind::Class)
            .unwrap()
            .contains("UserModel"));
    }

    #[test]
    fn test_catalog_accumulates_per_category() {
        let mut catalog = PatternCatalog::default();
        catalog.absorb(Category::Model, &extract(MODEL_SRC, Category::Model));
        catalog.absorb(Category::Model, &extract(MODEL_SRC, Category::Model));
        catalog.absorb(
            Category::Controller,
            &extract(CONTROLLER_SRC, Category::Controller),
        );

        let models = catalog.get(Category::Model).unwrap();
        assert_eq!(models.method_patterns.len(), 6);
        assert_eq!(models.relationships.len(), 4);
        assert_eq!(catalog.pattern_count(), 7);
        assert!(catalog.get(Category::Table).is_none());
    }

    #[test]
    fn test_relationships() {
        let out = extract(MODEL_SRC, Category::Model);
        assert_eq!(
            out.relationships,
            vec![
                "table.User",
                "table.DBConnection",
                "sqlalchemy.exc",
                "interface.IModel"
            ]
        );
    }
}
