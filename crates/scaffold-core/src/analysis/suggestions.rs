//! Advisory suggestions for a file being edited: improvement hints, missing
//! imports, structural conventions, and method-level snippets.

use std::sync::LazyLock;

use regex::Regex;

use crate::indexer::patterns::{is_response_return, is_validate_call};
use crate::indexer::syntax::{descendants, Module, SyntaxNode};
use crate::models::{Category, Severity, CONTROLLER_CONTRACT};

static CONTROLLER_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"class\s+\w+\s*\(\s*IController\s*\)\s*:").unwrap());
static MODEL_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"class\s+\w+\s*\(\s*IModel\s*\)\s*:").unwrap());

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuggestionKind {
    ErrorHandling,
    Validation,
    Response,
    Structure,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub message: String,
    pub severity: Severity,
}

impl Suggestion {
    fn new(kind: SuggestionKind, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            kind,
            message: message.into(),
            severity,
        }
    }
}

/// Category implied by a file name: `UserController.py` is a controller,
/// `UserModel.py` a model, `UserTable.py` a table.
pub fn file_type(file_name: &str) -> Option<Category> {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    if name.contains("Controller") {
        Some(Category::Controller)
    } else if name.contains("Model") {
        Some(Category::Model)
    } else if name.contains("Table") {
        Some(Category::Table)
    } else {
        None
    }
}

/// Improvement hints for a parsed module.
pub fn suggest_improvements(module: &Module, category: Option<Category>) -> Vec<Suggestion> {
    let nodes = descendants(&module.body);
    let mut out = Vec::new();

    if !nodes.iter().any(|n| matches!(n, SyntaxNode::Try(_))) {
        out.push(Suggestion::new(
            SuggestionKind::ErrorHandling,
            "Consider adding error handling using try-except blocks",
            Severity::Suggestion,
        ));
    }
    if category == Some(Category::Controller) {
        if !nodes.iter().any(|n| is_validate_call(n)) {
            out.push(Suggestion::new(
                SuggestionKind::Validation,
                "Add input validation for request data",
                Severity::Warning,
            ));
        }
        if !nodes.iter().any(|n| is_response_return(n)) {
            out.push(Suggestion::new(
                SuggestionKind::Response,
                "Use Response helper for consistent API responses",
                Severity::Warning,
            ));
        }
    }
    out
}

/// Import lines a file of `category` probably needs.
pub fn suggest_imports(text: &str, category: Category) -> Vec<&'static str> {
    let wanted: &[(&str, &str)] = match category {
        Category::Controller => &[
            ("IController", "from interface.IController import IController"),
            ("Response", "from helper.Response import Response"),
        ],
        Category::Model => &[
            ("IModel", "from interface.IModel import IModel"),
            ("DBConnection", "from table.DBConnection import DBConnection"),
            ("SQLAlchemyError", "from sqlalchemy.exc import SQLAlchemyError"),
        ],
        _ => &[],
    };
    wanted
        .iter()
        .filter(|(marker, _)| !text.contains(marker))
        .map(|(_, line)| *line)
        .collect()
}

/// Convention checks over raw text; works on files that do not parse.
pub fn validate_structure(text: &str, category: Category) -> Vec<Suggestion> {
    let mut issues = Vec::new();
    match category {
        Category::Controller => {
            if !CONTROLLER_CLASS_RE.is_match(text) {
                issues.push(Suggestion::new(
                    SuggestionKind::Structure,
                    "Controller must inherit from IController",
                    Severity::Error,
                ));
            }
            for method in CONTROLLER_CONTRACT.required_methods {
                if !text.contains(&format!("def {method}")) {
                    issues.push(Suggestion::new(
                        SuggestionKind::Structure,
                        format!("Controller missing required method: {method}"),
                        Severity::Warning,
                    ));
                }
            }
        }
        Category::Model => {
            if !MODEL_CLASS_RE.is_match(text) {
                issues.push(Suggestion::new(
                    SuggestionKind::Structure,
                    "Model must inherit from IModel",
                    Severity::Error,
                ));
            }
        }
        _ => {}
    }
    issues
}

// ---------------------------------------------------------------------------
// Method snippets
// ---------------------------------------------------------------------------

/// Snippet for the first contract method (in contract order) defined in
/// `module`, if any.
pub fn method_snippet(module: &Module, category: Category) -> Option<&'static str> {
    let defined: Vec<&str> = descendants(&module.body)
        .into_iter()
        .filter_map(|n| match n {
            SyntaxNode::FunctionDef(f) => Some(f.name.as_str()),
            _ => None,
        })
        .collect();
    let table: &[(&str, &'static str)] = match category {
        Category::Controller => &[
            ("get", GET_METHOD),
            ("post", POST_METHOD),
            ("put", PUT_METHOD),
            ("destroy", DESTROY_METHOD),
        ],
        Category::Model => &[
            ("create", CREATE_METHOD),
            ("update", UPDATE_METHOD),
            ("remove", REMOVE_METHOD),
        ],
        _ => &[],
    };
    table
        .iter()
        .find(|(name, _)| defined.contains(name))
        .map(|(_, snippet)| *snippet)
}

const GET_METHOD: &str = r#"def get(self, data):
    try:
        if data.get("id"):
            result = self.model.single(data["id"])
            if not result:
                return Response.bad_request(f"Failed to get item: {self.model.error}")
            return Response.success(result)
        return Response.success(self.model.list())
    except Exception as e:
        return Response.internal_error(str(e))"#;

const POST_METHOD: &str = r#"def post(self, data):
    try:
        if not self.model.create(**data):
            return Response.bad_request(f"Failed to create item: {self.model.error}")
        return Response.created({"success": "Item created successfully"})
    except Exception as e:
        return Response.internal_error(str(e))"#;

const PUT_METHOD: &str = r#"def put(self, data):
    try:
        item_id = data.get("id")
        if item_id is None:
            return Response.bad_request("ID is required")
        fields = {k: v for k, v in data.items() if k != "id"}
        if not self.model.update(item_id, **fields):
            return Response.bad_request(f"Failed to update item: {self.model.error}")
        return Response.success({"success": "Item updated successfully"})
    except Exception as e:
        return Response.internal_error(str(e))"#;

const DESTROY_METHOD: &str = r#"def destroy(self, data):
    try:
        item_id = data.get("id")
        if item_id is None:
            return Response.bad_request("ID is required")
        if not self.model.remove(int(item_id)):
            return Response.bad_request(self.model.error or "Failed to destroy item")
        return Response.deleted({"success": f"Item with ID {item_id} destroyed successfully"})
    except Exception as e:
        return Response.internal_error(str(e))"#;

const CREATE_METHOD: &str = r#"def create(self, **data) -> bool:
    if not self.__validateData(**data):
        return False
    with self.Session() as session:
        try:
            session.add(self.table(**data))
            session.commit()
            return True
        except SQLAlchemyError as e:
            session.rollback()
            self.error = f"Database failure: {str(e)}"
            return False"#;

const UPDATE_METHOD: &str = r#"def update(self, id: int, **data) -> bool:
    if not self.__validateData(**data):
        return False
    with self.Session() as session:
        try:
            item = session.query(self.table).filter_by(id=id).first()
            if not item:
                self.error = "Item not found"
                return False
            for key, value in data.items():
                setattr(item, key, value)
            session.commit()
            return True
        except SQLAlchemyError as e:
            session.rollback()
            self.error = f"Database failure: {str(e)}"
            return False"#;

const REMOVE_METHOD: &str = r#"def remove(self, id: int) -> bool:
    with self.Session() as session:
        try:
            item = session.query(self.table).filter_by(id=id).first()
            if not item:
                self.error = "Item not found"
                return False
            session.delete(item)
            session.commit()
            return True
        except SQLAlchemyError as e:
            session.rollback()
            self.error = f"Database failure: {str(e)}"
            return False"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::parser::parse_module;

    #[test]
    fn test_file_type_from_name() {
        assert_eq!(file_type("controller/UserController.py"), Some(Category::Controller));
        assert_eq!(file_type("UserModel.py"), Some(Category::Model));
        assert_eq!(file_type("AutoTable.py"), Some(Category::Table));
        assert_eq!(file_type("helper/JWTManager.py"), None);
    }

    #[test]
    fn test_bare_controller_gets_three_hints() {
        let module = parse_module("def get(self, data):\n    return data\n", "c.py").unwrap();
        let hints = suggest_improvements(&module, Some(Category::Controller));
        let kinds: Vec<SuggestionKind> = hints.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SuggestionKind::ErrorHandling,
                SuggestionKind::Validation,
                SuggestionKind::Response
            ]
        );
        assert_eq!(hints[0].severity, Severity::Suggestion);
    }

    #[test]
    fn test_model_only_checks_error_handling() {
        let module = parse_module("def create(self):\n    return True\n", "m.py").unwrap();
        assert_eq!(suggest_improvements(&module, Some(Category::Model)).len(), 1);
    }

    #[test]
    fn test_suggest_imports() {
        assert_eq!(
            suggest_imports("from helper.Response import Response", Category::Controller),
            vec!["from interface.IController import IController"]
        );
        assert_eq!(suggest_imports("", Category::Model).len(), 3);
        assert!(suggest_imports("", Category::Helper).is_empty());
    }

    #[test]
    fn test_validate_structure() {
        let issues = validate_structure(
            "class A(IController):\n    def get(self): pass\n    def post(self): pass\n",
            Category::Controller,
        );
        let messages: Vec<&str> = issues.iter().map(|s| s.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Controller missing required method: put",
                "Controller missing required method: destroy"
            ]
        );
        let issues = validate_structure("class M:\n    pass\n", Category::Model);
        assert_eq!(issues[0].severity, Severity::Error);
    }

    #[test]
    fn test_method_snippet_follows_contract_order() {
        let module =
            parse_module("def put(self, d):\n    pass\n\ndef get(self, d):\n    pass\n", "c.py").unwrap();
        assert!(method_snippet(&module, Category::Controller)
            .unwrap()
            .starts_with("def get("));
        let module = parse_module("def helper():\n    pass\n", "m.py").unwrap();
        assert_eq!(method_snippet(&module, Category::Model), None);
    }
}
