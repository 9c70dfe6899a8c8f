//! Resource naming and template substitution.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::errors::{ScaffoldError, ScaffoldResult};
use crate::generation::templates::{
    token, TemplateKind, TemplateStore, PLACEHOLDER_CONTROLLER_NAME, PLACEHOLDER_MODEL_NAME,
    PLACEHOLDER_TABLE_NAME, PLACEHOLDER_TABLE_NAME_LOWER,
};
use crate::models::{Diagnostic, GeneratedBundle, Severity};

/// Diagnostic file label for findings about generated text.
pub const GENERATED_FILE: &str = "<generated>";

static LEFTOVER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@@([^@\s]*)@@").unwrap());

/// First letter upper-cased, the rest unchanged.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// ASCII Python identifier: letter or `_`, then alphanumerics or `_`.
pub fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

const PYTHON_KEYWORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Hard keywords only. Soft keywords (`match`, `case`, `type`, `_`) are
/// legal class names.
pub fn is_keyword(value: &str) -> bool {
    PYTHON_KEYWORDS.contains(&value)
}

/// Identifiers derived from one resource name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceNames {
    pub resource: String,
    pub base: String,
    pub controller_class: String,
    pub model_class: String,
    pub table_class: String,
    pub table_identifier: String,
}

impl ResourceNames {
    pub fn derive(resource: &str) -> ScaffoldResult<Self> {
        let base = capitalize(resource);
        if !is_identifier(resource) || is_keyword(&base) {
            return Err(ScaffoldError::TemplateResolution(format!(
                "invalid resource name '{resource}'"
            )));
        }
        Ok(Self {
            resource: resource.to_string(),
            controller_class: format!("{base}Controller"),
            model_class: base.clone(),
            table_class: base.clone(),
            table_identifier: resource.to_lowercase(),
            base,
        })
    }

    /// Placeholder name → value.
    pub fn placeholder_values(&self) -> [(&'static str, &str); 4] {
        [
            (PLACEHOLDER_MODEL_NAME, self.model_class.as_str()),
            (PLACEHOLDER_CONTROLLER_NAME, self.controller_class.as_str()),
            (PLACEHOLDER_TABLE_NAME, self.table_class.as_str()),
            (PLACEHOLDER_TABLE_NAME_LOWER, self.table_identifier.as_str()),
        ]
    }
}

/// Literal find/replace of each `@@name@@`. Any marker left afterwards is an
/// unresolved placeholder.
pub fn substitute(body: &str, values: &[(&str, &str)]) -> ScaffoldResult<String> {
    let mut out = body.to_string();
    for (name, value) in values {
        out = out.replace(&token(name), value);
    }
    if let Some(caps) = LEFTOVER_RE.captures(&out) {
        return Err(ScaffoldError::TemplateResolution(format!(
            "unresolved placeholder '{}'",
            &caps[1]
        )));
    }
    Ok(out)
}

/// A bundle plus the diagnostics produced while generating it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub bundle: GeneratedBundle,
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationOutcome {
    pub fn succeeded(&self) -> bool {
        !self.bundle.is_empty()
    }
}

pub struct TemplateEngine<'a> {
    store: &'a TemplateStore,
}

impl TemplateEngine<'static> {
    pub fn global() -> Self {
        Self::new(TemplateStore::global())
    }
}

impl<'a> TemplateEngine<'a> {
    pub fn new(store: &'a TemplateStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a TemplateStore {
        self.store
    }

    /// Render one template for `names`.
    pub fn render(&self, kind: TemplateKind, names: &ResourceNames) -> ScaffoldResult<String> {
        let template = self.store.get(kind)?;
        substitute(&template.body, &names.placeholder_values())
    }

    pub fn try_generate(&self, resource: &str, authenticated: bool) -> ScaffoldResult<GeneratedBundle> {
        let names = ResourceNames::derive(resource)?;
        let controller_kind = if authenticated {
            TemplateKind::AuthenticatedController
        } else {
            TemplateKind::Controller
        };
        Ok(GeneratedBundle {
            controller: self.render(controller_kind, &names)?,
            model: self.render(TemplateKind::Model, &names)?,
            table: self.render(TemplateKind::Table, &names)?,
        })
    }

    /// Generate a bundle. Failure yields an empty bundle and one error
    /// diagnostic; it never returns an error.
    pub fn generate(&self, resource: &str, authenticated: bool) -> GenerationOutcome {
        match self.try_generate(resource, authenticated) {
            Ok(bundle) => {
                debug!(resource, authenticated, "Generated bundle");
                GenerationOutcome {
                    bundle,
                    diagnostics: Vec::new(),
                }
            }
            Err(e) => {
                warn!(resource, "Template resolution failed: {e}");
                GenerationOutcome {
                    bundle: GeneratedBundle::empty(),
                    diagnostics: vec![Diagnostic::new(
                        GENERATED_FILE,
                        0,
                        format!("Generation failed for '{resource}': {e}"),
                        Severity::Error,
                    )],
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definitions(text: &str, class: &str) -> usize {
        text.matches(&format!("class {class}(")).count()
    }

    #[test]
    fn test_naming_derivation() {
        let names = ResourceNames::derive("orderItem").unwrap();
        assert_eq!(names.base, "OrderItem");
        assert_eq!(names.controller_class, "OrderItemController");
        assert_eq!(names.model_class, "OrderItem");
        assert_eq!(names.table_identifier, "orderitem");
        assert_eq!(capitalize("_x"), "_x");
    }

    #[test]
    fn test_generate_product() {
        let outcome = TemplateEngine::global().generate("product", false);
        assert!(outcome.succeeded());
        assert!(outcome.diagnostics.is_empty());
        let bundle = outcome.bundle;
        assert!(bundle.table.contains("__tablename__ = 'product'"));
        assert_eq!(definitions(&bundle.controller, "ProductController"), 1);
        assert_eq!(definitions(&bundle.model, "Product"), 1);
        assert_eq!(definitions(&bundle.table, "Product"), 1);
        assert!(bundle.model.contains("from table.Product import Product as ProductRow"));
        assert!(!bundle.controller.contains("@@"));
        assert!(!bundle.controller.contains("AuthController"));
    }

    #[test]
    fn test_authenticated_variant() {
        let bundle = TemplateEngine::global().generate("user", true).bundle;
        assert!(bundle.controller.contains("class UserController(AuthController, IController):"));
        assert!(bundle.controller.contains("self.authenticate(headers)"));
    }

    #[test]
    fn test_generation_is_idempotent() {
        let engine = TemplateEngine::global();
        for resource in ["product", "orderItem", "_audit"] {
            for auth in [false, true] {
                assert_eq!(engine.generate(resource, auth), engine.generate(resource, auth));
            }
        }
    }

    #[test]
    fn test_invalid_resource_name_fails_closed() {
        for resource in ["", "9lives", "order-item", "a b", "none", "true", "false", "None"] {
            let outcome = TemplateEngine::global().generate(resource, false);
            assert!(outcome.bundle.is_empty());
            assert_eq!(outcome.diagnostics.len(), 1);
            assert_eq!(outcome.diagnostics[0].severity, Severity::Error);
            assert!(outcome.diagnostics[0].message.contains("invalid resource name"));
        }
    }

    #[test]
    fn test_soft_keywords_and_lowercase_keywords_are_names() {
        for resource in ["match", "type", "class", "import"] {
            let outcome = TemplateEngine::global().generate(resource, false);
            assert!(outcome.succeeded(), "{resource}");
        }
        assert!(is_keyword("None"));
        assert!(!is_keyword("Match"));
    }

    #[test]
    fn test_unknown_placeholder_fails_closed() {
        let store = TemplateStore::with_templates([
            (TemplateKind::Controller, "class @@controller_name@@: pass"),
            (TemplateKind::Model, "class @@model_name@@: @@owner@@"),
            (TemplateKind::Table, "class @@table_name@@: pass"),
        ]);
        let outcome = TemplateEngine::new(&store).generate("product", false);
        assert!(outcome.bundle.is_empty());
        assert!(outcome.diagnostics[0].message.contains("unresolved placeholder 'owner'"));
    }

    #[test]
    fn test_missing_template_names_the_key() {
        let store = TemplateStore::with_templates([(TemplateKind::Model, "x")]);
        let outcome = TemplateEngine::new(&store).generate("product", true);
        assert!(outcome.bundle.is_empty());
        assert!(outcome.diagnostics[0]
            .message
            .contains("unknown template key 'authenticated_controller'"));
    }

    #[test]
    fn test_substitute_leaves_braces_alone() {
        let out = substitute(
            "return {'id': self.id, 'name': '@@table_name_lower@@'}",
            &[("table_name_lower", "product")],
        )
        .unwrap();
        assert_eq!(out, "return {'id': self.id, 'name': 'product'}");
    }
}
