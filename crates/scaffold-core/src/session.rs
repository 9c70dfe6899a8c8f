//! One engine session: the four public operations over a single set of
//! in-memory logs.
//!
//! Nothing here returns an error. Scan, parse, template, and editor-write
//! failures all degrade to a diagnostic (or a log line) plus a partial or
//! empty result. A session is single-threaded and owns its structure,
//! catalog, and editor logs outright.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::analysis::compliance::check_class;
use crate::analysis::suggestions::{file_type, method_snippet, suggest_improvements};
use crate::config::EngineConfig;
use crate::docs;
use crate::editor::bridge::EditorBridge;
use crate::errors::ScaffoldResult;
use crate::generation::engine::{GenerationOutcome, ResourceNames, TemplateEngine};
use crate::generation::templates::{TemplateKind, TemplateStore};
use crate::generation::validator::GeneratedCodeValidator;
use crate::indexer::filesystem::SourceScanner;
use crate::indexer::parser::PythonParser;
use crate::indexer::patterns::{ExtractedClass, PatternCatalog, PatternExtractor};
use crate::models::{Category, Diagnostic, ProjectStructure, Severity};

pub const NO_SUGGESTIONS: &str = "# No suggestions available for this context";

/// Result of [`Session::analyze_directory`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub structure: ProjectStructure,
    /// Files matched by a category glob, readable or not.
    pub files_scanned: usize,
    /// Files that parsed and were extracted.
    pub files_analyzed: usize,
    /// Diagnostics from this run, in scan order.
    pub diagnostics: Vec<Diagnostic>,
    /// SHA-256 over `(relative path, content hash)` in scan order.
    pub fingerprint: String,
}

pub struct Session {
    config: EngineConfig,
    store: &'static TemplateStore,
    validator: GeneratedCodeValidator,
    bridge: EditorBridge,
    structure: ProjectStructure,
    catalog: PatternCatalog,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: TemplateStore::global(),
            validator: GeneratedCodeValidator::from_config(&config),
            bridge: EditorBridge::new(&config),
            structure: ProjectStructure::new(),
            catalog: PatternCatalog::default(),
            config,
        }
    }

    /// Session for a project root, configured from its sidecar and the
    /// environment.
    pub fn open(root: impl AsRef<Path>) -> Self {
        Self::new(EngineConfig::load_or_default(root.as_ref()))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn structure(&self) -> &ProjectStructure {
        &self.structure
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn bridge(&self) -> &EditorBridge {
        &self.bridge
    }

    // -----------------------------------------------------------------------
    // Analyze
    // -----------------------------------------------------------------------

    /// Scan, extract, and validate every category file under `root`. The
    /// project structure and pattern catalog are rebuilt from scratch.
    pub fn analyze_directory(&mut self, root: impl AsRef<Path>) -> AnalysisReport {
        let started = Instant::now();
        let root = root.as_ref();
        self.structure = ProjectStructure::new();
        self.catalog = PatternCatalog::default();

        let mut report = AnalysisReport::default();
        let mut fingerprint = Sha256::new();

        let mut extractor = match PatternExtractor::new() {
            Ok(e) => e,
            Err(e) => {
                self.record(&mut report.diagnostics, root_diagnostic(root, e.to_string()));
                return self.finish_report(report, fingerprint);
            }
        };
        let scanner = SourceScanner::new(root, self.config.categories.clone());
        let items = match scanner.scan() {
            Ok(items) => items,
            Err(e) => {
                warn!(root = %root.display(), "Scan aborted: {e}");
                self.record(&mut report.diagnostics, root_diagnostic(root, e.to_string()));
                return self.finish_report(report, fingerprint);
            }
        };

        for item in items {
            report.files_scanned += 1;
            let file = match item {
                Ok(file) => file,
                Err(failure) => {
                    warn!(path = %failure.relative_path, "Skipping unreadable file: {}", failure.error);
                    fingerprint.update(failure.relative_path.as_bytes());
                    fingerprint.update(b"\0unreadable\n");
                    self.record(
                        &mut report.diagnostics,
                        Diagnostic::new(
                            failure.relative_path.clone(),
                            1,
                            failure.error.to_string(),
                            Severity::Error,
                        ),
                    );
                    continue;
                }
            };
            fingerprint.update(file.relative_path.as_bytes());
            fingerprint.update(b"\0");
            fingerprint.update(file.content_hash.as_bytes());
            fingerprint.update(b"\n");

            let extraction = match extractor.extract(&file.text, file.category, &file.relative_path) {
                Ok(extraction) => extraction,
                Err(e) => {
                    warn!(path = %file.relative_path, "Skipping unparsable file: {e}");
                    self.record(
                        &mut report.diagnostics,
                        Diagnostic::new(
                            file.relative_path.clone(),
                            e.line().unwrap_or(1),
                            e.to_string(),
                            Severity::Error,
                        ),
                    );
                    continue;
                }
            };
            report.files_analyzed += 1;

            let mut file_diagnostics = Vec::new();
            for class in &extraction.classes {
                self.structure
                    .insert(file.category, class.name.clone(), class.record.clone());
                file_diagnostics.extend(check_class(class, file.category, &file.relative_path));
            }
            for d in file_diagnostics {
                self.record(&mut report.diagnostics, d);
            }
            for class in &extraction.classes {
                self.record_completion(class, file.category);
            }
            self.catalog.absorb(file.category, &extraction);
        }

        let report = self.finish_report(report, fingerprint);
        info!(
            root = %root.display(),
            files_scanned = report.files_scanned,
            files_analyzed = report.files_analyzed,
            classes = report.structure.class_count(),
            diagnostics = report.diagnostics.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        );
        report
    }

    /// Analysis owns the whole editor state: snippets are rebuilt and every
    /// store is rewritten, even on an aborted scan.
    fn finish_report(&mut self, mut report: AnalysisReport, fingerprint: Sha256) -> AnalysisReport {
        let result = self.bridge.refresh_snippets(self.store);
        self.persisted("refresh snippets", result);
        let result = self.bridge.flush_all();
        self.persisted("flush", result);
        report.structure = self.structure.clone();
        report.fingerprint = format!("{:x}", fingerprint.finalize());
        report
    }

    fn record_completion(&mut self, class: &ExtractedClass, category: Category) {
        let insert_text = self
            .completion_text(class, category)
            .unwrap_or_else(|| class.name.clone());
        let detail = format!("Create new {} {}", category.plural(), class.name);
        let result = self.bridge.add_completion(class.name.clone(), insert_text, detail);
        self.persisted("add completion", result);
    }

    /// The category's template rendered for the class's resource name.
    fn completion_text(&self, class: &ExtractedClass, category: Category) -> Option<String> {
        let kind = match category {
            Category::Controller if class.base_names.iter().any(|b| b == "AuthController") => {
                TemplateKind::AuthenticatedController
            }
            Category::Controller => TemplateKind::Controller,
            Category::Model => TemplateKind::Model,
            Category::Table => TemplateKind::Table,
            _ => return None,
        };
        let resource = class
            .name
            .strip_suffix("Controller")
            .filter(|r| !r.is_empty())
            .unwrap_or(&class.name);
        let names = ResourceNames::derive(resource).ok()?;
        TemplateEngine::new(self.store).render(kind, &names).ok()
    }

    // -----------------------------------------------------------------------
    // Generate
    // -----------------------------------------------------------------------

    /// Generate the bundle for `resource` and run the post-generation
    /// checks. All diagnostics land in the session log and the outcome.
    pub fn generate_bundle(&mut self, resource: &str, authenticated: bool) -> GenerationOutcome {
        let mut outcome = TemplateEngine::new(self.store).generate(resource, authenticated);
        outcome
            .diagnostics
            .extend(self.validator.check(&outcome.bundle));
        let result = self.bridge.add_diagnostics(outcome.diagnostics.iter().cloned());
        self.persisted("add diagnostics", result);
        let result = self.bridge.flush();
        self.persisted("flush", result);
        info!(
            resource,
            authenticated,
            generated = outcome.succeeded(),
            diagnostics = outcome.diagnostics.len(),
            "Generation complete"
        );
        outcome
    }

    // -----------------------------------------------------------------------
    // Suggest
    // -----------------------------------------------------------------------

    /// Code suggestion for `context` typed into `current_file`.
    pub fn suggest_code(&mut self, context: &str, current_file: &str) -> String {
        let category = file_type(current_file);
        let module = PythonParser::new().and_then(|mut p| p.parse(context, current_file));
        let module = match module {
            Ok(module) => module,
            Err(_) => {
                return category
                    .and_then(|c| self.template_for_file(c, current_file))
                    .unwrap_or_else(|| NO_SUGGESTIONS.to_string())
            }
        };

        for suggestion in suggest_improvements(&module, category) {
            let result = self.bridge.add_diagnostic(
                current_file,
                1,
                suggestion.message,
                suggestion.severity,
            );
            self.persisted("add diagnostic", result);
        }

        let Some(category) = category else {
            return NO_SUGGESTIONS.to_string();
        };
        if let Some(snippet) = method_snippet(&module, category) {
            return snippet.to_string();
        }
        self.template_for_file(category, current_file)
            .unwrap_or_else(|| NO_SUGGESTIONS.to_string())
    }

    /// Category template rendered for the resource named by the file stem.
    fn template_for_file(&self, category: Category, current_file: &str) -> Option<String> {
        let kind = match category {
            Category::Controller => TemplateKind::Controller,
            Category::Model => TemplateKind::Model,
            Category::Table => TemplateKind::Table,
            _ => return None,
        };
        let stem = Path::new(current_file).file_stem()?.to_str()?;
        let resource = ["Controller", "Model", "Table"]
            .iter()
            .find_map(|suffix| stem.strip_suffix(suffix))
            .filter(|r| !r.is_empty())
            .unwrap_or(stem);
        let names = ResourceNames::derive(resource).ok()?;
        TemplateEngine::new(self.store).render(kind, &names).ok()
    }

    // -----------------------------------------------------------------------
    // Document
    // -----------------------------------------------------------------------

    pub fn generate_documentation(&self, category: Category) -> String {
        docs::generate_documentation(category, self.catalog.get(category))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn record(&mut self, log: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
        log.push(diagnostic.clone());
        let result = self.bridge.add_diagnostics([diagnostic]);
        self.persisted("add diagnostic", result);
    }

    fn persisted(&self, action: &str, result: ScaffoldResult<()>) {
        if let Err(e) = result {
            warn!(
                editor_dir = %self.config.editor_dir.display(),
                "Editor state write failed ({action}): {e}"
            );
        }
    }
}

fn root_diagnostic(root: &Path, message: String) -> Diagnostic {
    Diagnostic::new(root.display().to_string(), 1, message, Severity::Error)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CONTROLLER: &str = "\
from interface.IController import IController
from helper.Response import Response

class UserController(IController):
    def get(self, data):
        try:
            return Response.success(data)
        except Exception as e:
            return Response.internal_error(str(e))

    def post(self, data):
        return Response.created(data)
";

    const MODEL: &str = "\
from interface.IModel import IModel

class User(IModel):
    def create(self, **data):
        return True

    def single(self, id):
        return None

    def list(self):
        return []

    def update(self, id, **data):
        return True

    def delete(self, id):
        return True
";

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (rel, text) in [
            ("controller/UserController.py", CONTROLLER),
            ("model/User.py", MODEL),
            ("model/Broken.py", "class Broken(:\n    pass\n"),
            ("helper/notes.txt", "not python"),
        ] {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        dir
    }

    fn session(root: &Path) -> Session {
        Session::new(EngineConfig::for_root(root))
    }

    #[test]
    fn test_analyze_collects_structure_and_diagnostics() {
        let dir = project();
        let mut session = session(dir.path());
        let report = session.analyze_directory(dir.path());

        assert_eq!(report.files_scanned, 3);
        assert_eq!(report.files_analyzed, 2);
        let user = report.structure.get(Category::Controller, "UserController").unwrap();
        assert_eq!(user.methods, vec!["get", "post"]);
        assert!(report.structure.get(Category::Model, "User").is_some());

        let files: Vec<&str> = report.diagnostics.iter().map(|d| d.file.as_str()).collect();
        assert_eq!(
            files,
            vec![
                "controller/UserController.py",
                "model/Broken.py",
                "model/User.py",
                "model/User.py"
            ]
        );
        assert!(report.diagnostics[0].message.ends_with("put, destroy"));
        assert_eq!(report.diagnostics[0].severity, Severity::Error);
        assert_eq!(report.diagnostics[1].line, 1);
        assert!(report.diagnostics[3].message.contains("consider renaming 'delete' to 'remove'"));
    }

    #[test]
    fn test_one_parse_diagnostic_for_one_invalid_file() {
        let dir = project();
        let report = session(dir.path()).analyze_directory(dir.path());
        let parse: Vec<&Diagnostic> = report
            .diagnostics
            .iter()
            .filter(|d| d.message.starts_with("Parse error"))
            .collect();
        assert_eq!(parse.len(), 1);
        assert_eq!(parse[0].file, "model/Broken.py");
    }

    #[test]
    fn test_analysis_persists_editor_state() {
        let dir = project();
        let mut session = session(dir.path());
        session.analyze_directory(dir.path());

        let labels: Vec<&str> = session
            .bridge()
            .completions()
            .iter()
            .map(|c| c.label.as_str())
            .collect();
        assert_eq!(labels, vec!["UserController", "User"]);
        assert!(session.bridge().completions()[0]
            .insert_text
            .contains("class UserController(IController):"));
        assert_eq!(session.bridge().completions()[1].detail, "Create new models User");

        assert!(session.bridge().completion_path().exists());
        assert!(session.bridge().diagnostic_path().exists());
        assert!(session.bridge().snippet_path("model").exists());
    }

    #[test]
    fn test_unreadable_file_is_one_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        for (rel, bytes) in [
            ("controller/UserController.py", CONTROLLER.as_bytes()),
            ("helper/Bad.py", &[0xffu8, 0xfe, 0x00, 0x41][..]),
            ("helper/Good.py", &b"x = 1\n"[..]),
        ] {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, bytes).unwrap();
        }
        let mut session = session(dir.path());
        let report = session.analyze_directory(dir.path());

        assert_eq!(report.files_scanned, 3);
        assert_eq!(report.files_analyzed, 2);
        assert!(report.structure.get(Category::Controller, "UserController").is_some());
        let bad: Vec<&Diagnostic> = report
            .diagnostics
            .iter()
            .filter(|d| d.file == "helper/Bad.py")
            .collect();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].severity, Severity::Error);
        assert_eq!(bad[0].line, 1);

        let persisted: Vec<Diagnostic> = serde_json::from_str(
            &fs::read_to_string(session.bridge().diagnostic_path()).unwrap(),
        )
        .unwrap();
        assert_eq!(
            persisted.iter().filter(|d| d.file == "helper/Bad.py").count(),
            1
        );
    }

    #[test]
    fn test_generate_keeps_earlier_editor_state() {
        let dir = project();
        session(dir.path()).analyze_directory(dir.path());

        let mut generator = session(dir.path());
        assert!(generator.generate_bundle("product", false).succeeded());

        let model = fs::read_to_string(generator.bridge().snippet_path("model")).unwrap();
        assert!(model.contains("micro_py_model_basic"));
        let completions = fs::read_to_string(generator.bridge().completion_path()).unwrap();
        assert!(completions.contains("UserController"));
    }

    #[test]
    fn test_repeat_runs_are_identical() {
        let dir = project();
        let a = session(dir.path()).analyze_directory(dir.path());
        let completions_a = fs::read_to_string(dir.path().join(".vscode/micro_py.code-completion")).unwrap();
        let b = session(dir.path()).analyze_directory(dir.path());
        let completions_b = fs::read_to_string(dir.path().join(".vscode/micro_py.code-completion")).unwrap();

        assert_eq!(a, b);
        assert_eq!(completions_a, completions_b);
        assert_eq!(a.fingerprint.len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let dir = project();
        let before = session(dir.path()).analyze_directory(dir.path()).fingerprint;
        fs::write(dir.path().join("model/User.py"), MODEL.replace("delete", "remove")).unwrap();
        let after = session(dir.path()).analyze_directory(dir.path()).fingerprint;
        assert_ne!(before, after);
    }

    #[test]
    fn test_missing_root_degrades_to_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let report = session(dir.path()).analyze_directory(&missing);
        assert_eq!(report.files_scanned, 0);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn test_generate_bundle_logs_and_returns() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        let outcome = session.generate_bundle("product", false);
        assert!(outcome.succeeded());
        assert!(outcome.diagnostics.is_empty());
        assert!(outcome.bundle.controller.contains("class ProductController(IController):"));

        let failed = session.generate_bundle("not a name", false);
        assert!(failed.bundle.is_empty());
        assert_eq!(session.bridge().diagnostics().len(), 1);
        assert!(session.bridge().diagnostic_path().exists());
    }

    #[test]
    fn test_suggest_code_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());

        let snippet = session.suggest_code("def get(self, data):\n    pass\n", "UserController.py");
        assert!(snippet.starts_with("def get(self, data):"));
        assert_eq!(session.bridge().diagnostics().len(), 3);
        assert!(session.bridge().diagnostics().iter().all(|d| d.line == 1));

        let fallback = session.suggest_code("def broken(:", "OrderModel.py");
        assert!(fallback.contains("class Order(IModel):"));

        let table = session.suggest_code("x = 1\n", "ItemTable.py");
        assert!(table.contains("__tablename__ = 'item'"));

        assert_eq!(session.suggest_code("def broken(:", "notes.py"), NO_SUGGESTIONS);
    }

    #[test]
    fn test_documentation_from_session_catalog() {
        let dir = project();
        let mut session = session(dir.path());
        session.analyze_directory(dir.path());
        let doc = session.generate_documentation(Category::Model);
        assert!(doc.starts_with("# Model Patterns"));
        assert!(doc.contains("- create\n"));
        assert!(doc.contains("- interface.IModel"));
    }
}
