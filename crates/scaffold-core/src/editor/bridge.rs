//! Editor-integration state: snippets, completions, and diagnostics.
//!
//! Every mutating call appends to the in-session log and then rewrites the
//! matching file in full. [`EditorBridge::flush`] only rewrites stores this
//! bridge has touched, so a session that only generates leaves the snippets
//! and completions of an earlier analysis in place. The three stores are written independently, so a
//! crash between writes can leave them out of step. There is no locking:
//! two engine processes sharing an editor directory race and the last
//! writer wins. Callers that need concurrent safety must serialize runs.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::errors::ScaffoldResult;
use crate::generation::templates::{placeholders, token, TemplateKind, TemplateStore};
use crate::models::{Completion, Diagnostic, Severity, Snippet, COMPLETION_KIND_SNIPPET};

pub const COMPLETION_FILE: &str = "micro_py.code-completion";
pub const DIAGNOSTIC_FILE: &str = "micro_py.code-diagnostic";

/// Snippet files written on every refresh. `helper` has no template and is
/// persisted empty.
pub const SNIPPET_CATEGORIES: [&str; 5] = [
    "controller",
    "authenticated_controller",
    "model",
    "table",
    "helper",
];

pub fn snippet_file_name(category: &str) -> String {
    format!("micro_py_{category}.code-snippets")
}

/// Template body as snippet lines, each `@@name@@` turned into a `${n:name}`
/// tab stop numbered by first appearance.
pub fn snippet_body(template_body: &str) -> Vec<String> {
    let mut text = template_body.replace('$', "\\$");
    for (index, name) in placeholders(template_body).iter().enumerate() {
        text = text.replace(&token(name), &format!("${{{}:{name}}}", index + 1));
    }
    text.lines().map(str::to_string).collect()
}

pub struct EditorBridge {
    editor_dir: PathBuf,
    snippet_dir: PathBuf,
    persist: bool,
    snippets: IndexMap<String, IndexMap<String, Snippet>>,
    completions: Vec<Completion>,
    diagnostics: Vec<Diagnostic>,
    touched: Touched,
}

#[derive(Clone, Copy, Debug, Default)]
struct Touched {
    snippets: bool,
    completions: bool,
    diagnostics: bool,
}

impl EditorBridge {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            editor_dir: config.editor_dir.clone(),
            snippet_dir: config.snippet_dir.clone(),
            persist: config.persist_editor_state,
            snippets: SNIPPET_CATEGORIES
                .iter()
                .map(|c| (c.to_string(), IndexMap::new()))
                .collect(),
            completions: Vec::new(),
            diagnostics: Vec::new(),
            touched: Touched::default(),
        }
    }

    pub fn persists(&self) -> bool {
        self.persist
    }

    pub fn completions(&self) -> &[Completion] {
        &self.completions
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn snippets(&self, category: &str) -> Option<&IndexMap<String, Snippet>> {
        self.snippets.get(category)
    }

    pub fn completion_path(&self) -> PathBuf {
        self.editor_dir.join(COMPLETION_FILE)
    }

    pub fn diagnostic_path(&self) -> PathBuf {
        self.editor_dir.join(DIAGNOSTIC_FILE)
    }

    pub fn snippet_path(&self, category: &str) -> PathBuf {
        self.snippet_dir.join(snippet_file_name(category))
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Rebuild every snippet category from `store` and rewrite the snippet
    /// files.
    pub fn refresh_snippets(&mut self, store: &TemplateStore) -> ScaffoldResult<()> {
        for (kind, template) in store.iter() {
            let category = kind.key();
            let snippet = Snippet {
                prefix: format!("micro_{category}_{}", template.name),
                body: snippet_body(&template.body),
                description: format!("Create a new {} {category}", template.name),
            };
            self.snippets
                .entry(category.to_string())
                .or_default()
                .insert(format!("micro_py_{category}_{}", template.name), snippet);
        }
        self.touched.snippets = true;
        self.write_snippets()
    }

    pub fn add_completion(
        &mut self,
        label: impl Into<String>,
        content: impl Into<String>,
        detail: impl Into<String>,
    ) -> ScaffoldResult<()> {
        self.completions.push(Completion {
            label: label.into(),
            insert_text: content.into(),
            detail: detail.into(),
            kind: COMPLETION_KIND_SNIPPET,
        });
        self.touched.completions = true;
        self.write_completions()
    }

    pub fn add_diagnostic(
        &mut self,
        file: impl Into<String>,
        line: usize,
        message: impl Into<String>,
        severity: Severity,
    ) -> ScaffoldResult<()> {
        self.diagnostics
            .push(Diagnostic::new(file, line, message, severity));
        self.touched.diagnostics = true;
        self.write_diagnostics()
    }

    /// Append a batch with a single rewrite.
    pub fn add_diagnostics<I>(&mut self, diagnostics: I) -> ScaffoldResult<()>
    where
        I: IntoIterator<Item = Diagnostic>,
    {
        let before = self.diagnostics.len();
        self.diagnostics.extend(diagnostics);
        if self.diagnostics.len() == before {
            return Ok(());
        }
        self.touched.diagnostics = true;
        self.write_diagnostics()
    }

    /// Rewrite every store this bridge has touched.
    pub fn flush(&self) -> ScaffoldResult<()> {
        if self.touched.snippets {
            self.write_snippets()?;
        }
        if self.touched.completions {
            self.write_completions()?;
        }
        if self.touched.diagnostics {
            self.write_diagnostics()?;
        }
        Ok(())
    }

    /// Rewrite all three stores, empty ones included. Used when the
    /// in-session logs are the whole truth, as after a full analysis.
    pub fn flush_all(&mut self) -> ScaffoldResult<()> {
        self.touched = Touched {
            snippets: true,
            completions: true,
            diagnostics: true,
        };
        self.flush()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn write_snippets(&self) -> ScaffoldResult<()> {
        for (category, snippets) in &self.snippets {
            self.write_json(&self.snippet_path(category), snippets)?;
        }
        Ok(())
    }

    fn write_completions(&self) -> ScaffoldResult<()> {
        self.write_json(&self.completion_path(), &self.completions)
    }

    fn write_diagnostics(&self) -> ScaffoldResult<()> {
        self.write_json(&self.diagnostic_path(), &self.diagnostics)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> ScaffoldResult<()> {
        if !self.persist {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(value)?)?;
        debug!(path = %path.display(), "Wrote editor state");
        Ok(())
    }
}

/// Template kind backing the snippet category `category`, if any.
pub fn template_kind_for(category: &str) -> Option<TemplateKind> {
    TemplateKind::ALL.into_iter().find(|k| k.key() == category)
}
