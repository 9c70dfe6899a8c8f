//! Engine configuration: defaults, an optional sidecar JSON file under
//! `<root>/.scaffold/config.json`, and `SCAFFOLD_*` environment overrides.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::warn;

use crate::errors::{ScaffoldError, ScaffoldResult};
use crate::models::Category;

const SIDECAR_DIR: &str = ".scaffold";
const SIDECAR_FILE: &str = "config.json";

const DEFAULT_FRAMEWORK_DENYLIST: &[(&str, &[&str])] = &[
    (
        "flask",
        &[
            "flask",
            "Flask",
            "@app.route",
            "request.args",
            "request.form",
            "render_template",
        ],
    ),
    (
        "django",
        &["django", "Django", "urls.py", "views.py", "models.py"],
    ),
    ("fastapi", &["fastapi", "FastAPI", "@app.get", "@app.post"]),
];

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub root: PathBuf,
    /// Directory holding the completion and diagnostic record sets.
    pub editor_dir: PathBuf,
    /// Directory holding one snippet file per snippet category.
    pub snippet_dir: PathBuf,
    /// `(glob, category)` pairs selecting the files to analyse.
    pub categories: Vec<(String, Category)>,
    /// Framework name → literal markers that must not appear in generated code.
    pub framework_denylist: IndexMap<String, Vec<String>>,
    /// When false the editor bridge keeps its logs in memory only.
    pub persist_editor_state: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SidecarConfig {
    editor_dir: Option<PathBuf>,
    snippet_dir: Option<PathBuf>,
    denylist: IndexMap<String, Vec<String>>,
}

impl EngineConfig {
    /// Built-in defaults for a project rooted at `root`.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let editor_dir = root.join(".vscode");
        let snippet_dir = editor_dir.join("snippets");
        let categories = Category::ALL
            .iter()
            .map(|c| (c.default_glob(), *c))
            .collect();
        Self {
            root,
            editor_dir,
            snippet_dir,
            categories,
            framework_denylist: default_framework_denylist(),
            persist_editor_state: true,
        }
    }

    /// Defaults, then the sidecar file, then the process environment.
    pub fn load(root: impl Into<PathBuf>) -> ScaffoldResult<Self> {
        let mut config = Self::for_root(root);
        let sidecar = config.root.join(SIDECAR_DIR).join(SIDECAR_FILE);
        if sidecar.exists() {
            config.apply_sidecar(&sidecar)?;
        }
        config.apply_env_with(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Like [`EngineConfig::load`], but a broken sidecar file falls back to
    /// defaults plus environment instead of failing.
    pub fn load_or_default(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        match Self::load(root.clone()) {
            Ok(config) => config,
            Err(e) => {
                warn!(root = %root.display(), "Ignoring scaffold config: {e}");
                let mut config = Self::for_root(root);
                config.apply_env_with(|name| std::env::var(name).ok());
                config
            }
        }
    }

    fn apply_sidecar(&mut self, path: &Path) -> ScaffoldResult<()> {
        let content = std::fs::read_to_string(path)?;
        let sidecar: SidecarConfig = serde_json::from_str(&content)
            .map_err(|e| ScaffoldError::Config(format!("{}: {e}", path.display())))?;
        if let Some(dir) = sidecar.editor_dir {
            self.set_editor_dir(self.root.join(dir));
        }
        if let Some(dir) = sidecar.snippet_dir {
            self.snippet_dir = self.root.join(dir);
        }
        for (framework, markers) in sidecar.denylist {
            self.add_denylist_markers(&framework, markers);
        }
        Ok(())
    }

    /// Apply `SCAFFOLD_*` overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = non_empty(lookup("SCAFFOLD_EDITOR_DIR")) {
            self.set_editor_dir(PathBuf::from(dir));
        }
        if let Some(dir) = non_empty(lookup("SCAFFOLD_SNIPPET_DIR")) {
            self.snippet_dir = PathBuf::from(dir);
        }
        if let Some(extra) = non_empty(lookup("SCAFFOLD_EXTRA_DENYLIST")) {
            for pair in extra.split(',') {
                match pair.split_once(':') {
                    Some((framework, marker)) if !marker.trim().is_empty() => {
                        self.add_denylist_markers(framework.trim(), [marker.trim().to_string()]);
                    }
                    _ => warn!(entry = pair, "Malformed SCAFFOLD_EXTRA_DENYLIST entry"),
                }
            }
        }
        if let Some(val) = lookup("SCAFFOLD_PERSIST_EDITOR_STATE") {
            let v = val.trim().to_lowercase();
            self.persist_editor_state = !matches!(v.as_str(), "0" | "false" | "no" | "off");
        }
    }

    /// Moving the editor dir drags a default snippet dir along with it.
    fn set_editor_dir(&mut self, dir: PathBuf) {
        if self.snippet_dir == self.editor_dir.join("snippets") {
            self.snippet_dir = dir.join("snippets");
        }
        self.editor_dir = dir;
    }

    fn add_denylist_markers<I>(&mut self, framework: &str, markers: I)
    where
        I: IntoIterator<Item = String>,
    {
        let entry = self
            .framework_denylist
            .entry(framework.to_lowercase())
            .or_default();
        for marker in markers {
            if !entry.contains(&marker) {
                entry.push(marker);
            }
        }
    }
}

/// The built-in flask / django / fastapi markers.
pub fn default_framework_denylist() -> IndexMap<String, Vec<String>> {
    DEFAULT_FRAMEWORK_DENYLIST
        .iter()
        .map(|(framework, markers)| {
            (
                framework.to_string(),
                markers.iter().map(|m| m.to_string()).collect(),
            )
        })
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_cover_all_categories() {
        let config = EngineConfig::for_root("/project");
        assert_eq!(config.categories.len(), 5);
        assert_eq!(config.categories[0], ("controller/*.py".to_string(), Category::Controller));
        assert_eq!(config.editor_dir, PathBuf::from("/project/.vscode"));
        assert_eq!(config.snippet_dir, PathBuf::from("/project/.vscode/snippets"));
        assert!(config.framework_denylist["flask"].contains(&"@app.route".to_string()));
        assert!(config.persist_editor_state);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SCAFFOLD_EDITOR_DIR", "/tmp/editor"),
            ("SCAFFOLD_EXTRA_DENYLIST", "bottle:import bottle, broken"),
            ("SCAFFOLD_PERSIST_EDITOR_STATE", "off"),
        ]
        .into_iter()
        .collect();
        let mut config = EngineConfig::for_root("/project");
        config.apply_env_with(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.editor_dir, PathBuf::from("/tmp/editor"));
        assert_eq!(config.snippet_dir, PathBuf::from("/tmp/editor/snippets"));
        assert_eq!(config.framework_denylist["bottle"], vec!["import bottle"]);
        assert!(!config.persist_editor_state);
    }

    #[test]
    fn test_sidecar_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".scaffold")).unwrap();
        std::fs::write(
            dir.path().join(".scaffold/config.json"),
            r#"{"editor_dir": "ide", "denylist": {"Flask": ["from flask"]}}"#,
        )
        .unwrap();

        let mut config = EngineConfig::for_root(dir.path());
        config
            .apply_sidecar(&dir.path().join(".scaffold/config.json"))
            .unwrap();
        assert_eq!(config.editor_dir, dir.path().join("ide"));
        assert_eq!(config.snippet_dir, dir.path().join("ide").join("snippets"));
        assert!(config.framework_denylist["flask"].contains(&"from flask".to_string()));
    }

    #[test]
    fn test_malformed_sidecar_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".scaffold")).unwrap();
        std::fs::write(dir.path().join(".scaffold/config.json"), "{not json").unwrap();

        let mut config = EngineConfig::for_root(dir.path());
        let err = config
            .apply_sidecar(&dir.path().join(".scaffold/config.json"))
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::Config(_)));
    }
}
