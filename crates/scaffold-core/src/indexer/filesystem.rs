//! Filesystem scanning: enumerate category files under a project root and
//! read them in lexicographic path order.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::{ScaffoldError, ScaffoldResult};
use crate::models::Category;

const IMPLICIT_IGNORED_DIRS: &[&str] = &[".git", ".scaffold", ".vscode", "__pycache__"];

/// A category file that was read and decoded.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the scan root, `/`-separated.
    pub relative_path: String,
    pub category: Category,
    pub content_hash: String,
    pub text: String,
}

/// A category file that matched but could not be read or decoded.
#[derive(Debug)]
pub struct ScanFailure {
    pub relative_path: String,
    pub category: Category,
    pub error: ScaffoldError,
}

pub type ScanItem = Result<SourceFile, ScanFailure>;

/// Enumerates `(glob, category)` matches under a root.
#[derive(Clone, Debug)]
pub struct SourceScanner {
    root: PathBuf,
    patterns: Vec<(String, Category)>,
}

impl SourceScanner {
    pub fn new(root: impl Into<PathBuf>, patterns: Vec<(String, Category)>) -> Self {
        Self {
            root: root.into(),
            patterns,
        }
    }

    /// Scanner over the five default category globs.
    pub fn with_default_categories(root: impl Into<PathBuf>) -> Self {
        let patterns = Category::ALL
            .iter()
            .map(|c| (c.default_glob(), *c))
            .collect();
        Self::new(root, patterns)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Matching files as `(absolute, relative, category)`, sorted by the
    /// relative path. A file matching several globs takes the first one's
    /// category.
    pub fn matching_files(&self) -> ScaffoldResult<Vec<(PathBuf, String, Category)>> {
        if !self.root.is_dir() {
            return Err(ScaffoldError::Scan {
                path: self.root.clone(),
                reason: "root is not a directory".to_string(),
            });
        }

        let mut matches = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !IMPLICIT_IGNORED_DIRS
                        .contains(&entry.file_name().to_string_lossy().as_ref())
            });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(root = %self.root.display(), "Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = relative_path(&self.root, entry.path());
            if let Some(category) = self.category_for(&rel) {
                matches.push((entry.path().to_path_buf(), rel, category));
            }
        }

        matches.sort_by(|a, b| a.1.cmp(&b.1));
        debug!(root = %self.root.display(), files = matches.len(), "Scan matched files");
        Ok(matches)
    }

    /// Lazily read every matching file. Read and decode failures are
    /// yielded as [`ScanFailure`] items; the scan itself carries on.
    pub fn scan(&self) -> ScaffoldResult<impl Iterator<Item = ScanItem>> {
        let files = self.matching_files()?;
        Ok(files
            .into_iter()
            .map(|(path, relative_path, category)| read_source(path, relative_path, category)))
    }

    fn category_for(&self, rel_path: &str) -> Option<Category> {
        self.patterns
            .iter()
            .find(|(pattern, _)| glob_match(rel_path, pattern))
            .map(|(_, category)| *category)
    }
}

fn read_source(path: PathBuf, relative_path: String, category: Category) -> ScanItem {
    let fail = |reason: String, relative_path: String| ScanFailure {
        error: ScaffoldError::Scan {
            path: path.clone(),
            reason,
        },
        relative_path,
        category,
    };

    let bytes = match std::fs::read(&path) {
        Ok(b) => b,
        Err(e) => return Err(fail(e.to_string(), relative_path)),
    };
    let content_hash = content_hash(&bytes);
    let text = match String::from_utf8(bytes) {
        Ok(t) => t,
        Err(e) => return Err(fail(format!("invalid UTF-8: {e}"), relative_path)),
    };

    Ok(SourceFile {
        path,
        relative_path,
        category,
        content_hash,
        text,
    })
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// SHA-256 hex digest of raw file bytes.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Glob match over `/`-separated paths. `*` and `?` stay inside one path
/// segment; `**` crosses segments.
pub fn glob_match(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (tl, pl) = (t.len(), p.len());
    // dp[i][j]: t[..i] matches p[..j]
    let mut dp = vec![vec![false; pl + 1]; tl + 1];
    dp[0][0] = true;
    for j in 1..=pl {
        if p[j - 1] == '*' {
            dp[0][j] = dp[0][j - 1];
        }
    }
    for i in 1..=tl {
        for j in 1..=pl {
            let pc = p[j - 1];
            if pc == '*' {
                let double = j >= 2 && p[j - 2] == '*';
                dp[i][j] = dp[i][j - 1] || (dp[i - 1][j] && (double || t[i - 1] != '/'));
            } else if (pc == '?' && t[i - 1] != '/') || t[i - 1] == pc {
                dp[i][j] = dp[i - 1][j - 1];
            }
        }
    }
    dp[tl][pl]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
