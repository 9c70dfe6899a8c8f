//! Error types for the scaffold core library.

use std::path::PathBuf;

/// Top-level error enum for the scaffold core library.
///
/// None of these escape the public [`Session`](crate::session::Session)
/// operations: the session turns each one into a diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum ScaffoldError {
    #[error("Scan error in {path}: {reason}")]
    Scan { path: PathBuf, reason: String },

    #[error("Parse error in {path} at line {line}: {reason}")]
    Parse {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("Template resolution error: {0}")]
    TemplateResolution(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl ScaffoldError {
    /// 1-based line the error points at, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            ScaffoldError::Parse { line, .. } => Some(*line),
            _ => None,
        }
    }
}

pub type ScaffoldResult<T> = Result<T, ScaffoldError>;
