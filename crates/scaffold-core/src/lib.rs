//! Scaffold core library: pattern extraction and template generation for
//! micro_py_framework style projects.
//!
//! The crate scans a project's category directories, parses each Python file
//! with tree-sitter, extracts structural patterns, checks classes against the
//! controller/model interface contracts, and generates controller/model/table
//! bundles from a compiled-in template catalog. Results are mirrored into
//! editor-integration files (snippets, completions, diagnostics).
//!
//! [`Session`] is the public entry point.

pub mod analysis;
pub mod config;
pub mod docs;
pub mod editor;
pub mod errors;
pub mod generation;
pub mod indexer;
pub mod models;
pub mod session;

pub use config::EngineConfig;
pub use errors::{ScaffoldError, ScaffoldResult};
pub use generation::engine::{GenerationOutcome, TemplateEngine};
pub use generation::templates::{TemplateKind, TemplateStore};
pub use generation::writer::BundleWriter;
pub use models::{
    Category, Completion, Diagnostic, GeneratedBundle, ProjectStructure, Severity, Snippet,
};
pub use session::{AnalysisReport, Session};
