//! Writes a generated bundle into a reference tree laid out like the
//! scanned project (`controller/`, `model/`, `table/`).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::{ScaffoldError, ScaffoldResult};
use crate::generation::engine::ResourceNames;
use crate::models::GeneratedBundle;

pub struct BundleWriter {
    root: PathBuf,
}

impl BundleWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Target paths for `resource`, in bundle entry order.
    pub fn target_paths(&self, resource: &str) -> ScaffoldResult<[PathBuf; 3]> {
        let names = ResourceNames::derive(resource)?;
        Ok([
            self.root
                .join("controller")
                .join(format!("{}.py", names.controller_class)),
            self.root.join("model").join(format!("{}.py", names.model_class)),
            self.root.join("table").join(format!("{}.py", names.table_class)),
        ])
    }

    /// Write all three entries, overwriting existing files. An empty bundle
    /// is a failed generation and is refused.
    pub fn write(&self, bundle: &GeneratedBundle, resource: &str) -> ScaffoldResult<Vec<PathBuf>> {
        if bundle.is_empty() {
            return Err(ScaffoldError::TemplateResolution(format!(
                "refusing to write empty bundle for '{resource}'"
            )));
        }
        let paths = self.target_paths(resource)?;
        let mut written = Vec::with_capacity(paths.len());
        for (path, (_, text)) in paths.into_iter().zip(bundle.entries()) {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, text)?;
            written.push(path);
        }
        info!(resource, root = %self.root.display(), "Wrote generated bundle");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::engine::TemplateEngine;

    #[test]
    fn test_write_lays_out_reference_tree() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = TemplateEngine::global().generate("product", false).bundle;
        let written = BundleWriter::new(dir.path()).write(&bundle, "product").unwrap();

        assert_eq!(
            written,
            vec![
                dir.path().join("controller/ProductController.py"),
                dir.path().join("model/Product.py"),
                dir.path().join("table/Product.py"),
            ]
        );
        let table = fs::read_to_string(dir.path().join("table/Product.py")).unwrap();
        assert_eq!(table, bundle.table);
    }

    #[test]
    fn test_empty_bundle_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let err = BundleWriter::new(dir.path())
            .write(&GeneratedBundle::empty(), "product")
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::TemplateResolution(_)));
        assert!(!dir.path().join("controller").exists());
    }
}
