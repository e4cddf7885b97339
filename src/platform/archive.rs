//! Rehydrates a previously exported project. Design notes §9(b): this reuses the direct-compiler
//! code path's shape (one adapter, one `compile()` that returns units) but skips actual
//! compilation entirely — the "compile" step here is just reading back what a prior run already
//! produced.

use super::{Adapter, AdapterContext};
use crate::error::{CompileError, Result};
use crate::export;
use crate::model::unit::CompilationUnit;
use std::path::Path;

pub struct ArchiveAdapter;

impl Adapter for ArchiveAdapter {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn detect(&self, root: &Path) -> bool {
        is_archive_path(root)
    }

    fn compile(&self, ctx: &AdapterContext<'_>) -> Result<Vec<CompilationUnit>> {
        if !ctx.root.is_file() {
            return Err(CompileError::InvalidArchive(format!(
                "archive path does not exist: {}",
                ctx.root.display()
            )));
        }

        let project = export::import_archive(&ctx.root, ctx.filenames)
            .map_err(|e| CompileError::InvalidArchive(e.to_string()))?;

        Ok(project.units.into_values().collect())
    }
}

/// `.zip` (a packed export, unpacking delegated to an external collaborator per `spec.md` §1) or
/// a `<target>_export_archive.json` file produced by [`crate::export`].
fn is_archive_path(root: &Path) -> bool {
    match root.extension().and_then(|e| e.to_str()) {
        Some("zip") => true,
        Some("json") => root
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with("_export_archive.json")),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_export_archive_json_but_not_plain_json() {
        assert!(is_archive_path(Path::new("foo_export_archive.json")));
        assert!(is_archive_path(Path::new("bundle.zip")));
        assert!(!is_archive_path(Path::new("hardhat.config.json")));
    }
}
