//! Waffle: `waffle.json` present (or forced via `--compile-force-framework waffle`), built with
//! `npx waffle`, artifacts read from `build/` — Waffle doesn't record a source path on the
//! artifact itself, so it's inferred from the artifact file's own location.

use super::artifact_layout::{self, ArtifactLayout};
use super::{Adapter, AdapterContext};
use crate::error::Result;
use crate::model::unit::CompilationUnit;
use std::path::Path;

const LAYOUT: ArtifactLayout = ArtifactLayout {
    build_command: ("npx", &["waffle"]),
    artifacts_dir: "build",
    source_path_field: None,
};

pub struct WaffleAdapter;

impl Adapter for WaffleAdapter {
    fn name(&self) -> &'static str {
        "waffle"
    }

    fn priority(&self) -> i32 {
        600
    }

    fn detect(&self, root: &Path) -> bool {
        root.join("waffle.json").is_file()
    }

    fn compile(&self, ctx: &AdapterContext<'_>) -> Result<Vec<CompilationUnit>> {
        let unit = artifact_layout::compile(
            &ctx.root,
            self.name(),
            &LAYOUT,
            ctx.filenames,
            ctx.config.skip_build,
            ctx.config.timeout,
        )?;
        Ok(vec![unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_waffle_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("waffle.json"), "{}").unwrap();
        assert!(WaffleAdapter.detect(dir.path()));
        assert!(!WaffleAdapter.detect(tempfile::tempdir().unwrap().path()));
    }
}
