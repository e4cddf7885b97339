//! Foundry: detected by `foundry.toml`, built with `forge build`, artifacts read from `out/`.

use super::artifact_layout::{self, ArtifactLayout};
use super::{Adapter, AdapterContext};
use crate::error::Result;
use crate::model::unit::CompilationUnit;
use std::path::Path;

const LAYOUT: ArtifactLayout = ArtifactLayout {
    build_command: ("forge", &["build"]),
    artifacts_dir: "out",
    source_path_field: Some("sourceName"),
};

pub struct FoundryAdapter;

impl Adapter for FoundryAdapter {
    fn name(&self) -> &'static str {
        "foundry"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn detect(&self, root: &Path) -> bool {
        root.join("foundry.toml").is_file()
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

    fn clean(&self, root: &Path) -> Result<()> {
        let _ = std::process::Command::new("forge").arg("clean").current_dir(root).status();
        Ok(())
    }

    fn is_dependency(&self, path: &Path) -> bool {
        path.components().any(|c| c.as_os_str() == "lib")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_foundry_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foundry.toml"), "[profile.default]\n").unwrap();
        assert!(FoundryAdapter.detect(dir.path()));
        assert!(!FoundryAdapter.detect(tempfile::tempdir().unwrap().path()));
    }
}
