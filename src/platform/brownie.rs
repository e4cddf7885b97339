//! Brownie: `brownie-config.yaml` present, built with `brownie compile`, artifacts read from
//! `build/contracts/<Name>.json` (Truffle-shaped, flat bytecode strings).

use super::artifact_layout::{self, ArtifactLayout};
use super::{Adapter, AdapterContext};
use crate::error::Result;
use crate::model::unit::CompilationUnit;
use std::path::Path;

const LAYOUT: ArtifactLayout = ArtifactLayout {
    build_command: ("brownie", &["compile"]),
    artifacts_dir: "build/contracts",
    source_path_field: Some("sourcePath"),
};

pub struct BrownieAdapter;

impl Adapter for BrownieAdapter {
    fn name(&self) -> &'static str {
        "brownie"
    }

    fn priority(&self) -> i32 {
        500
    }

    fn detect(&self, root: &Path) -> bool {
        root.join("brownie-config.yaml").is_file()
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

    fn is_dependency(&self, path: &Path) -> bool {
        path.components().any(|c| c.as_os_str() == "build")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_brownie_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("brownie-config.yaml"), "compiler:\n  solc:\n").unwrap();
        assert!(BrownieAdapter.detect(dir.path()));
        assert!(!BrownieAdapter.detect(tempfile::tempdir().unwrap().path()));
    }
}
