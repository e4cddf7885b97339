//! Truffle: `truffle-config.js` or legacy `truffle.js`, built with `truffle compile`, artifacts
//! read from `build/contracts/<Name>.json`.

use super::artifact_layout::{self, ArtifactLayout};
use super::{Adapter, AdapterContext};
use crate::error::Result;
use crate::model::unit::CompilationUnit;
use std::path::Path;

const LAYOUT: ArtifactLayout = ArtifactLayout {
    build_command: ("npx", &["truffle", "compile"]),
    artifacts_dir: "build/contracts",
    source_path_field: Some("sourcePath"),
};

pub struct TruffleAdapter;

impl Adapter for TruffleAdapter {
    fn name(&self) -> &'static str {
        "truffle"
    }

    fn priority(&self) -> i32 {
        300
    }

    fn detect(&self, root: &Path) -> bool {
        root.join("truffle-config.js").is_file() || root.join("truffle.js").is_file()
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
