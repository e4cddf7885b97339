//! Dapp (dapptools): `Makefile` + a `src/` layout, compiled by shelling straight to
//! `solc --combined-json` the way `dapp build` itself does internally, rather than running the
//! `dapp` binary (not assumed to be installed) and re-reading its cache.

use super::combined_json;
use super::{Adapter, AdapterContext};
use crate::error::Result;
use crate::model::unit::CompilationUnit;
use crate::utils;
use std::path::Path;

pub struct DappAdapter;

impl Adapter for DappAdapter {
    fn name(&self) -> &'static str {
        "dapp"
    }

    fn priority(&self) -> i32 {
        400
    }

    fn detect(&self, root: &Path) -> bool {
        root.join("Makefile").is_file() && root.join("src").is_dir()
    }

    fn compile(&self, ctx: &AdapterContext<'_>) -> Result<Vec<CompilationUnit>> {
        let entries = utils::files_with_extension(ctx.root.join("src"), &["sol"]);

        let unit = combined_json::compile(
            &ctx.root,
            self.name(),
            &entries,
            &ctx.config.solc_remaps,
            ctx.config.solc.as_deref(),
            ctx.filenames,
        )?;
        Ok(vec![unit])
    }

    fn is_dependency(&self, path: &Path) -> bool {
        path.components().any(|c| c.as_os_str() == "lib")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_makefile_and_src_layout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Makefile"), "all:\n\tdapp build\n").unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        assert!(DappAdapter.detect(dir.path()));

        let bare = tempfile::tempdir().unwrap();
        std::fs::write(bare.path().join("Makefile"), "all:\n").unwrap();
        assert!(!DappAdapter.detect(bare.path()));
    }
}
