//! Embark / Etherlime / Buidler: long-retired frameworks kept for the priority table's sake
//! (component design, "700-900: legacy marker files"), each detected by its own config marker
//! and compiled the same way `dapp` is — straight `solc --combined-json` over `contracts/`,
//! since none of these frameworks are realistically installable to shell out to anymore.

use super::combined_json;
use super::{Adapter, AdapterContext};
use crate::error::Result;
use crate::model::unit::CompilationUnit;
use crate::utils;
use std::path::Path;

fn compile_contracts_dir(ctx: &AdapterContext<'_>, adapter: &str) -> Result<Vec<CompilationUnit>> {
    let entries = utils::files_with_extension(ctx.root.join("contracts"), &["sol"]);
    let unit = combined_json::compile(
        &ctx.root,
        adapter,
        &entries,
        &ctx.config.solc_remaps,
        ctx.config.solc.as_deref(),
        ctx.filenames,
    )?;
    Ok(vec![unit])
}

pub struct EmbarkAdapter;

impl Adapter for EmbarkAdapter {
    fn name(&self) -> &'static str {
        "embark"
    }

    fn priority(&self) -> i32 {
        700
    }

    fn detect(&self, root: &Path) -> bool {
        root.join("embark.json").is_file()
    }

    fn compile(&self, ctx: &AdapterContext<'_>) -> Result<Vec<CompilationUnit>> {
        compile_contracts_dir(ctx, self.name())
    }
}

pub struct EtherlimeAdapter;

impl Adapter for EtherlimeAdapter {
    fn name(&self) -> &'static str {
        "etherlime"
    }

    fn priority(&self) -> i32 {
        800
    }

    fn detect(&self, root: &Path) -> bool {
        root.join("etherlime-config.json").is_file()
    }

    fn compile(&self, ctx: &AdapterContext<'_>) -> Result<Vec<CompilationUnit>> {
        compile_contracts_dir(ctx, self.name())
    }
}

pub struct BuidlerAdapter;

impl Adapter for BuidlerAdapter {
    fn name(&self) -> &'static str {
        "buidler"
    }

    fn priority(&self) -> i32 {
        900
    }

    fn detect(&self, root: &Path) -> bool {
        root.join("buidler.config.js").is_file()
    }

    fn compile(&self, ctx: &AdapterContext<'_>) -> Result<Vec<CompilationUnit>> {
        compile_contracts_dir(ctx, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_marker_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("embark.json"), "{}").unwrap();
        assert!(EmbarkAdapter.detect(dir.path()));
        assert!(!EtherlimeAdapter.detect(dir.path()));
        assert!(!BuidlerAdapter.detect(dir.path()));
    }

    #[test]
    fn priority_order_is_embark_then_etherlime_then_buidler() {
        assert!(EmbarkAdapter.priority() < EtherlimeAdapter.priority());
        assert!(EtherlimeAdapter.priority() < BuidlerAdapter.priority());
    }
}
