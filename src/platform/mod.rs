//! The platform registry: an ordered set of adapters, each answering "can I handle this
//! target?" and, if so, producing one or more [`CompilationUnit`]s.

pub mod archive;
pub mod artifact_layout;
pub mod brownie;
pub mod combined_json;
pub mod dapp;
pub mod direct;
pub mod foundry;
pub mod hardhat;
pub mod legacy;
pub mod truffle;
pub mod waffle;

use crate::config::Config;
use crate::error::{CompileError, Result};
use crate::filename::FilenameIndex;
use crate::model::unit::CompilationUnit;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};

/// Context threaded through every adapter call: the resolved project root, the shared identity
/// index, and the caller's configuration.
pub struct AdapterContext<'a> {
    pub root: PathBuf,
    pub filenames: &'a FilenameIndex,
    pub config: &'a Config,
}

/// The capability set every platform adapter implements (design notes §9: "polymorphism over a
/// capability set"). A default base covers `clean`/`is_dependency`/`guessed_tests` so most
/// adapters only need to implement `detect`/`compile`.
pub trait Adapter: Send + Sync {
    fn name(&self) -> &'static str;
    fn priority(&self) -> i32;

    /// Whether this adapter recognizes `root` as its kind of project.
    fn detect(&self, root: &Path) -> bool;

    /// Drives the framework's build and parses its artifacts into one or more units.
    fn compile(&self, ctx: &AdapterContext<'_>) -> Result<Vec<CompilationUnit>>;

    /// Removes build output this adapter is responsible for (best-effort; not required for
    /// compilation to succeed).
    fn clean(&self, _root: &Path) -> Result<()> {
        Ok(())
    }

    /// Whether `path` sits under a directory this framework treats as a vendored dependency
    /// (not part of the user's own sources).
    fn is_dependency(&self, path: &Path) -> bool {
        path.components().any(|c| c.as_os_str() == "node_modules" || c.as_os_str() == "lib")
    }

    /// Best-effort guess at this project's test files, for callers that want to exclude them
    /// from compilation or report them separately. Most adapters have no opinion.
    fn guessed_tests(&self, _root: &Path) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Adapters in priority order (lower first), exactly the table in the component design.
fn registry() -> Vec<Box<dyn Adapter>> {
    let mut adapters: Vec<Box<dyn Adapter>> = vec![
        Box::new(archive::ArchiveAdapter),
        Box::new(foundry::FoundryAdapter),
        Box::new(hardhat::HardhatV3Adapter),
        Box::new(hardhat::HardhatV2Adapter),
        Box::new(truffle::TruffleAdapter),
        Box::new(dapp::DappAdapter),
        Box::new(brownie::BrownieAdapter),
        Box::new(waffle::WaffleAdapter),
        Box::new(legacy::EmbarkAdapter),
        Box::new(legacy::EtherlimeAdapter),
        Box::new(legacy::BuidlerAdapter),
        Box::new(direct::DirectAdapter),
    ];
    adapters.sort_by_key(|a| a.priority());
    adapters
}

static REGISTRY_ORDER: Lazy<Vec<(&'static str, i32)>> =
    Lazy::new(|| registry().iter().map(|a| (a.name(), a.priority())).collect());

/// Reports the registry in priority order, for diagnostics and tests.
pub fn adapter_names() -> Vec<&'static str> {
    REGISTRY_ORDER.iter().map(|(name, _)| *name).collect()
}

/// `0x` + 40 hex characters, optionally chain-prefixed (`mainnet:0x...`, `sourcify-1:0x...`).
pub fn looks_like_address(target: &str) -> bool {
    let addr = target.rsplit(':').next().unwrap_or(target);
    let hex_part = addr.strip_prefix("0x").or_else(|| addr.strip_prefix("0X"));
    matches!(hex_part, Some(h) if h.len() == 40 && h.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Runs detection per the component design: if a framework is forced via config, only that
/// adapter's `detect` is consulted (a `false` result is fatal); otherwise adapters run in
/// priority order and the first match wins. Address-shaped targets are handled by the caller
/// (the orchestrator routes those to the verification fetcher before falling back here).
pub fn detect(root: &Path, config: &Config) -> Result<Box<dyn Adapter>> {
    let adapters = registry();

    if let Some(forced) = &config.compile_force_framework {
        let adapter = adapters
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(forced))
            .ok_or_else(|| CompileError::msg(format!("unknown forced framework `{forced}`")))?;
        if !adapter.detect(root) {
            return Err(CompileError::NoPlatformDetected { target: root.display().to_string() });
        }
        return Ok(adapter);
    }

    adapters
        .into_iter()
        .find(|a| a.detect(root))
        .ok_or_else(|| CompileError::NoPlatformDetected { target: root.display().to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_table_is_ascending_with_foundry_first_among_frameworks() {
        let names = adapter_names();
        let foundry_idx = names.iter().position(|n| *n == "foundry").unwrap();
        let direct_idx = names.iter().position(|n| *n == "direct").unwrap();
        assert!(foundry_idx < direct_idx, "direct solc must be the last fallback");
    }

    #[test]
    fn recognizes_chain_prefixed_addresses() {
        assert!(looks_like_address("0x6B175474E89094C44Da98b954EedeAC495271d0F"));
        assert!(looks_like_address("mainnet:0x6B175474E89094C44Da98b954EedeAC495271d0F"));
        assert!(!looks_like_address("./contracts"));
    }
}
