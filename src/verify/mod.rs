//! Verification fetcher (component design §4.7): retrieves a verified source bundle for an
//! on-chain address from a block-explorer-shaped API, materializes it under
//! `crytic-export/<service>-contracts/`, and re-dispatches it through the platform registry.
//!
//! Two sub-variants, [`etherscan`] and [`sourcify`], share the protocol implemented here; each
//! only owns parsing its own response shape into a [`FetchedSource`].

pub mod etherscan;
pub mod sourcify;

use crate::config::Config;
use crate::error::{CompileError, Result};
use crate::filename::FilenameIndex;
use crate::model::unit::CompilationUnit;
use crate::platform::{self, AdapterContext};
use crate::utils;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which service a target string was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Etherscan,
    Sourcify,
}

impl Service {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Etherscan => "etherscan-contracts",
            Self::Sourcify => "sourcify-contracts",
        }
    }
}

/// A target string after the chain-prefix grammar (§4.7 step 1) has been parsed out:
/// `mainnet:0x...`, `sourcify-1:0x...`, `sourcify-0x<hex>:0x...`, or a bare `0x...` (defaults to
/// Etherscan mainnet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTarget {
    pub service: Service,
    /// Chain identifier exactly as it appears in the target string (a name like `mainnet`, or a
    /// numeric/hex chain id for `sourcify-*` prefixes).
    pub chain: String,
    pub address: String,
}

/// Compiler settings recovered from a verification response, if the service reported them.
#[derive(Debug, Clone, Default)]
pub struct CompilerSettings {
    pub version: Option<String>,
    pub optimizer_enabled: bool,
    pub optimizer_runs: u32,
    pub evm_version: Option<String>,
    pub via_ir: bool,
    pub remappings: Vec<String>,
}

/// What a fetcher recovers from the remote service: the contract's own name and every source
/// file the response disclosed, keyed by the path the compiler should see it under.
#[derive(Debug, Clone, Default)]
pub struct FetchedSource {
    pub contract_name: String,
    pub files: std::collections::BTreeMap<String, String>,
    pub compiler: Option<CompilerSettings>,
}

/// One service's fetch protocol: query the remote endpoint and recover a [`FetchedSource`], or
/// classify the failure per §4.7's retry/fatal rules.
pub trait Fetcher {
    fn name(&self) -> &'static str;
    fn fetch(&self, chain: &str, address: &str, api_key: Option<&str>) -> Result<FetchResult>;
}

/// A single fetch attempt's outcome, distinguishing retryable from fatal failure without
/// collapsing everything into one error type (the retry loop needs to see HTTP status).
pub enum FetchResult {
    Ok(FetchedSource),
    NotVerified,
    RateLimited,
    Network(String),
}

/// Parses the chain-prefix grammar. Accepts `mainnet:0x...`, `sourcify-1:0x...`,
/// `sourcify-0xaa36a7:0x...`, and a bare `0x...` (defaults to Etherscan on `mainnet`).
pub fn parse_target(target: &str) -> Option<ParsedTarget> {
    let (prefix, address) = match target.rsplit_once(':') {
        Some((prefix, address)) => (Some(prefix), address),
        None => (None, target),
    };

    if !platform::looks_like_address(address) {
        return None;
    }
    let address = address.to_string();

    match prefix {
        None => Some(ParsedTarget { service: Service::Etherscan, chain: "mainnet".to_string(), address }),
        Some(prefix) => {
            if let Some(chain) = prefix.strip_prefix("sourcify-") {
                Some(ParsedTarget { service: Service::Sourcify, chain: chain.to_string(), address })
            } else {
                Some(ParsedTarget { service: Service::Etherscan, chain: prefix.to_string(), address })
            }
        }
    }
}

/// Directory sources are (or would be) materialized under for this target, per §4.7 step 3:
/// `crytic-export/<service>-contracts/<chain>-<address>-<contract>/`. `contract_name` is only
/// known after a successful fetch, so idempotence checks that don't yet have a name instead glob
/// on the `<chain>-<address>-` prefix directly — see [`find_materialized`].
fn materialized_dir(export_root: &Path, parsed: &ParsedTarget, contract_name: &str) -> PathBuf {
    export_root
        .join(parsed.service.dir_name())
        .join(format!("{}-{}-{}", parsed.chain, parsed.address, contract_name))
}

const MARKER_FILE: &str = "crytic_compile.config.json";

/// Runs the full fetch → materialize → re-dispatch protocol (§4.7) for one address target.
/// Idempotent: if a previous run already materialized and marked a directory for this exact
/// `(service, chain, address)`, the network fetch is skipped entirely.
pub fn fetch_and_dispatch(
    target: &str,
    export_root: &Path,
    config: &Config,
    filenames: &FilenameIndex,
) -> Result<Vec<CompilationUnit>> {
    let parsed = parse_target(target)
        .ok_or_else(|| CompileError::InvalidTarget(target.to_string()))?;

    if let Some(existing) = find_materialized(export_root, &parsed) {
        return redispatch(&existing, config, filenames);
    }

    let api_key = config.resolved_etherscan_api_key();
    let fetched = match parsed.service {
        Service::Etherscan => fetch_with_retry(&etherscan::EtherscanFetcher, &parsed, api_key.as_deref())?,
        Service::Sourcify => fetch_with_retry(&sourcify::SourcifyFetcher, &parsed, None)?,
    };

    let dir = materialized_dir(export_root, &parsed, &fetched.contract_name);
    materialize(&dir, &fetched)?;

    redispatch(&dir, config, filenames)
}

/// Finds an already-materialized directory for this target, if its marker file is present
/// (§4.7: "if the materialized directory already exists and contains
/// `crytic_compile.config.json`, the fetch is skipped and re-dispatch runs directly").
fn find_materialized(export_root: &Path, parsed: &ParsedTarget) -> Option<PathBuf> {
    let base = export_root.join(parsed.service.dir_name());
    let prefix = format!("{}-{}-", parsed.chain, parsed.address);
    let entries = std::fs::read_dir(&base).ok()?;
    entries
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .find(|p| {
            p.is_dir()
                && p.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with(&prefix))
                && p.join(MARKER_FILE).is_file()
        })
}

fn materialize(dir: &Path, fetched: &FetchedSource) -> Result<()> {
    for (path, content) in &fetched.files {
        let target = dir.join(path);
        utils::create_parent_dir_all(&target)?;
        std::fs::write(&target, content).map_err(|e| CompileError::io(e, target.clone()))?;
    }

    if let Some(settings) = &fetched.compiler {
        let document = serde_json::json!({
            "solc": settings.version,
            "optimizer": { "enabled": settings.optimizer_enabled, "runs": settings.optimizer_runs },
            "evmVersion": settings.evm_version,
            "viaIR": settings.via_ir,
            "solc_remaps": settings.remappings,
        });
        utils::write_json_file(&document, dir.join(MARKER_FILE))?;
    } else {
        utils::write_json_file(&serde_json::json!({}), dir.join(MARKER_FILE))?;
    }

    Ok(())
}

fn redispatch(dir: &Path, config: &Config, filenames: &FilenameIndex) -> Result<Vec<CompilationUnit>> {
    let adapter = platform::detect(dir, config)?;
    let ctx = AdapterContext { root: dir.to_path_buf(), filenames, config };
    adapter.compile(&ctx)
}

/// Retries a fetch per §4.7: up to 5 attempts on HTTP 429, exponential back-off with jitter.
/// 404/unverified is immediately fatal. Missing API key is the caller's concern (passed through
/// as `None`); this only controls the retry cadence, which is longer when unauthenticated.
fn fetch_with_retry(fetcher: &dyn Fetcher, parsed: &ParsedTarget, api_key: Option<&str>) -> Result<FetchedSource> {
    const MAX_ATTEMPTS: u32 = 5;
    let base_delay_ms: u64 = if api_key.is_some() { 250 } else { 750 };

    let mut attempt = 0;
    loop {
        attempt += 1;
        match fetcher.fetch(&parsed.chain, &parsed.address, api_key)? {
            FetchResult::Ok(fetched) => return Ok(fetched),
            FetchResult::NotVerified => {
                return Err(CompileError::SourceNotVerified {
                    chain: parsed.chain.clone(),
                    address: parsed.address.clone(),
                })
            }
            FetchResult::RateLimited if attempt < MAX_ATTEMPTS => {
                std::thread::sleep(backoff_with_jitter(attempt, base_delay_ms));
            }
            FetchResult::RateLimited => {
                return Err(CompileError::NetworkError(format!(
                    "{} rate-limited after {MAX_ATTEMPTS} attempts",
                    fetcher.name()
                )))
            }
            FetchResult::Network(detail) => return Err(CompileError::NetworkError(detail)),
        }
    }
}

fn backoff_with_jitter(attempt: u32, base_delay_ms: u64) -> Duration {
    let exponential = base_delay_ms.saturating_mul(1u64 << attempt.min(6));
    let jitter = rand::thread_rng().gen_range(0..=exponential / 4 + 1);
    Duration::from_millis(exponential + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_mainnet_address() {
        let parsed = parse_target("0x6B175474E89094C44Da98b954EedeAC495271d0F").unwrap();
        assert_eq!(parsed.service, Service::Etherscan);
        assert_eq!(parsed.chain, "mainnet");
    }

    #[test]
    fn parses_chain_prefixed_etherscan_target() {
        let parsed = parse_target("polygon:0x6B175474E89094C44Da98b954EedeAC495271d0F").unwrap();
        assert_eq!(parsed.service, Service::Etherscan);
        assert_eq!(parsed.chain, "polygon");
    }

    #[test]
    fn parses_sourcify_prefixed_target() {
        let parsed = parse_target("sourcify-1:0x6B175474E89094C44Da98b954EedeAC495271d0F").unwrap();
        assert_eq!(parsed.service, Service::Sourcify);
        assert_eq!(parsed.chain, "1");
    }

    #[test]
    fn rejects_non_address_targets() {
        assert!(parse_target("./contracts").is_none());
    }

    #[test]
    fn finds_previously_materialized_directory() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("etherscan-contracts");
        let entry = base.join("mainnet-0xabc-Dai");
        std::fs::create_dir_all(&entry).unwrap();
        std::fs::write(entry.join(MARKER_FILE), "{}").unwrap();

        let parsed = ParsedTarget { service: Service::Etherscan, chain: "mainnet".to_string(), address: "0xabc".to_string() };
        let found = find_materialized(dir.path(), &parsed).unwrap();
        assert_eq!(found, entry);
    }
}
