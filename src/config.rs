//! Caller-facing configuration surface.
//!
//! `spec.md` places the CLI argument parser out of scope as an external collaborator; this is
//! the struct an embedding binary populates after parsing `argv` (mirrors how
//! `foundry-compilers` separates `ProjectPathsConfig`/`Project::builder()` from `forge`'s own
//! `clap` definitions, which live in a different crate entirely). Every flag in the component
//! design's CLI table (spec.md §6) has a field here; nothing in this crate ever reads `argv` or
//! installs a `tracing` subscriber.

use crate::error::{CompileError, Result};
use crate::model::project::ExportFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable fallback for [`Config::etherscan_api_key`] (`--etherscan-apikey`).
pub const ETHERSCAN_API_KEY_VAR: &str = "ETHERSCAN_API_KEY";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `--compile-force-framework <name>`. Skips detection; only the named adapter's `detect`
    /// is consulted, and a `false` result from it is fatal rather than falling through.
    pub compile_force_framework: Option<String>,
    /// `--solc <path>`. Overrides the compiler binary the locator would otherwise resolve.
    pub solc: Option<PathBuf>,
    /// `--solc-args <string>`. Extra arguments passed through verbatim to the compiler
    /// invocation (split on whitespace).
    pub solc_args: Vec<String>,
    /// `--solc-remaps <list>`. Import remappings, `prefix=target` pairs.
    pub solc_remaps: Vec<String>,
    /// `--solc-disable-warnings`. Drops warning-severity diagnostics from stderr before they're
    /// surfaced to the caller.
    pub solc_disable_warnings: bool,
    /// `--compile-remove-metadata`. Strips the CBOR trailer from stored bytecode after decoding
    /// it, rather than keeping both views.
    pub compile_remove_metadata: bool,
    /// `--compile-custom-build <cmd>`. Bypasses the chosen adapter's own build invocation and
    /// runs this command instead; the adapter still owns reading the resulting artifacts.
    pub compile_custom_build: Option<String>,
    /// Adapters skip invoking their build command and read whatever artifacts are already on
    /// disk. Used by callers that have already built (and by this crate's own tests, to avoid
    /// shelling out to `forge`/`npx` for a synthetic fixture).
    pub skip_build: bool,
    /// `--export-format`/`--export-formats`.
    pub export_formats: Vec<ExportFormat>,
    /// `--export-dir <path>`, default `crytic-export`.
    pub export_dir: PathBuf,
    /// `--export-zip <file>`.
    pub export_zip: Option<PathBuf>,
    /// `--export-zip-type <fmt>`.
    pub export_zip_type: Option<String>,
    /// `--etherscan-apikey <k>`, falling back to `ETHERSCAN_API_KEY` at [`Config::resolved_etherscan_api_key`].
    pub etherscan_api_key: Option<String>,
    /// Design notes §9(c): a `0.3.1`-era framework bug required a retry-with-clean on first
    /// compile failure. Left unverified whether modern framework versions still need it, so this
    /// defaults off and is parametrized rather than hardcoded (see `DESIGN.md`).
    pub retry_clean_on_failure: bool,
    /// Wall-clock budget for a single framework build invocation (`forge build`, `npx hardhat
    /// compile`, ...); on expiry the subprocess is killed and the adapter call fails with
    /// `CompilerCrashed` rather than blocking forever (§5, "Suspension / blocking points"). `None`
    /// (the default) waits on the subprocess with no deadline.
    pub timeout: Option<std::time::Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compile_force_framework: None,
            solc: None,
            solc_args: Vec::new(),
            solc_remaps: Vec::new(),
            solc_disable_warnings: false,
            compile_remove_metadata: false,
            compile_custom_build: None,
            skip_build: false,
            export_formats: vec![ExportFormat::Standard],
            export_dir: PathBuf::from("crytic-export"),
            export_zip: None,
            export_zip_type: None,
            etherscan_api_key: None,
            retry_clean_on_failure: false,
            timeout: None,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `--config-file <path>`: loads (and merges on top of defaults) additional settings from a
    /// JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        crate::utils::read_json_file(path)
    }

    /// `--etherscan-apikey` if set, otherwise the `ETHERSCAN_API_KEY` environment variable.
    pub fn resolved_etherscan_api_key(&self) -> Option<String> {
        self.etherscan_api_key.clone().or_else(|| std::env::var(ETHERSCAN_API_KEY_VAR).ok())
    }

    pub fn remapping_pairs(&self) -> Vec<(String, PathBuf)> {
        self.solc_remaps
            .iter()
            .filter_map(|raw| {
                let (prefix, target) = raw.split_once('=')?;
                Some((prefix.to_string(), PathBuf::from(target)))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    #[must_use]
    pub fn force_framework(mut self, name: impl Into<String>) -> Self {
        self.config.compile_force_framework = Some(name.into());
        self
    }

    #[must_use]
    pub fn solc(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.solc = Some(path.into());
        self
    }

    #[must_use]
    pub fn solc_remap(mut self, remap: impl Into<String>) -> Self {
        self.config.solc_remaps.push(remap.into());
        self
    }

    #[must_use]
    pub fn skip_build(mut self, skip: bool) -> Self {
        self.config.skip_build = skip;
        self
    }

    #[must_use]
    pub fn export_formats(mut self, formats: Vec<ExportFormat>) -> Self {
        self.config.export_formats = formats;
        self
    }

    #[must_use]
    pub fn export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.export_dir = dir.into();
        self
    }

    #[must_use]
    pub fn etherscan_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.etherscan_api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// `--config-file` loading one step removed from [`Config::from_file`]: reports
/// [`CompileError::InvalidTarget`] rather than a bare IO/serde error when the path itself looks
/// wrong, since a bad `--config-file` is a caller mistake, not an internal failure mode.
pub fn load_config_file(path: &Path) -> Result<Config> {
    if !path.is_file() {
        return Err(CompileError::InvalidTarget(path.display().to_string()));
    }
    Config::from_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = Config::builder().skip_build(true).force_framework("foundry").build();
        assert!(config.skip_build);
        assert_eq!(config.compile_force_framework.as_deref(), Some("foundry"));
    }

    #[test]
    fn etherscan_key_falls_back_to_env() {
        std::env::set_var(ETHERSCAN_API_KEY_VAR, "from-env");
        let config = Config::default();
        assert_eq!(config.resolved_etherscan_api_key().as_deref(), Some("from-env"));
        std::env::remove_var(ETHERSCAN_API_KEY_VAR);
    }

    #[test]
    fn remapping_pairs_split_on_equals() {
        let config = Config::builder().solc_remap("@oz/=lib/openzeppelin-contracts/").build();
        let pairs = config.remapping_pairs();
        assert_eq!(pairs[0].0, "@oz/");
        assert_eq!(pairs[0].1, PathBuf::from("lib/openzeppelin-contracts/"));
    }
}
