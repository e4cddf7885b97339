//! The `vyper` binary: a separate argument convention and output shape from solc, adapted to
//! the same per-contract record once parsed.

use crate::error::VyperError;
use crate::model::unit::CompilerDescriptor;
use semver::Version;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::process::{Command, Stdio};

#[derive(Debug, Clone)]
pub struct Vyper {
    pub path: PathBuf,
    pub version: Version,
}

impl Vyper {
    /// Probes `path` with `--version` and parses the reported version.
    pub fn at(path: PathBuf) -> Result<Self, VyperError> {
        if !path.is_file() {
            return Err(VyperError::NotFound(path));
        }
        let output = Command::new(&path).arg("--version").output()?;
        if !output.status.success() {
            return Err(VyperError::CompilerOutput(
                output.status,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        let raw = String::from_utf8_lossy(&output.stdout);
        // vyper prints e.g. "0.3.10+commit.91361694"; take the part before the build metadata.
        let version_str = raw.trim().split('+').next().unwrap_or(raw.trim());
        let version = Version::parse(version_str)
            .map_err(|e| VyperError::Message(format!("unparseable vyper version {raw:?}: {e}")))?;
        Ok(Self { path, version })
    }

    /// Vyper's `-f` combined output flag, the closest analog to solc's `--combined-json`: asks
    /// for everything this crate's canonical model needs in one invocation.
    pub fn compile(&self, sources: &[PathBuf], extra_args: &[String]) -> Result<VyperOutput, VyperError> {
        let mut cmd = Command::new(&self.path);
        cmd.arg("-f").arg("combined_json");
        for arg in extra_args {
            cmd.arg(arg);
        }
        for source in sources {
            cmd.arg(source);
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = cmd.output()?;
        if !output.status.success() {
            return Err(VyperError::CompilerOutput(
                output.status,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        serde_json::from_slice(&output.stdout).map_err(VyperError::from)
    }

    pub fn descriptor(&self) -> CompilerDescriptor {
        CompilerDescriptor {
            language: crate::model::unit::Language::Vyper,
            path: self.path.clone(),
            version: self.version.clone(),
            optimizer_enabled: true,
            optimizer_runs: 0,
            evm_version: None,
            via_ir: false,
            remappings: Vec::new(),
            include_paths: Vec::new(),
        }
    }
}

/// Vyper's combined-JSON output, keyed by `path:ContractName`. Shaped the same way solc's
/// combined-JSON is, minus fields that don't apply to Vyper (no libraries, no jump-type in the
/// source map — Vyper's source maps carry only `s:l` pairs).
#[derive(Debug, Clone, Deserialize)]
pub struct VyperOutput {
    #[serde(default)]
    pub contracts: std::collections::BTreeMap<String, VyperContractEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VyperContractEntry {
    pub abi: Value,
    pub bin: String,
    #[serde(rename = "bin-runtime")]
    pub bin_runtime: String,
    #[serde(default)]
    pub srcmap: String,
    #[serde(default, rename = "srcmap-runtime")]
    pub srcmap_runtime: String,
    #[serde(default)]
    pub ast: Value,
}
