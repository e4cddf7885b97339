//! The `solc` binary: standard-JSON and combined-JSON invocation styles.

use crate::error::{Result, SolcError};
use crate::model::unit::CompilerDescriptor;
use semver::Version;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[cfg(feature = "svm-solc")]
pub mod version_manager;

/// Fields solc's combined-JSON output is asked to include; matches the component design's list
/// exactly (`abi,bin,bin-runtime,srcmap,srcmap-runtime,userdoc,devdoc,hashes,ast`).
pub const COMBINED_JSON_SELECTORS: &str =
    "abi,bin,bin-runtime,srcmap,srcmap-runtime,userdoc,devdoc,hashes,ast";

#[derive(Debug, Clone)]
pub struct Solc {
    pub path: PathBuf,
    pub version: Version,
}

impl Solc {
    pub fn new(path: PathBuf, version: Version) -> Self {
        Self { path, version }
    }

    /// The directory `svm` installs versioned solc binaries under: `~/.svm/<version>/`.
    pub fn svm_home() -> Option<PathBuf> {
        home::home_dir().map(|home| home.join(".svm"))
    }

    /// Every solc version already installed under the svm home directory.
    pub fn installed_versions() -> Vec<Version> {
        let Some(home) = Self::svm_home() else { return Vec::new() };
        let Ok(entries) = std::fs::read_dir(home) else { return Vec::new() };
        entries
            .filter_map(std::result::Result::ok)
            .filter_map(|e| e.file_name().to_str().and_then(|n| Version::parse(n).ok()))
            .collect()
    }

    /// Runs `solc --standard-json`, feeding `input` on stdin and parsing stdout as a
    /// [`StandardJsonOutput`]. This is the primary, modern invocation path.
    pub fn compile_standard_json(&self, input: &StandardJsonInput) -> Result<StandardJsonOutput, SolcError> {
        let payload = serde_json::to_vec(input)?;
        let mut child = Command::new(&self.path)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        child.stdin.take().expect("piped stdin").write_all(&payload)?;
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(SolcError::from_output(&output));
        }

        let parsed: StandardJsonOutput = serde_json::from_slice(&output.stdout)?;
        Ok(parsed)
    }

    /// Runs `solc --combined-json ...`, for legacy flows and platforms that historically wrap
    /// this format (Dapp, some Truffle projects). Each `source` is passed as a positional path
    /// argument rather than via stdin.
    pub fn compile_combined_json(
        &self,
        sources: &[PathBuf],
        extra_args: &[String],
        remappings: &[String],
    ) -> Result<Value, SolcError> {
        let mut cmd = Command::new(&self.path);
        cmd.arg("--combined-json").arg(COMBINED_JSON_SELECTORS);
        for remapping in remappings {
            cmd.arg(remapping);
        }
        for arg in extra_args {
            cmd.arg(arg);
        }
        for source in sources {
            cmd.arg(source);
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = cmd.output()?;
        if !output.status.success() {
            return Err(SolcError::from_output(&output));
        }
        serde_json::from_slice(&output.stdout).map_err(SolcError::from)
    }

    pub fn descriptor(&self, settings: &CompilerSettingsInput) -> CompilerDescriptor {
        CompilerDescriptor {
            language: crate::model::unit::Language::Solidity,
            path: self.path.clone(),
            version: self.version.clone(),
            optimizer_enabled: settings.optimizer_enabled,
            optimizer_runs: settings.optimizer_runs,
            evm_version: settings.evm_version.clone(),
            via_ir: settings.via_ir,
            remappings: settings.remappings.clone(),
            include_paths: settings.include_paths.clone(),
        }
    }
}

/// The subset of settings callers configure per-unit, independent of how they get baked into a
/// standard-JSON input document or combined-JSON argv.
#[derive(Debug, Clone, Default)]
pub struct CompilerSettingsInput {
    pub optimizer_enabled: bool,
    pub optimizer_runs: u32,
    pub evm_version: Option<String>,
    pub via_ir: bool,
    pub remappings: Vec<String>,
    pub include_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StandardJsonInput {
    pub language: &'static str,
    pub sources: BTreeMap<String, SourceEntry>,
    pub settings: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceEntry {
    pub content: String,
}

impl StandardJsonInput {
    pub fn new(sources: BTreeMap<String, String>, settings: &CompilerSettingsInput) -> Self {
        let sources =
            sources.into_iter().map(|(path, content)| (path, SourceEntry { content })).collect();

        let remappings: Vec<Value> =
            settings.remappings.iter().map(|r| Value::String(r.clone())).collect();

        let settings_json = serde_json::json!({
            "optimizer": { "enabled": settings.optimizer_enabled, "runs": settings.optimizer_runs },
            "evmVersion": settings.evm_version,
            "viaIR": settings.via_ir,
            "remappings": remappings,
            "outputSelection": {
                "*": {
                    "*": ["abi", "evm.bytecode", "evm.deployedBytecode", "userdoc", "devdoc"],
                    "": ["ast"],
                }
            },
        });

        Self { language: "Solidity", sources, settings: settings_json }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct StandardJsonOutput {
    #[serde(default)]
    pub errors: Vec<super::Diagnostic>,
    #[serde(default)]
    pub sources: BTreeMap<String, Value>,
    #[serde(default)]
    pub contracts: BTreeMap<String, BTreeMap<String, Value>>,
}

/// solc's pre-0.6 series and some legacy adapters expect the compiler to be discoverable at a
/// fixed relative path rather than on `PATH`; kept as a helper for those adapters.
pub fn default_binary_name() -> &'static str {
    if cfg!(windows) {
        "solc.exe"
    } else {
        "solc"
    }
}

pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}
