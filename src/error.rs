//! Crate-wide error types.
//!
//! Mirrors the taxonomy a caller needs to distinguish: failures while locating/running a
//! compiler are distinct from failures while detecting a platform, which are distinct again
//! from failures fetching verified sources from a block explorer. Each concern gets its own
//! `thiserror` enum; [`CompileError`] is the union a consumer of the orchestrator actually sees.

use semver::Version;
use std::{fmt, path::PathBuf, process::ExitStatus};

pub type Result<T, E = CompileError> = std::result::Result<T, E>;

/// Error raised while locating or invoking `solc`.
#[derive(Debug, thiserror::Error)]
pub enum SolcError {
    #[error("solc exited with {0}\n{1}")]
    CompilerOutput(ExitStatus, String),
    #[error("no compiler version satisfies requirement {0}")]
    VersionNotFound(semver::VersionReq),
    #[error("solc version {0} is not installed")]
    VersionNotInstalled(Version),
    #[error("could not determine svm home directory")]
    NoSvmHomeDir,
    #[error(transparent)]
    Install(#[from] VersionManagerError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    SemVer(#[from] semver::Error),
    #[error("{0}")]
    Message(String),
}

impl SolcError {
    pub fn msg(msg: impl fmt::Display) -> Self {
        Self::Message(msg.to_string())
    }

    /// Builds an error from a failed compiler invocation's captured output.
    pub fn from_output(output: &std::process::Output) -> Self {
        let mut msg = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if msg.is_empty() {
            msg = String::from_utf8_lossy(&output.stdout).trim().to_string();
        }
        if msg.is_empty() {
            msg = "<empty output>".to_string();
        }
        Self::CompilerOutput(output.status, msg)
    }
}

/// Error raised while locating or invoking `vyper`.
#[derive(Debug, thiserror::Error)]
pub enum VyperError {
    #[error("vyper exited with {0}\n{1}")]
    CompilerOutput(ExitStatus, String),
    #[error("vyper binary not found at {0}")]
    NotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Message(String),
}

/// Error raised by the `solc` version manager (the `svm` integration).
#[derive(Debug, thiserror::Error)]
pub enum VersionManagerError {
    #[error("solc version {0} is not installed")]
    VersionNotInstalled(Version),
    #[error("installation of solc {0} failed: {1}")]
    InstallationFailed(Version, String),
    #[error("{0}")]
    Message(String),
}

impl VersionManagerError {
    pub fn msg(msg: impl fmt::Display) -> Self {
        Self::Message(msg.to_string())
    }
}

/// The taxonomy from the component design: every failure mode a caller of the orchestrator can
/// observe, tagged with enough context (adapter name, target, exit code) to act on.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("target does not exist and is not a recognizable address: {0}")]
    InvalidTarget(String),

    #[error("no platform adapter matched target {target}")]
    NoPlatformDetected { target: String },

    #[error("compiler binary could not be located (wanted: {0})")]
    CompilerNotFound(String),

    #[error("compilation failed in adapter `{adapter}` for target `{target}`: {diagnostics}")]
    CompilationFailed { adapter: String, target: String, diagnostics: String },

    #[error("compiler crashed in adapter `{adapter}` (exit {exit_code:?}): {stderr}")]
    CompilerCrashed { adapter: String, exit_code: Option<i32>, stderr: String },

    #[error("unresolved library placeholder: {0}")]
    UnresolvedLibrary(String),

    #[error("source for {address} on {chain} is not verified")]
    SourceNotVerified { chain: String, address: String },

    #[error("network error while fetching verified source: {0}")]
    NetworkError(String),

    #[error("contract `{contract}` is ambiguous across monorepo roots: {detail}")]
    ContractAmbiguous { contract: String, detail: String },

    #[error("malformed export archive: {0}")]
    InvalidArchive(String),

    #[error(transparent)]
    Solc(#[from] SolcError),

    #[error(transparent)]
    Vyper(#[from] VyperError),

    #[error(transparent)]
    VersionManager(#[from] VersionManagerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),
}

impl CompileError {
    pub fn msg(msg: impl fmt::Display) -> Self {
        Self::Message(msg.to_string())
    }

    pub fn io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::Io(std::io::Error::new(err.kind(), format!("{err} ({})", path.display())))
    }
}
