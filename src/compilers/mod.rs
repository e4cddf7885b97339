//! Compiler location, invocation and output parsing for `solc` and `vyper`.

pub mod solc;
pub mod vyper;

use crate::error::{CompileError, Result, SolcError};
use crate::utils;
use semver::{Version, VersionReq};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Diagnostic severity as classified by solc's own JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

/// One entry of a compiler's `errors` array (standard-JSON) or a parsed combined-JSON failure.
#[derive(Debug, Clone, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "formattedMessage")]
    pub formatted_message: Option<String>,
    #[serde(default, rename = "errorCode")]
    pub error_code: Option<String>,
}

impl Diagnostic {
    pub fn display(&self) -> &str {
        self.formatted_message.as_deref().unwrap_or(&self.message)
    }

    /// `display()`, colored by severity, for an embedding CLI that wants to print diagnostics
    /// the way `solc`'s own terminal output does (red errors, yellow warnings).
    pub fn display_colored(&self) -> String {
        let painted = match self.severity {
            Severity::Error => yansi::Paint::red(self.display()),
            Severity::Warning => yansi::Paint::yellow(self.display()),
            Severity::Info => yansi::Paint::new(self.display()),
        };
        painted.to_string()
    }
}

/// Where the compiler binary for an invocation came from, in locator-priority order (spec
/// §4.5): an explicit path always wins, then an explicit version resolved through a version
/// manager, then a version implied by the first `pragma solidity` seen in the sources, then
/// whatever `solc` is on `PATH`.
#[derive(Debug, Clone)]
pub enum Locator {
    ExplicitPath(PathBuf),
    ExplicitVersion(VersionReq),
    PragmaImplied(VersionReq),
    SystemPath,
}

/// Resolves a [`Locator`] to a usable solc binary, installing it via the version manager if
/// needed and the `svm-solc` feature is enabled.
pub fn resolve_solc(locator: &Locator) -> Result<solc::Solc, SolcError> {
    match locator {
        Locator::ExplicitPath(path) => probe(path.clone()),
        Locator::ExplicitVersion(req) => resolve_via_version_manager(req),
        Locator::PragmaImplied(req) => {
            resolve_via_version_manager(req).or_else(|_| resolve_on_path())
        }
        Locator::SystemPath => resolve_on_path(),
    }
}

fn resolve_on_path() -> Result<solc::Solc, SolcError> {
    let path = which_on_path("solc").ok_or_else(|| SolcError::msg("solc not found on PATH"))?;
    probe(path)
}

fn which_on_path(binary: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).map(|dir| dir.join(binary)).find(|p| p.is_file())
}

fn probe(path: PathBuf) -> Result<solc::Solc, SolcError> {
    let output = std::process::Command::new(&path)
        .arg("--version")
        .output()
        .map_err(SolcError::Io)?;
    if !output.status.success() {
        return Err(SolcError::from_output(&output));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = parse_version_output(&stdout)?;
    Ok(solc::Solc::new(path, version))
}

fn parse_version_output(stdout: &str) -> Result<Version, SolcError> {
    static RE: once_cell::sync::Lazy<regex::Regex> =
        once_cell::sync::Lazy::new(|| regex::Regex::new(r"Version:\s*(\d+\.\d+\.\d+)").unwrap());
    let captured = RE
        .captures(stdout)
        .and_then(|c| c.get(1))
        .ok_or_else(|| SolcError::msg("could not parse solc --version output"))?;
    Version::parse(captured.as_str()).map_err(SolcError::from)
}

#[cfg(feature = "svm-solc")]
fn resolve_via_version_manager(req: &VersionReq) -> Result<solc::Solc, SolcError> {
    solc::version_manager::resolve(req)
}

#[cfg(not(feature = "svm-solc"))]
fn resolve_via_version_manager(req: &VersionReq) -> Result<solc::Solc, SolcError> {
    Err(SolcError::VersionNotFound(req.clone()))
}

/// Finds the Vyper binary on `PATH` or at an explicit override.
pub fn resolve_vyper(explicit: Option<&Path>) -> Result<vyper::Vyper, CompileError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => which_on_path("vyper")
            .ok_or_else(|| CompileError::CompilerNotFound("vyper".to_string()))?,
    };
    vyper::Vyper::at(path).map_err(CompileError::from)
}

/// Classifies a nonzero compiler exit: if stderr parses as a JSON diagnostics array (or a
/// standard-JSON `errors` field), errors are `compilation_failed` and warnings are logged and
/// dropped; otherwise the raw output is preserved as `compiler_crashed`.
pub fn classify_failure(adapter: &str, target: &str, output: &std::process::Output) -> CompileError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if let Ok(diagnostics) = serde_json::from_str::<Vec<Diagnostic>>(&stderr) {
        let errors: Vec<_> = diagnostics.iter().filter(|d| d.severity.is_error()).collect();
        if !errors.is_empty() {
            let diagnostics = errors.iter().map(|d| d.display().to_string()).collect::<Vec<_>>().join("\n");
            return CompileError::CompilationFailed {
                adapter: adapter.to_string(),
                target: target.to_string(),
                diagnostics,
            };
        }
    }
    CompileError::CompilerCrashed {
        adapter: adapter.to_string(),
        exit_code: output.status.code(),
        stderr: stderr.trim().to_string(),
    }
}

/// Extracts the version requirement from the first `pragma solidity` directive in `source`, if
/// any parses as a valid requirement.
pub fn pragma_version_req(source: &str) -> Option<VersionReq> {
    let raw = utils::find_version_pragma(source)?;
    VersionReq::parse(&normalize_pragma(&raw)).ok()
}

/// solc pragmas allow space-separated compound ranges (`>=0.8.0 <0.9.0`); `semver::VersionReq`
/// wants them comma-separated.
fn normalize_pragma(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(", ")
}
