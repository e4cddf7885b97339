//! Shared parsing for the family of frameworks whose build output is one JSON file per
//! contract, each holding `abi` plus creation/deployed bytecode under slightly different key
//! names. Foundry, Hardhat, Truffle, Waffle and Brownie all produce this shape; only the build
//! command and a few field names differ, so adapters configure an [`ArtifactLayout`] instead of
//! each re-implementing the same parse.

use crate::error::{CompileError, Result};
use crate::filename::{FilenameIndex, NormalizeHints};
use crate::model::source_unit::{ContractKind, ContractOutput, SourceUnit};
use crate::model::unit::{CompilationUnit, CompilerDescriptor, Language};
use crate::natspec;
use semver::Version;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

/// Describes where a framework's artifacts live and how its per-contract JSON is shaped.
pub struct ArtifactLayout {
    /// Program and arguments to run before reading artifacts (e.g. `forge build`).
    pub build_command: (&'static str, &'static [&'static str]),
    /// Directory (relative to the project root) artifacts are written under.
    pub artifacts_dir: &'static str,
    /// JSON pointer-ish path to the source file the artifact was compiled from, if the artifact
    /// records it (Hardhat/Foundry do; Truffle/Waffle/Brownie often don't and the source path is
    /// inferred from the artifact's own location instead).
    pub source_path_field: Option<&'static str>,
}

fn run_build(root: &Path, layout: &ArtifactLayout, adapter: &str, timeout: Option<Duration>) -> Result<()> {
    let (program, args) = layout.build_command;
    let mut child = match Command::new(program)
        .args(args)
        .current_dir(root)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) => return Err(CompileError::CompilerNotFound(format!("{program}: {err}"))),
    };

    let output = match wait_with_timeout(&mut child, timeout) {
        Some(output) => output,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CompileError::CompilerCrashed {
                adapter: adapter.to_string(),
                exit_code: None,
                stderr: format!(
                    "`{program}` exceeded the configured timeout of {:?} and was killed",
                    timeout.unwrap_or_default()
                ),
            });
        }
    };

    if output.status.success() {
        Ok(())
    } else {
        Err(CompileError::CompilationFailed {
            adapter: adapter.to_string(),
            target: root.display().to_string(),
            diagnostics: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Polls the child with a short sleep between checks rather than blocking on `wait()`, so a
/// hung build can be killed instead of blocking the caller forever. `timeout: None` falls back
/// to an ordinary blocking wait (§5: only subprocess spawn+wait, no deadline, when none is set).
fn wait_with_timeout(child: &mut std::process::Child, timeout: Option<Duration>) -> Option<std::process::Output> {
    let Some(timeout) = timeout else {
        return child.wait_with_output().ok();
    };

    let start = Instant::now();
    loop {
        if let Ok(Some(_)) = child.try_wait() {
            return child.wait_with_output().ok();
        }
        if start.elapsed() >= timeout {
            return None;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Runs the framework's build command and folds every artifact JSON file under
/// `artifacts_dir` into one [`CompilationUnit`]. Artifacts that don't parse as contract JSON
/// (index files, build-info caches) are skipped rather than treated as errors.
pub fn compile(
    root: &Path,
    adapter: &str,
    layout: &ArtifactLayout,
    filenames: &FilenameIndex,
    skip_build: bool,
    timeout: Option<Duration>,
) -> Result<CompilationUnit> {
    if !skip_build {
        run_build(root, layout, adapter, timeout)?;
    }

    let artifacts_dir = root.join(layout.artifacts_dir);
    let files = crate::utils::files_with_extension(&artifacts_dir, &["json"]);

    let compiler_version = files
        .iter()
        .find_map(|f| std::fs::read_to_string(f).ok().and_then(|s| extract_compiler_version(&s)))
        .unwrap_or_else(|| Version::new(0, 0, 0));

    let descriptor = CompilerDescriptor {
        language: Language::Solidity,
        path: PathBuf::from("<framework-managed>"),
        version: compiler_version,
        optimizer_enabled: true,
        optimizer_runs: 200,
        evm_version: None,
        via_ir: false,
        remappings: Vec::new(),
        include_paths: Vec::new(),
    };

    let mut unit = CompilationUnit::new(format!("{adapter}:{}", root.display()), descriptor);

    let hints = NormalizeHints::default();
    let mut pending: std::collections::BTreeMap<PathBuf, SourceUnit> = Default::default();
    for artifact_path in &files {
        let Ok(content) = std::fs::read_to_string(artifact_path) else { continue };
        let Ok(json) = serde_json::from_str::<Value>(&content) else { continue };
        let Some((contract_name, contract)) = parse_contract(&json) else { continue };

        let source_raw = layout
            .source_path_field
            .and_then(|field| json.get(field))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| artifact_path.display().to_string());

        let filename = filenames.intern(&source_raw, root, &hints);
        let source_unit = pending.entry(filename.absolute.clone()).or_insert_with(|| {
            SourceUnit::new(filename.clone(), json.get("ast").cloned().unwrap_or(Value::Null))
        });
        source_unit.contracts.insert(contract_name, contract);
    }

    for (source_path, source_unit) in pending.iter_mut() {
        let content = std::fs::read_to_string(source_path).unwrap_or_default();
        if content.is_empty() {
            continue;
        }
        let declarations = crate::utils::find_declarations(&content);
        let construction_deps = crate::utils::find_construction_deps(&content);
        for contract in source_unit.contracts.values_mut() {
            let declared = declarations.iter().find(|d| d.name == contract.name);
            let mut dependencies = declared.map(|d| d.inherits.clone()).unwrap_or_default();
            for dep in &construction_deps {
                if !dependencies.contains(dep) {
                    dependencies.push(dep.clone());
                }
            }
            contract.dependencies = dependencies;
        }
    }

    for source_unit in pending.into_values() {
        unit.insert_source_unit(source_unit);
    }

    Ok(unit)
}

fn extract_compiler_version(artifact_json: &str) -> Option<Version> {
    let json: Value = serde_json::from_str(artifact_json).ok()?;
    let raw = json.get("metadata").and_then(Value::as_str).and_then(|m| {
        serde_json::from_str::<Value>(m).ok().and_then(|v| v.get("compiler")?.get("version")?.as_str().map(str::to_string))
    });
    let raw = raw.or_else(|| json.get("compiler").and_then(|c| c.get("version")).and_then(Value::as_str).map(str::to_string))?;
    Version::parse(raw.split('+').next().unwrap_or(&raw)).ok()
}

fn parse_contract(json: &Value) -> Option<(String, ContractOutput)> {
    let name = json.get("contractName").and_then(Value::as_str)?.to_string();
    let abi = json.get("abi").cloned().unwrap_or(Value::Array(Vec::new()));

    let bytecode_init = bytecode_field(json, "bytecode")?;
    let bytecode_runtime = bytecode_field(json, "deployedBytecode").unwrap_or_default();

    let libraries_referenced = crate::model::unit::referenced_libraries(&bytecode_init);

    let userdoc = json.get("userdoc").cloned().unwrap_or(Value::Null);
    let devdoc = json.get("devdoc").cloned().unwrap_or(Value::Null);

    Some((
        name.clone(),
        ContractOutput {
            name,
            abi,
            bytecode_init,
            bytecode_runtime,
            srcmap_init: json.get("sourceMap").and_then(Value::as_str).unwrap_or_default().to_string(),
            srcmap_runtime: json
                .get("deployedSourceMap")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            natspec: natspec::fold(&userdoc, &devdoc),
            kind: ContractKind::Contract,
            libraries_referenced,
            dependencies: Vec::new(),
            compiler_id: 0,
        },
    ))
}

/// Handles both the flat-string shape (Truffle/Waffle/Brownie: `"bytecode": "0x60..."`) and the
/// nested Hardhat/Foundry shape (`"bytecode": {"object": "60...", "linkReferences": {...}}`).
fn bytecode_field(json: &Value, key: &str) -> Option<String> {
    match json.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("object").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
