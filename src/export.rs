//! Re-serializes the canonical [`Project`] model into the interchange formats named in
//! `spec.md` §6: `standard` (the crate's own wire format), `solc` (flat combined-JSON-shaped),
//! `truffle` (one JSON file per contract) and `archive` (the whole model, for later rehydration
//! by [`crate::platform::archive`]).
//!
//! The specific JSON shape of each format beyond what the canonical model requires is explicitly
//! out of scope (`spec.md` §1); this module only owns getting the canonical model's own fields
//! into each shape, not matching any particular framework's file-for-file schema.

use crate::error::Result;
use crate::model::project::{ExportFormat, Project};
use crate::utils;
use path_slash::PathExt as _;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Forward-slash path string for an export key (`solc --combined-json` convention,
/// `path:ContractName`), so the same project exports byte-identically on Windows and Unix.
fn slash_path(path: &Path) -> String {
    path.to_slash_lossy().into_owned()
}

/// Writes every format configured on `project.export.formats` under `project.export.export_dir`
/// (joined to `base_dir`, usually the project's working directory). Returns the paths written,
/// in format order, for a caller that wants to know what landed on disk.
pub fn export(project: &Project, base_dir: &Path) -> Result<Vec<PathBuf>> {
    let export_dir = base_dir.join(&project.export.export_dir);
    let mut written = Vec::new();

    for format in &project.export.formats {
        written.push(export_format(project, *format, &export_dir)?);
    }

    Ok(written)
}

fn export_format(project: &Project, format: ExportFormat, export_dir: &Path) -> Result<PathBuf> {
    match format {
        ExportFormat::Standard => export_standard(project, export_dir),
        ExportFormat::Solc => export_solc(project, export_dir),
        ExportFormat::Truffle => export_truffle(project, export_dir),
        ExportFormat::Archive => export_archive(project, export_dir),
    }
}

/// The canonical `standard` JSON: a top-level object keyed by `compilation_units`, each
/// containing `compiler`, `source_units` (keyed by absolute path, sorted — per §5's ordering
/// guarantee: "the canonical export format sorts source units by `Filename.absolute` to remain
/// byte-stable"), `working_dir`, `type` and `unit_id`.
fn export_standard(project: &Project, export_dir: &Path) -> Result<PathBuf> {
    let mut compilation_units = serde_json::Map::new();

    for (unit_id, unit) in &project.units {
        let mut source_units = serde_json::Map::new();
        for (path, source_unit) in &unit.source_units {
            let mut contracts = serde_json::Map::new();
            for (name, contract) in &source_unit.contracts {
                contracts.insert(
                    name.clone(),
                    json!({
                        "abi": contract.abi,
                        "bin": contract.bytecode_init,
                        "bin-runtime": contract.bytecode_runtime,
                        "srcmap": contract.srcmap_init,
                        "srcmap-runtime": contract.srcmap_runtime,
                        "userdoc": natspec_to_userdoc(&contract.natspec),
                        "devdoc": natspec_to_devdoc(&contract.natspec),
                        "hashes": Value::Object(Default::default()),
                    }),
                );
            }

            source_units.insert(
                slash_path(path),
                json!({ "ast": source_unit.ast, "contracts": Value::Object(contracts) }),
            );
        }

        compilation_units.insert(
            unit_id.clone(),
            json!({
                "compiler": unit.compiler,
                "source_units": Value::Object(source_units),
                "working_dir": project.working_dir,
                "type": project.platform,
                "unit_id": unit_id,
            }),
        );
    }

    let document = json!({ "compilation_units": Value::Object(compilation_units) });
    let path = export_dir.join("contracts.json");
    utils::write_json_file(&document, &path)?;
    Ok(path)
}

/// `solc` format: one flat combined-JSON-shaped document across every unit, keyed
/// `path:ContractName`, matching what a caller feeding `solc --combined-json` output into other
/// tooling already expects.
fn export_solc(project: &Project, export_dir: &Path) -> Result<PathBuf> {
    let mut contracts = serde_json::Map::new();
    for unit in project.units.values() {
        for (path, source_unit) in &unit.source_units {
            for (name, contract) in &source_unit.contracts {
                let key = format!("{}:{name}", slash_path(path));
                contracts.insert(
                    key,
                    json!({
                        "abi": contract.abi,
                        "bin": contract.bytecode_init,
                        "bin-runtime": contract.bytecode_runtime,
                        "srcmap": contract.srcmap_init,
                        "srcmap-runtime": contract.srcmap_runtime,
                    }),
                );
            }
        }
    }

    let document = json!({ "contracts": Value::Object(contracts) });
    let path = export_dir.join("combined_solc.json");
    utils::write_json_file(&document, &path)?;
    Ok(path)
}

/// `truffle` format: one `<ContractName>.json` file per contract, Truffle-artifact-shaped.
/// Returns the directory the files were written under (truffle artifacts have no single entry
/// file the way `standard`/`solc` do).
fn export_truffle(project: &Project, export_dir: &Path) -> Result<PathBuf> {
    utils::create_parent_dir_all(export_dir.join("_"))?;
    for unit in project.units.values() {
        for source_unit in unit.source_units.values() {
            for (name, contract) in &source_unit.contracts {
                let document = json!({
                    "contractName": name,
                    "abi": contract.abi,
                    "bytecode": format!("0x{}", contract.bytecode_init.trim_start_matches("0x")),
                    "deployedBytecode": format!("0x{}", contract.bytecode_runtime.trim_start_matches("0x")),
                    "sourceMap": contract.srcmap_init,
                    "deployedSourceMap": contract.srcmap_runtime,
                    "sourcePath": source_unit.file.used,
                    "compiler": { "version": unit.compiler.version.to_string() },
                });
                utils::write_json_file(&document, export_dir.join(format!("{name}.json")))?;
            }
        }
    }
    Ok(export_dir.to_path_buf())
}

/// `archive` format: the whole canonical model, serialized verbatim, for later rehydration by
/// `platform::archive` (design notes §9(b): "intent is rehydrate prior result").
fn export_archive(project: &Project, export_dir: &Path) -> Result<PathBuf> {
    let file_stem = sanitize_target_for_filename(&project.target);
    let path = export_dir.join(format!("{file_stem}_export_archive.json"));
    utils::write_json_file(project, &path)?;
    Ok(path)
}

fn sanitize_target_for_filename(target: &str) -> String {
    target
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn natspec_to_userdoc(natspec: &crate::natspec::NatSpec) -> Value {
    let mut methods = serde_json::Map::new();
    let mut notice = None;
    for (selector, doc) in &natspec.by_selector {
        if selector == crate::natspec::CONTRACT_LEVEL_KEY {
            notice = doc.notice.clone();
            continue;
        }
        if let Some(n) = &doc.notice {
            methods.insert(selector.clone(), json!({ "notice": n }));
        }
    }
    json!({ "notice": notice, "methods": Value::Object(methods) })
}

fn natspec_to_devdoc(natspec: &crate::natspec::NatSpec) -> Value {
    let mut methods = serde_json::Map::new();
    let mut details = None;
    for (selector, doc) in &natspec.by_selector {
        if selector == crate::natspec::CONTRACT_LEVEL_KEY {
            details = doc.details.clone();
            continue;
        }
        if doc.details.is_some() || !doc.params.is_empty() || !doc.returns.is_empty() {
            methods.insert(
                selector.clone(),
                json!({ "details": doc.details, "params": doc.params, "returns": doc.returns }),
            );
        }
    }
    json!({ "details": details, "methods": Value::Object(methods) })
}

/// Packing an export directory into a single archive (`--export-zip`) is delegated to an
/// external zip/unzip collaborator per `spec.md` §1; this crate only exposes the directory an
/// embedding binary should hand to that collaborator; it does not perform the packing itself.
pub fn export_zip_source_dir(project: &Project, base_dir: &Path) -> PathBuf {
    base_dir.join(&project.export.export_dir)
}

/// Re-imports a project serialized by [`export_archive`], re-interning every file path through
/// `filenames` so the rehydrated model respects the one-identity-per-absolute-path invariant
/// rather than trusting whatever `Arc<Filename>` instances deserialization happened to allocate.
pub fn import_archive(
    path: &Path,
    filenames: &crate::filename::FilenameIndex,
) -> Result<Project> {
    use crate::filename::NormalizeHints;

    let mut project: Project = utils::read_json_file(path)?;
    let hints = NormalizeHints::default();

    for unit in project.units.values_mut() {
        let mut relinked = std::collections::BTreeMap::new();
        for (_, mut source_unit) in std::mem::take(&mut unit.source_units) {
            let interned = filenames.intern(&source_unit.file.used, &project.working_dir, &hints);
            source_unit.file = interned.clone();
            relinked.insert(interned.absolute.clone(), source_unit);
        }
        unit.source_units = relinked;
    }

    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::project::ExportSettings;
    use crate::model::source_unit::{ContractKind, ContractOutput, SourceUnit};
    use crate::model::unit::{CompilationUnit, CompilerDescriptor, Language};

    fn sample_project(dir: &Path) -> Project {
        let mut project = Project::new(dir.to_path_buf(), "contracts/Foo.sol", "direct");
        let descriptor = CompilerDescriptor {
            language: Language::Solidity,
            path: PathBuf::from("solc"),
            version: semver::Version::new(0, 8, 19),
            optimizer_enabled: true,
            optimizer_runs: 200,
            evm_version: None,
            via_ir: false,
            remappings: Vec::new(),
            include_paths: Vec::new(),
        };
        let mut unit = CompilationUnit::new("unit-1", descriptor);
        let filename = project.filenames.intern("Foo.sol", dir, &Default::default());
        let mut source_unit = SourceUnit::new(filename, Value::Null);
        source_unit.contracts.insert(
            "Foo".to_string(),
            ContractOutput {
                name: "Foo".to_string(),
                abi: json!([]),
                bytecode_init: "6001".to_string(),
                bytecode_runtime: "6002".to_string(),
                srcmap_init: "0:1:0".to_string(),
                srcmap_runtime: "0:1:0".to_string(),
                natspec: Default::default(),
                kind: ContractKind::Contract,
                libraries_referenced: Vec::new(),
                dependencies: Vec::new(),
                compiler_id: 0,
            },
        );
        unit.insert_source_unit(source_unit);
        project.insert_unit(unit);
        project.export = ExportSettings { formats: vec![ExportFormat::Archive], export_dir: PathBuf::from("crytic-export") };
        project
    }

    #[test]
    fn archive_round_trips_contracts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Foo.sol"), "contract Foo {}").unwrap();
        let project = sample_project(dir.path());

        let written = export(&project, dir.path()).unwrap();
        assert_eq!(written.len(), 1);

        let filenames = crate::filename::FilenameIndex::new();
        let reimported = import_archive(&written[0], &filenames).unwrap();

        assert_eq!(reimported.units.len(), project.units.len());
        let original_contract = &project.units["unit-1"].source_units.values().next().unwrap().contracts["Foo"];
        let reimported_contract =
            &reimported.units["unit-1"].source_units.values().next().unwrap().contracts["Foo"];
        assert_eq!(original_contract.bytecode_init, reimported_contract.bytecode_init);
        assert_eq!(original_contract.abi, reimported_contract.abi);
    }

    #[test]
    fn standard_export_sorts_source_units_by_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Foo.sol"), "contract Foo {}").unwrap();
        let mut project = sample_project(dir.path());
        project.export.formats = vec![ExportFormat::Standard];

        let written = export(&project, dir.path()).unwrap();
        let document: Value = serde_json::from_str(&std::fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert!(document["compilation_units"]["unit-1"]["source_units"].is_object());
    }
}
