//! The final fallback adapter (component design priority table, "1000 (fallback)"): treats the
//! target as a bare `.sol`/`.vy` source list rather than a framework project, driving
//! `compilers::solc`/`compilers::vyper` directly.

use super::{Adapter, AdapterContext};
use crate::compilers::{self, solc, Locator};
use crate::error::{CompileError, Result};
use crate::filename::{Filename, FilenameIndex, NormalizeHints};
use crate::model::source_unit::{ContractKind, ContractOutput, SourceUnit};
use crate::model::unit::CompilationUnit;
use crate::natspec;
use crate::utils;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct DirectAdapter;

impl Adapter for DirectAdapter {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn priority(&self) -> i32 {
        1000
    }

    fn detect(&self, root: &Path) -> bool {
        is_source_file(root) || (root.is_dir() && !utils::files_with_extension(root, &["sol", "vy"]).is_empty())
    }

    fn compile(&self, ctx: &AdapterContext<'_>) -> Result<Vec<CompilationUnit>> {
        let entries = entry_files(&ctx.root);
        if entries.is_empty() {
            return Err(CompileError::InvalidTarget(ctx.root.display().to_string()));
        }

        let (sol_entries, vy_entries): (Vec<_>, Vec<_>) =
            entries.into_iter().partition(|p| p.extension().and_then(|e| e.to_str()) != Some("vy"));

        let mut units = Vec::new();
        if !sol_entries.is_empty() {
            units.push(compile_solidity(ctx, &sol_entries)?);
        }
        if !vy_entries.is_empty() {
            units.push(compile_vyper(ctx, &vy_entries)?);
        }
        Ok(units)
    }
}

fn is_source_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("sol") | Some("vy")) && path.is_file()
}

/// `root` itself if it's a source file, otherwise every `.sol`/`.vy` file directly discoverable
/// under it.
fn entry_files(root: &Path) -> Vec<PathBuf> {
    if is_source_file(root) {
        return vec![root.to_path_buf()];
    }
    utils::files_with_extension(root, &["sol", "vy"])
}

/// The directory imports and entry paths are relativized against. When `root` is itself a source
/// file (a single-file target), that's the file's parent, not the file — otherwise every entry
/// string would relativize to empty and collide in `sources`.
fn base_dir(root: &Path) -> PathBuf {
    if is_source_file(root) {
        root.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))
    } else {
        root.to_path_buf()
    }
}

fn compile_solidity(ctx: &AdapterContext<'_>, entries: &[PathBuf]) -> Result<CompilationUnit> {
    let hints_owned = NormalizeHints { include_paths: &[], remappings: &ctx.config.remapping_pairs() };
    let base = base_dir(&ctx.root);

    let entry_strings: Vec<String> =
        entries.iter().map(|p| utils::source_name(p, &base).display().to_string()).collect();

    let sources = collect_closure(&entry_strings, &base, ctx.filenames, &hints_owned)?;
    let file_contents = sources.clone();

    let locator = match &ctx.config.solc {
        Some(path) => Locator::ExplicitPath(path.clone()),
        None => match file_contents.values().find_map(|c| compilers::pragma_version_req(c)) {
            Some(req) => Locator::PragmaImplied(req),
            None => Locator::SystemPath,
        },
    };
    let solc = compilers::resolve_solc(&locator).map_err(CompileError::from)?;

    let mut settings = solc::CompilerSettingsInput {
        remappings: ctx.config.solc_remaps.clone(),
        ..Default::default()
    };
    settings.include_paths = hints_owned.include_paths.to_vec();

    let input = solc::StandardJsonInput::new(sources, &settings);
    let output = solc.compile_standard_json(&input).map_err(CompileError::from)?;

    let errors: Vec<_> = output.errors.iter().filter(|d| d.severity.is_error()).collect();
    if !errors.is_empty() {
        return Err(CompileError::CompilationFailed {
            adapter: "direct".to_string(),
            target: ctx.root.display().to_string(),
            diagnostics: errors.iter().map(|d| d.display().to_string()).collect::<Vec<_>>().join("\n"),
        });
    }

    let descriptor = solc.descriptor(&settings);
    let mut unit = CompilationUnit::new(format!("direct-solc:{}", ctx.root.display()), descriptor);

    for (path, content) in &file_contents {
        let filename = ctx.filenames.intern(path, &base, &hints_owned);
        let ast = output.sources.get(path).and_then(|v| v.get("ast")).cloned().unwrap_or(Value::Null);
        let compiler_id = output.sources.get(path).and_then(|v| v.get("id")).and_then(Value::as_u64).unwrap_or(0) as u32;

        let mut source_unit = SourceUnit::new(filename.clone(), ast);
        let declarations = utils::find_declarations(content);

        if let Some(contracts) = output.contracts.get(path) {
            for (name, entry) in contracts {
                let declared = declarations.iter().find(|d| &d.name == name);
                let kind = declared.map(|d| d.kind).unwrap_or(ContractKind::Contract);
                let mut dependencies = declared.map(|d| d.inherits.clone()).unwrap_or_default();
                for dep in utils::find_construction_deps(content) {
                    if !dependencies.contains(&dep) {
                        dependencies.push(dep);
                    }
                }

                source_unit.contracts.insert(name.clone(), contract_from_standard_json(name, entry, kind, dependencies, compiler_id));
            }
        }

        unit.insert_source_unit(source_unit);
    }

    Ok(unit)
}

fn contract_from_standard_json(
    name: &str,
    entry: &Value,
    kind: ContractKind,
    dependencies: Vec<String>,
    compiler_id: u32,
) -> ContractOutput {
    let abi = entry.get("abi").cloned().unwrap_or(Value::Array(Vec::new()));
    let bytecode_init = entry
        .get("evm")
        .and_then(|e| e.get("bytecode"))
        .and_then(|b| b.get("object"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let bytecode_runtime = entry
        .get("evm")
        .and_then(|e| e.get("deployedBytecode"))
        .and_then(|b| b.get("object"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let srcmap_init = entry
        .get("evm")
        .and_then(|e| e.get("bytecode"))
        .and_then(|b| b.get("sourceMap"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let srcmap_runtime = entry
        .get("evm")
        .and_then(|e| e.get("deployedBytecode"))
        .and_then(|b| b.get("sourceMap"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let libraries_referenced = crate::model::unit::referenced_libraries(&bytecode_init);

    let userdoc = entry.get("userdoc").cloned().unwrap_or(Value::Null);
    let devdoc = entry.get("devdoc").cloned().unwrap_or(Value::Null);

    ContractOutput {
        name: name.to_string(),
        abi,
        bytecode_init,
        bytecode_runtime,
        srcmap_init,
        srcmap_runtime,
        natspec: natspec::fold(&userdoc, &devdoc),
        kind,
        libraries_referenced,
        dependencies,
        compiler_id,
    }
}

/// Resolves and reads the transitive import closure of `entries`, keyed by the exact string
/// each file was referenced with (the entry path, or an import literal) — matching the
/// "used is taken verbatim ... and never transformed" rule (§4.1 rule 6): this is what the
/// compiler itself is handed as source keys.
fn collect_closure(
    entries: &[String],
    root: &Path,
    filenames: &FilenameIndex,
    hints: &NormalizeHints<'_>,
) -> Result<BTreeMap<String, String>> {
    let mut visited_absolute = HashSet::new();
    let mut sources = BTreeMap::new();
    let mut queue: Vec<(String, PathBuf)> = entries.iter().map(|e| (e.clone(), root.to_path_buf())).collect();

    while let Some((raw, importer_dir)) = queue.pop() {
        let filename = filenames.intern(&raw, &importer_dir, hints);
        if !visited_absolute.insert(filename.absolute.clone()) {
            continue;
        }

        let content = std::fs::read_to_string(&filename.absolute)
            .map_err(|e| CompileError::io(e, &filename.absolute))?;

        let parent = filename.absolute.parent().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
        for import in utils::find_import_paths(&content) {
            queue.push((import, parent.clone()));
        }

        sources.insert(raw, content);
    }

    Ok(sources)
}

fn compile_vyper(ctx: &AdapterContext<'_>, entries: &[PathBuf]) -> Result<CompilationUnit> {
    let vyper = compilers::resolve_vyper(None)?;
    let output = vyper.compile(entries, &ctx.config.solc_args).map_err(CompileError::from)?;

    let descriptor = vyper.descriptor();
    let mut unit = CompilationUnit::new(format!("direct-vyper:{}", ctx.root.display()), descriptor);

    let base = base_dir(&ctx.root);
    let hints = NormalizeHints::default();
    let mut by_file: BTreeMap<PathBuf, SourceUnit> = BTreeMap::new();

    for (key, entry) in &output.contracts {
        let Some((path_str, contract_name)) = key.rsplit_once(':') else { continue };
        let filename: Arc<Filename> = ctx.filenames.intern(path_str, &base, &hints);

        let source_unit = by_file
            .entry(filename.absolute.clone())
            .or_insert_with(|| SourceUnit::new(filename.clone(), entry.ast.clone()));

        source_unit.contracts.insert(
            contract_name.to_string(),
            ContractOutput {
                name: contract_name.to_string(),
                abi: entry.abi.clone(),
                bytecode_init: entry.bin.clone(),
                bytecode_runtime: entry.bin_runtime.clone(),
                srcmap_init: entry.srcmap.clone(),
                srcmap_runtime: entry.srcmap_runtime.clone(),
                natspec: Default::default(),
                kind: ContractKind::Contract,
                libraries_referenced: Vec::new(),
                dependencies: Vec::new(),
                compiler_id: 0,
            },
        );
    }

    for source_unit in by_file.into_values() {
        unit.insert_source_unit(source_unit);
    }

    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::filename::FilenameIndex;

    #[test]
    fn detects_plain_sol_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Foo.sol");
        std::fs::write(&file, "contract Foo {}").unwrap();

        assert!(DirectAdapter.detect(&file));
        assert!(DirectAdapter.detect(dir.path()));
        assert!(!DirectAdapter.detect(&dir.path().join("missing.sol")));
    }

    #[test]
    fn closure_follows_imports_relative_to_importer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("interfaces")).unwrap();
        std::fs::write(dir.path().join("interfaces/IThing.sol"), "interface IThing {}").unwrap();
        std::fs::write(
            dir.path().join("Foo.sol"),
            "import \"./interfaces/IThing.sol\";\ncontract Foo is IThing {}",
        )
        .unwrap();

        let filenames = FilenameIndex::new();
        let hints = NormalizeHints::default();
        let sources =
            collect_closure(&["Foo.sol".to_string()], dir.path(), &filenames, &hints).unwrap();

        assert_eq!(sources.len(), 2);
        assert!(sources.contains_key("Foo.sol"));
        assert!(sources.contains_key("./interfaces/IThing.sol"));
    }

    #[test]
    fn missing_target_is_invalid() {
        let ctx = AdapterContext {
            root: PathBuf::from("/nonexistent/Nothing.sol"),
            filenames: &FilenameIndex::new(),
            config: &Config::default(),
        };
        let err = DirectAdapter.compile(&ctx).unwrap_err();
        assert!(matches!(err, CompileError::InvalidTarget(_)));
    }
}
