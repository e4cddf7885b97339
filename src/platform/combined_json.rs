//! Shared parsing for adapters that drive `solc --combined-json` directly rather than reading a
//! framework's own per-contract artifact directory. Component design §4.5: "combined-JSON is a
//! secondary invocation builder used by platform adapters that historically wrap it (Dapp, legacy
//! frameworks)". `Dapp` and the `Embark`/`Etherlime`/`Buidler` legacy adapters share this path.

use crate::compilers::{self, solc, Locator};
use crate::error::{CompileError, Result};
use crate::filename::{FilenameIndex, NormalizeHints};
use crate::model::source_unit::{ContractKind, ContractOutput, SourceUnit};
use crate::model::unit::CompilationUnit;
use crate::natspec;
use crate::utils;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resolves a solc binary (explicit override, else pragma-implied, else `PATH`), runs
/// `--combined-json` over `entries` and folds the result into one [`CompilationUnit`].
pub fn compile(
    root: &Path,
    adapter: &str,
    entries: &[PathBuf],
    remappings: &[String],
    explicit_solc: Option<&Path>,
    filenames: &FilenameIndex,
) -> Result<CompilationUnit> {
    let locator = match explicit_solc {
        Some(path) => Locator::ExplicitPath(path.to_path_buf()),
        None => {
            let pragma = entries
                .iter()
                .find_map(|p| std::fs::read_to_string(p).ok().and_then(|c| compilers::pragma_version_req(&c)));
            match pragma {
                Some(req) => Locator::PragmaImplied(req),
                None => Locator::SystemPath,
            }
        }
    };
    let solc = compilers::resolve_solc(&locator).map_err(CompileError::from)?;

    let settings = solc::CompilerSettingsInput {
        optimizer_enabled: true,
        optimizer_runs: 200,
        remappings: remappings.to_vec(),
        ..Default::default()
    };

    let document =
        solc.compile_combined_json(entries, &[], remappings).map_err(CompileError::from)?;

    let descriptor = solc.descriptor(&settings);
    let mut unit = CompilationUnit::new(format!("{adapter}:{}", root.display()), descriptor);

    let Some(contracts) = document.get("contracts").and_then(Value::as_object) else {
        return Ok(unit);
    };
    let sources_meta = document.get("sources").and_then(Value::as_object);
    let hints = NormalizeHints::default();

    let mut pending: BTreeMap<PathBuf, SourceUnit> = BTreeMap::new();
    for (key, entry) in contracts {
        let Some((path_str, name)) = key.rsplit_once(':') else { continue };
        let filename = filenames.intern(path_str, root, &hints);

        let source_meta = sources_meta.and_then(|m| m.get(path_str));
        let ast = source_meta.and_then(|s| s.get("AST")).cloned().unwrap_or(Value::Null);
        let compiler_id =
            source_meta.and_then(|s| s.get("id")).and_then(Value::as_u64).unwrap_or(0) as u32;

        let source_unit = pending
            .entry(filename.absolute.clone())
            .or_insert_with(|| SourceUnit::new(filename.clone(), ast));

        let content = std::fs::read_to_string(&filename.absolute).unwrap_or_default();
        let declarations = utils::find_declarations(&content);
        let declared = declarations.iter().find(|d| d.name == name);
        let kind = declared.map(|d| d.kind).unwrap_or(ContractKind::Contract);
        let mut dependencies = declared.map(|d| d.inherits.clone()).unwrap_or_default();
        for dep in utils::find_construction_deps(&content) {
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }

        let bytecode_init = string_field(entry, "bin");
        let libraries_referenced = crate::model::unit::referenced_libraries(&bytecode_init);

        source_unit.contracts.insert(
            name.to_string(),
            ContractOutput {
                name: name.to_string(),
                abi: json_field(entry, "abi").unwrap_or(Value::Array(Vec::new())),
                bytecode_init,
                bytecode_runtime: string_field(entry, "bin-runtime"),
                srcmap_init: string_field(entry, "srcmap"),
                srcmap_runtime: string_field(entry, "srcmap-runtime"),
                natspec: natspec::fold(
                    &json_field(entry, "userdoc").unwrap_or(Value::Null),
                    &json_field(entry, "devdoc").unwrap_or(Value::Null),
                ),
                kind,
                libraries_referenced,
                dependencies,
                compiler_id,
            },
        );
    }

    for source_unit in pending.into_values() {
        unit.insert_source_unit(source_unit);
    }

    Ok(unit)
}

fn string_field(entry: &Value, key: &str) -> String {
    entry.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// `combined-json` renders `abi`/`userdoc`/`devdoc` as JSON-encoded strings on some solc
/// versions and as already-parsed objects on others; this accepts either.
fn json_field(entry: &Value, key: &str) -> Option<Value> {
    match entry.get(key)? {
        Value::String(s) => serde_json::from_str(s).ok(),
        other => Some(other.clone()),
    }
}
