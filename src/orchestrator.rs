//! The top-level façade (component design §4.8): normalizes a target, resolves a platform,
//! invokes it, assembles the canonical model, and exports on request.
//!
//! Mirrors how `foundry-compilers`' `Project` ties `ProjectPathsConfig`, the compiler driver and
//! cache together behind one `compile()` entry point — except here the "project" is rebuilt fresh
//! every call rather than cached across invocations, since there is no long-lived build daemon in
//! scope.

use crate::config::Config;
use crate::error::{CompileError, Result};
use crate::filename::FilenameIndex;
use crate::metadata;
use crate::model::project::Project;
use crate::model::unit::CompilationUnit;
use crate::platform::{self, AdapterContext};
use crate::verify;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Frameworks whose monorepo fan-out (§4.8: "a parent directory containing multiple framework
/// roots") is worth scanning for. Every other adapter is assumed single-root.
const MONOREPO_ADAPTERS: &[&str] = &["foundry", "hardhat-v2", "hardhat-v3"];

/// Directory names never descended into while looking for nested framework roots.
const SKIP_DIRS: &[&str] = &["node_modules", "lib", "dependencies", ".git", "out", "cache", "artifacts", "build"];

/// Runs one full compile/export call for `target` against `config` (§4.8, steps 1-5).
#[tracing::instrument(skip(config), fields(target))]
pub fn compile(target: &str, config: &Config) -> Result<Project> {
    if platform::looks_like_address(target) {
        return compile_address(target, config);
    }

    let root = PathBuf::from(target);
    let working_dir = working_dir_for(&root);
    let filenames = FilenameIndex::new();

    let primary = platform::detect(&root, config)?;
    let platform_name = primary.name().to_string();

    let mut project = Project::new(working_dir.clone(), target.to_string(), platform_name.clone());

    let extra_roots = if config.compile_force_framework.is_none() {
        discover_monorepo_roots(&root, &platform_name, config)
    } else {
        Vec::new()
    };

    for unit in run_adapter(primary.as_ref(), &root, &filenames, config)? {
        project.insert_unit(unit);
    }

    for units in compile_roots_parallel(&extra_roots, &filenames, config)? {
        for unit in units {
            merge_unit(&mut project, unit)?;
        }
    }

    project.filenames = filenames;
    post_process(&mut project);

    if !config.export_formats.is_empty() {
        project.export.formats = config.export_formats.clone();
        project.export.export_dir = config.export_dir.clone();
        crate::export::export(&project, &project.working_dir)?;
    }

    Ok(project)
}

/// Step 1 for an address-shaped target: route straight to the verification fetcher, which
/// materializes sources and re-enters platform detection itself (§2's control-flow note:
/// "Verification fetcher, which then re-enters resolution").
fn compile_address(target: &str, config: &Config) -> Result<Project> {
    let filenames = FilenameIndex::new();
    let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let export_root = working_dir.join(&config.export_dir);

    let units = verify::fetch_and_dispatch(target, &export_root, config, &filenames)?;

    let mut project = Project::new(working_dir.clone(), target.to_string(), "verify".to_string());
    for unit in units {
        project.insert_unit(unit);
    }
    project.filenames = filenames;
    post_process(&mut project);

    if !config.export_formats.is_empty() {
        project.export.formats = config.export_formats.clone();
        project.export.export_dir = config.export_dir.clone();
        crate::export::export(&project, &project.working_dir)?;
    }

    Ok(project)
}

/// Compiles each of `roots` independently, per §5's concurrency model ("Compilation of
/// independent CompilationUnits within one project MAY be run in parallel ... worker pool sized
/// to the available cores"): sub-roots share no mutable state of their own (each owns its own
/// compiler subprocess) and only meet at `filenames`, which is already `RwLock`-guarded for
/// exactly this. Sequential when there's nothing to parallelize (zero or one sub-root), so the
/// common single-root case never pays for a thread pool it doesn't need.
fn compile_roots_parallel(
    roots: &[PathBuf],
    filenames: &FilenameIndex,
    config: &Config,
) -> Result<Vec<Vec<CompilationUnit>>> {
    if roots.len() <= 1 {
        return roots
            .iter()
            .map(|root| {
                let adapter = platform::detect(root, config)?;
                run_adapter(adapter.as_ref(), root, filenames, config)
            })
            .collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get().max(1).min(roots.len()))
        .build()
        .map_err(|err| CompileError::msg(err.to_string()))?;

    pool.install(|| {
        roots
            .par_iter()
            .map(|root| {
                let adapter = platform::detect(root, config)?;
                run_adapter(adapter.as_ref(), root, filenames, config)
            })
            .collect()
    })
}

fn run_adapter(
    adapter: &dyn platform::Adapter,
    root: &Path,
    filenames: &FilenameIndex,
    config: &Config,
) -> Result<Vec<CompilationUnit>> {
    let ctx = AdapterContext { root: root.to_path_buf(), filenames, config };
    match adapter.compile(&ctx) {
        Ok(units) => Ok(units),
        Err(err) if config.retry_clean_on_failure => {
            tracing::warn!(adapter = adapter.name(), error = %err, "compile failed, retrying after clean");
            adapter.clean(root)?;
            adapter.compile(&ctx)
        }
        Err(err) => Err(err),
    }
}

/// The directory a caller's relative paths (imports, export dir) are resolved against: the
/// target itself if it's a directory, its parent if it's a file (mirrors `platform::direct`'s
/// own `base_dir` rule for single-file targets).
fn working_dir_for(root: &Path) -> PathBuf {
    if root.is_dir() {
        root.to_path_buf()
    } else {
        root.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))
    }
}

/// §4.8 monorepo handling: scans `root`'s immediate children for further directories the same
/// adapter (by name) recognizes, skipping vendor/build directories. Only consulted for
/// Hardhat/Foundry, per spec; other frameworks are assumed single-root.
fn discover_monorepo_roots(root: &Path, primary_adapter: &str, config: &Config) -> Vec<PathBuf> {
    if !MONOREPO_ADAPTERS.contains(&primary_adapter) {
        return Vec::new();
    }

    let Ok(entries) = std::fs::read_dir(root) else { return Vec::new() };
    let mut roots = Vec::new();
    for entry in entries.filter_map(std::result::Result::ok) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if SKIP_DIRS.contains(&name) {
            continue;
        }
        if let Ok(adapter) = platform::detect(&path, config) {
            if adapter.name() == primary_adapter {
                roots.push(path);
            }
        }
    }
    roots
}

/// Folds a sub-root's units into `project`, surfacing `contract_ambiguous` per §4.8's merge rule
/// rather than silently overwriting (the overwrite itself is handled inside `Project::merge`,
/// which only returns an error on conflicting ABIs).
fn merge_unit(project: &mut Project, unit: CompilationUnit) -> Result<()> {
    let mut incoming = Project::new(project.working_dir.clone(), project.target.clone(), project.platform.clone());
    incoming.insert_unit(unit);
    project.merge(incoming)
}

/// §4.8 step 4. NatSpec folding already happens inline inside every adapter (`artifact_layout`,
/// `combined_json`, `direct` all call [`crate::natspec::fold`] while parsing); nothing left to do
/// for it here. Metadata decoding and the dependency graph are genuinely cross-cutting, so they
/// are exposed as on-demand accessors below rather than eagerly computed and stored on every
/// `ContractOutput` — the canonical model keeps `bytecode_runtime` exactly as the compiler emitted
/// it (invariant 5: "B == bytecode_without_metadata(B) ++ metadata_trailer(B) ++ length_bytes(B)"),
/// so decoding a copy on every compile would just be wasted work for callers who never ask.
fn post_process(project: &mut Project) {
    for unit in project.units.values() {
        for source_unit in unit.source_units.values() {
            for contract in source_unit.contracts.values() {
                debug_assert!(
                    contract.abi.is_null() || contract.abi.is_array(),
                    "ABI must be a JSON array or absent"
                );
            }
        }
    }
}

/// Decodes the metadata trailer of a single contract's deployed bytecode, by name, across the
/// whole project. Returns `None` if no contract with that name was compiled.
pub fn contract_metadata(project: &Project, contract_name: &str) -> Option<metadata::Metadata> {
    project
        .units
        .values()
        .flat_map(|unit| unit.source_units.values())
        .find_map(|su| su.contracts.get(contract_name))
        .map(|contract| {
            let bytes = hex::decode(contract.bytecode_runtime.trim_start_matches("0x")).unwrap_or_default();
            metadata::split(&bytes).metadata
        })
}

/// The cross-file contract dependency graph for one unit (§4.8: "build the cross-file dependency
/// graph of contracts, used for topological library-link order"), keyed by contract name with
/// sorted dependency lists (open question (a): dependency order is not stable across platforms).
pub fn dependency_graph(unit: &CompilationUnit) -> BTreeMap<String, Vec<String>> {
    unit.source_units
        .values()
        .flat_map(|su| su.contracts.values())
        .map(|c| (c.name.clone(), c.sorted_dependencies()))
        .collect()
}

/// Topologically orders `graph`'s contracts so that every dependency is linked before its
/// dependents — the order a caller should supply library addresses in in stages, per §4.4's
/// "caller may link in stages". Cyclic graphs (e.g. mutually-recursive interfaces) are broken
/// arbitrarily in name order rather than treated as fatal, since the library linker only cares
/// about addresses, not a strict DAG.
pub fn topological_link_order(graph: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    let mut visited: BTreeMap<String, bool> = BTreeMap::new();
    let mut order = Vec::new();

    fn visit(
        name: &str,
        graph: &BTreeMap<String, Vec<String>>,
        visited: &mut BTreeMap<String, bool>,
        order: &mut Vec<String>,
    ) {
        match visited.get(name) {
            Some(true) => return,
            Some(false) => return, // cycle: already in progress, don't recurse further
            None => {}
        }
        visited.insert(name.to_string(), false);
        if let Some(deps) = graph.get(name) {
            for dep in deps {
                visit(dep, graph, visited, order);
            }
        }
        visited.insert(name.to_string(), true);
        order.push(name.to_string());
    }

    for name in graph.keys() {
        visit(name, graph, &mut visited, &mut order);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topological_order_places_dependencies_first() {
        let mut graph = BTreeMap::new();
        graph.insert("ComplexMath".to_string(), vec!["AdvancedMath".to_string()]);
        graph.insert("AdvancedMath".to_string(), vec!["MathLib".to_string()]);
        graph.insert("MathLib".to_string(), Vec::new());

        let order = topological_link_order(&graph);
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("MathLib") < pos("AdvancedMath"));
        assert!(pos("AdvancedMath") < pos("ComplexMath"));
    }

    #[test]
    fn topological_order_tolerates_cycles() {
        let mut graph = BTreeMap::new();
        graph.insert("A".to_string(), vec!["B".to_string()]);
        graph.insert("B".to_string(), vec!["A".to_string()]);

        let order = topological_link_order(&graph);
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn working_dir_for_file_target_is_its_parent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Foo.sol");
        std::fs::write(&file, "contract Foo {}").unwrap();
        assert_eq!(working_dir_for(&file), dir.path());
    }

    #[test]
    fn working_dir_for_directory_target_is_itself() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(working_dir_for(dir.path()), dir.path());
    }
}
