//! End-to-end orchestrator scenarios (component design §8) against synthetic fixtures rather
//! than real framework installs: every case sets `skip_build` so the adapter reads artifacts
//! already on disk instead of shelling out to `forge`/`npx`/`vyper`, which keeps these tests
//! hermetic and independent of what's installed on the machine running them.

use pretty_assertions::assert_eq;
use std::path::Path;
use unicompile::config::Config;
use unicompile::model::project::{ExportFormat, Project};

fn write_foundry_artifact(root: &Path, source_file: &str, contract: &str) {
    let dir = root.join("out").join(format!("{source_file}"));
    std::fs::create_dir_all(&dir).unwrap();
    let artifact = serde_json::json!({
        "contractName": contract,
        "sourceName": format!("src/{source_file}"),
        "abi": [{"type": "function", "name": "totalSupply", "inputs": [], "outputs": []}],
        "bytecode": {"object": "0x6080604052"},
        "deployedBytecode": {"object": "0x6080604052"},
        "metadata": serde_json::to_string(&serde_json::json!({
            "compiler": {"version": "0.8.19+commit.7dd6d404"}
        })).unwrap(),
    });
    std::fs::write(dir.join(format!("{contract}.json")), serde_json::to_vec_pretty(&artifact).unwrap()).unwrap();
}

fn write_hardhat_artifact(root: &Path, source_file: &str, contract: &str) {
    let dir = root.join("artifacts").join("contracts").join(source_file);
    std::fs::create_dir_all(&dir).unwrap();
    let artifact = serde_json::json!({
        "contractName": contract,
        "sourceName": format!("contracts/{source_file}"),
        "abi": [],
        "bytecode": "0x6080604052",
        "deployedBytecode": "0x6080604052",
    });
    std::fs::write(dir.join(format!("{contract}.json")), serde_json::to_vec_pretty(&artifact).unwrap()).unwrap();
}

/// S1 (roughly): a bare Foundry project, artifacts already built, compiled through the full
/// orchestrator entry point.
#[test]
fn compiles_a_foundry_project_from_prebuilt_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("foundry.toml"), "[profile.default]\n").unwrap();
    write_foundry_artifact(dir.path(), "Token.sol", "Token");

    let config = Config::builder().skip_build(true).export_formats(Vec::new()).build();
    let project = unicompile::compile(dir.path().to_str().unwrap(), &config).unwrap();

    assert_eq!(project.platform, "foundry");
    assert_eq!(project.contract_count(), 1);
    let unit = project.units.values().next().unwrap();
    let source_unit = unit.source_units.values().next().unwrap();
    assert!(source_unit.contracts.contains_key("Token"));
}

/// S2 (roughly): a Hardhat project, same shape, different artifact layout.
#[test]
fn compiles_a_hardhat_project_from_prebuilt_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hardhat.config.js"), "module.exports = {};\n").unwrap();
    write_hardhat_artifact(dir.path(), "Vault.sol", "Vault");

    let config = Config::builder().skip_build(true).export_formats(Vec::new()).build();
    let project = unicompile::compile(dir.path().to_str().unwrap(), &config).unwrap();

    assert_eq!(project.platform, "hardhat-v2");
    assert_eq!(project.contract_count(), 1);
}

/// S3 (roughly): a monorepo root whose own artifacts are empty but whose immediate
/// sub-directories are each independent Foundry roots — the orchestrator must discover both,
/// compile them (via the parallel sub-root path, since there's more than one), and merge the
/// results into one project.
#[test]
fn merges_monorepo_foundry_sub_roots() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("foundry.toml"), "[profile.default]\n").unwrap();

    // `discover_monorepo_roots` only scans one level deep, so the sub-projects must be direct
    // children of `root`, not nested under an intermediate `packages/` directory.
    let package_a = root.path().join("token");
    std::fs::create_dir_all(&package_a).unwrap();
    std::fs::write(package_a.join("foundry.toml"), "[profile.default]\n").unwrap();
    write_foundry_artifact(&package_a, "Token.sol", "Token");

    let package_b = root.path().join("vault");
    std::fs::create_dir_all(&package_b).unwrap();
    std::fs::write(package_b.join("foundry.toml"), "[profile.default]\n").unwrap();
    write_foundry_artifact(&package_b, "Vault.sol", "Vault");

    let config = Config::builder().skip_build(true).export_formats(Vec::new()).build();
    let project = unicompile::compile(root.path().to_str().unwrap(), &config).unwrap();

    // root's own "out" is empty, plus two sub-roots: three units total, one contract each in
    // the sub-roots (root's unit has none).
    assert_eq!(project.units.len(), 3);
    assert_eq!(project.contract_count(), 2);
}

/// A target with `--compile-force-framework` set to an adapter that doesn't recognize the
/// directory is a fatal `NoPlatformDetected`, not a silent fall-through to another adapter.
#[test]
fn forced_framework_mismatch_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Foo.sol"), "contract Foo {}").unwrap();

    let config = Config::builder().force_framework("foundry").skip_build(true).build();
    let err = unicompile::compile(dir.path().to_str().unwrap(), &config).unwrap_err();
    assert!(matches!(err, unicompile::error::CompileError::NoPlatformDetected { .. }));
}

/// Exporting the `standard` format writes `contracts.json` under the configured export
/// directory, keyed by the contract name, with forward-slash source paths regardless of host OS.
#[test]
fn exports_standard_format_after_compiling() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("foundry.toml"), "[profile.default]\n").unwrap();
    write_foundry_artifact(dir.path(), "Token.sol", "Token");

    let config = Config::builder()
        .skip_build(true)
        .export_formats(vec![ExportFormat::Standard])
        .export_dir("crytic-export")
        .build();
    let project = unicompile::compile(dir.path().to_str().unwrap(), &config).unwrap();

    let exported = dir.path().join("crytic-export").join("contracts.json");
    assert!(exported.is_file());
    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&exported).unwrap()).unwrap();
    let unit_id = project.units.keys().next().unwrap();
    assert!(document["compilation_units"][unit_id]["source_units"].is_object());
}

/// S5: compiling, exporting as `archive`, then re-importing the archive file reproduces the
/// same compiler descriptor, source units and per-contract ABI/bytecode (property 4: "re-export
/// then re-import yields a model equal on `(compiler, source_units, contracts, abi,
/// bytecodes, srcmaps)`"). Deserializing the archive through `serde_path_to_error` rather than
/// plain `serde_json` means a future schema drift between `export_archive`/`import_archive`
/// fails with a field path instead of a bare "invalid type" message.
#[test]
fn archive_round_trip_preserves_compiler_and_contract_data() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("foundry.toml"), "[profile.default]\n").unwrap();
    write_foundry_artifact(dir.path(), "Token.sol", "Token");

    let config = Config::builder()
        .skip_build(true)
        .export_formats(vec![ExportFormat::Archive])
        .export_dir("crytic-export")
        .build();
    let original = unicompile::compile(dir.path().to_str().unwrap(), &config).unwrap();

    let archive_path = std::fs::read_dir(dir.path().join("crytic-export"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .expect("archive file written");

    let raw = std::fs::read_to_string(&archive_path).unwrap();
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    let reimported: Project =
        serde_path_to_error::deserialize(&mut deserializer).expect("archive deserializes cleanly");

    let original_unit = original.units.values().next().unwrap();
    let reimported_unit = reimported.units.values().next().unwrap();
    assert_eq!(original_unit.compiler.version, reimported_unit.compiler.version);
    assert_eq!(original_unit.source_units.len(), reimported_unit.source_units.len());

    let original_contract = original_unit.source_units.values().next().unwrap().contracts.get("Token").unwrap();
    let reimported_contract = reimported_unit.source_units.values().next().unwrap().contracts.get("Token").unwrap();
    assert_eq!(original_contract.abi, reimported_contract.abi);
    assert_eq!(original_contract.bytecode_init, reimported_contract.bytecode_init);
    assert_eq!(original_contract.bytecode_runtime, reimported_contract.bytecode_runtime);
    assert_eq!(original_contract.srcmap_init, reimported_contract.srcmap_init);
    assert_eq!(original_contract.srcmap_runtime, reimported_contract.srcmap_runtime);
}
