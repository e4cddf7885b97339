//! Per-file compiled data within a [`crate::model::unit::CompilationUnit`].

use crate::filename::Filename;
use crate::natspec::NatSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// `contract`/`library`/`interface`/`abstract` — mirrors solc's own `contractKind` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    Contract,
    Library,
    Interface,
    Abstract,
}

/// Everything the compiler emitted about one contract definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractOutput {
    pub name: String,
    /// Raw ABI JSON array, kept opaque — downstream consumers that need typed ABI entries
    /// decode it themselves; this crate never interprets argument types.
    pub abi: Value,
    pub bytecode_init: String,
    pub bytecode_runtime: String,
    pub srcmap_init: String,
    pub srcmap_runtime: String,
    pub natspec: NatSpec,
    pub kind: ContractKind,
    /// Library names this contract's bytecode references (may overlap with `dependencies`).
    pub libraries_referenced: Vec<String>,
    /// Names of contracts this one directly depends on (construction, inheritance, or type use).
    /// Not guaranteed to be emitted in a stable order by every platform; sort before comparing,
    /// per the open question on `contractDependencies` ordering.
    pub dependencies: Vec<String>,
    /// The compiler-assigned numeric id referenced from source maps (`s:l:f:j:m`'s `f` field).
    pub compiler_id: u32,
}

impl ContractOutput {
    /// Sorted view of `dependencies`, for comparisons that must be stable across platforms.
    pub fn sorted_dependencies(&self) -> Vec<String> {
        let mut deps = self.dependencies.clone();
        deps.sort();
        deps
    }
}

/// One source file's slice of a compilation unit: its identity, its AST, and the contracts it
/// defines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUnit {
    pub file: Arc<Filename>,
    /// Opaque parsed AST as the compiler emitted it (standard-JSON `ast` / combined-JSON `ast`).
    /// This crate never walks or reinterprets it.
    pub ast: Value,
    pub contracts: BTreeMap<String, ContractOutput>,
}

impl SourceUnit {
    pub fn new(file: Arc<Filename>, ast: Value) -> Self {
        Self { file, ast, contracts: BTreeMap::new() }
    }
}
