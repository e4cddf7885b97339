//! One compiler invocation's worth of output.

use crate::filename::Filename;
use crate::linker::{self, LinkCache};
use crate::model::source_unit::SourceUnit;
use crate::CompileError;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Which compiler produced this unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Solidity,
    Vyper,
}

/// The compiler descriptor: which binary, which version, and which settings it was invoked
/// with. Stored verbatim on the unit so re-export can reproduce the invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerDescriptor {
    pub language: Language,
    pub path: PathBuf,
    pub version: Version,
    pub optimizer_enabled: bool,
    pub optimizer_runs: u32,
    pub evm_version: Option<String>,
    pub via_ir: bool,
    pub remappings: Vec<String>,
    pub include_paths: Vec<PathBuf>,
}

/// One invocation of one compiler against one set of sources. CompilationUnits are read-only
/// once a platform adapter finishes populating them — nothing mutates a unit's `source_units`
/// after `compile()` returns control to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub id: String,
    pub compiler: CompilerDescriptor,
    pub source_units: BTreeMap<PathBuf, SourceUnit>,
    #[serde(skip)]
    link_cache: LinkCache,
}

impl CompilationUnit {
    pub fn new(id: impl Into<String>, compiler: CompilerDescriptor) -> Self {
        Self { id: id.into(), compiler, source_units: BTreeMap::new(), link_cache: LinkCache::default() }
    }

    pub fn insert_source_unit(&mut self, unit: SourceUnit) {
        self.source_units.insert(unit.file.absolute.clone(), unit);
    }

    pub fn source_unit(&self, file: &Filename) -> Option<&SourceUnit> {
        self.source_units.get(&file.absolute)
    }

    /// File identities participating in this unit, in the order solc assigned compiler ids.
    pub fn files(&self) -> impl Iterator<Item = &Arc<Filename>> {
        self.source_units.values().map(|su| &su.file)
    }

    /// Collects every contract's creation-bytecode template across this unit, keyed by contract
    /// name, for bulk library linking.
    fn init_templates(&self) -> BTreeMap<String, String> {
        self.source_units
            .values()
            .flat_map(|su| su.contracts.values())
            .map(|c| (c.name.clone(), c.bytecode_init.clone()))
            .collect()
    }

    fn runtime_templates(&self) -> BTreeMap<String, String> {
        self.source_units
            .values()
            .flat_map(|su| su.contracts.values())
            .map(|c| (c.name.clone(), c.bytecode_runtime.clone()))
            .collect()
    }

    /// Links every contract's creation bytecode in this unit against `libraries`, using (and
    /// populating) the unit's own link cache. Does not mutate the stored templates — per the
    /// data-model lifecycle, linking produces a fresh map.
    pub fn link_init_bytecode(
        &mut self,
        libraries: &BTreeMap<String, String>,
        require_fully_linked: bool,
    ) -> Result<BTreeMap<String, String>, CompileError> {
        let templates = self.init_templates();
        self.link_cache.link_all(&templates, libraries, require_fully_linked)
    }

    pub fn link_runtime_bytecode(
        &mut self,
        libraries: &BTreeMap<String, String>,
        require_fully_linked: bool,
    ) -> Result<BTreeMap<String, String>, CompileError> {
        let templates = self.runtime_templates();
        self.link_cache.link_all(&templates, libraries, require_fully_linked)
    }
}

/// Extracts the set of library names a contract's bytecode still references, for callers that
/// want to know what to supply before calling `link_init_bytecode`.
pub fn referenced_libraries(bytecode_template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let bytes = bytecode_template.as_bytes();
    let mut i = 0;
    while i + 40 <= bytes.len() {
        if &bytes[i..i + 2] == b"__" && &bytes[i + 38..i + 40] == b"__" {
            let field = &bytecode_template[i + 2..i + 38];
            let name = field.trim_end_matches('_').to_string();
            if linker::placeholder_token(&name).len() == 40 && !names.contains(&name) {
                names.push(name);
            }
            i += 40;
        } else {
            i += 1;
        }
    }
    names
}
