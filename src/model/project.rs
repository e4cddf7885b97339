//! The root of the canonical model: one compile/export call's worth of state.

use crate::error::CompileError;
use crate::filename::FilenameIndex;
use crate::model::unit::CompilationUnit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Export format requested of the orchestrator, if any. See `export.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Standard,
    Solc,
    Truffle,
    Archive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    pub formats: Vec<ExportFormat>,
    pub export_dir: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self { formats: vec![ExportFormat::Standard], export_dir: PathBuf::from("crytic-export") }
    }
}

/// Root of the canonical model. Owns the working directory, the target as given, the platform
/// that was selected, every CompilationUnit produced for it (keyed by a stable id — a content
/// hash or a synthetic adapter-assigned name) and the project-wide file identity index.
#[derive(Debug, Serialize, Deserialize)]
pub struct Project {
    pub working_dir: PathBuf,
    pub target: String,
    pub platform: String,
    pub units: BTreeMap<String, CompilationUnit>,
    #[serde(skip)]
    pub filenames: FilenameIndex,
    pub export: ExportSettings,
}

impl Project {
    pub fn new(working_dir: PathBuf, target: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            working_dir,
            target: target.into(),
            platform: platform.into(),
            units: BTreeMap::new(),
            filenames: FilenameIndex::new(),
            export: ExportSettings::default(),
        }
    }

    /// Installs a CompilationUnit, merging it into an existing unit with the same id if one is
    /// already present — this is how monorepo sub-root results fold into one project.
    pub fn insert_unit(&mut self, unit: CompilationUnit) {
        self.units.insert(unit.id.clone(), unit);
    }

    /// Merges `other`'s units into `self`. Collisions on `Filename.absolute` across sub-roots are
    /// expected and simply overwrite (same file, same content, already deduplicated by the
    /// shared identity index); collisions on `(file, contract-name)` with differing ABI are
    /// `contract_ambiguous`, per the orchestrator's monorepo-merge rule.
    pub fn merge(&mut self, other: Project) -> Result<(), CompileError> {
        for (id, incoming) in other.units {
            match self.units.get(&id) {
                Some(existing) => {
                    detect_ambiguous_contracts(existing, &incoming)?;
                    self.units.insert(id, incoming);
                }
                None => {
                    self.units.insert(id, incoming);
                }
            }
        }
        Ok(())
    }

    pub fn contract_count(&self) -> usize {
        self.units.values().flat_map(|u| u.source_units.values()).map(|su| su.contracts.len()).sum()
    }
}

fn detect_ambiguous_contracts(existing: &CompilationUnit, incoming: &CompilationUnit) -> Result<(), CompileError> {
    for (path, existing_su) in &existing.source_units {
        let Some(incoming_su) = incoming.source_units.get(path) else { continue };
        for (name, existing_contract) in &existing_su.contracts {
            let Some(incoming_contract) = incoming_su.contracts.get(name) else { continue };
            if existing_contract.abi != incoming_contract.abi {
                return Err(CompileError::ContractAmbiguous {
                    contract: name.clone(),
                    detail: format!("conflicting ABI at {}", path.display()),
                });
            }
        }
    }
    Ok(())
}
