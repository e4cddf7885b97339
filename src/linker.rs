//! Resolves named library placeholders in a bytecode template to concrete addresses.

use crate::error::{CompileError, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Total length of a placeholder token: `__` + 36-char name field + `__`.
const TOKEN_LEN: usize = 40;
const NAME_FIELD_LEN: usize = 36;

/// Computes the `__<name, truncated/padded to 36 chars with `_`>__` placeholder token for a
/// library name. Deterministic and total: any name produces exactly a 40-character token.
pub fn placeholder_token(library_name: &str) -> String {
    let mut field: String = library_name.chars().take(NAME_FIELD_LEN).collect();
    while field.chars().count() < NAME_FIELD_LEN {
        field.push('_');
    }
    format!("__{field}__")
}

/// A stable fingerprint of a library-address map, used to key the per-unit link-result cache.
/// Two maps with the same entries (regardless of insertion order) produce the same fingerprint.
pub fn fingerprint(libraries: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (name, address) in libraries {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(address.to_lowercase().as_bytes());
        hasher.update(b";");
    }
    hex::encode(hasher.finalize())
}

/// Substitutes every placeholder token found in `template` with its address from `libraries`
/// (lower-case hex, no `0x` prefix). Partial linking is allowed: a library with no entry in
/// `libraries` simply leaves its placeholder in place. `require_fully_linked` controls whether a
/// leftover placeholder is an error — per the error-handling design, `unresolved_library` is only
/// raised when the caller explicitly asked for a fully linked result.
pub fn link(
    template: &str,
    libraries: &BTreeMap<String, String>,
    require_fully_linked: bool,
) -> Result<String> {
    let mut out = template.to_string();
    for (name, address) in libraries {
        let token = placeholder_token(name);
        let address = normalize_address(address);
        out = out.replace(&token, &address);
    }

    if require_fully_linked {
        if let Some(name) = first_unresolved(&out) {
            return Err(CompileError::UnresolvedLibrary(name));
        }
    }

    Ok(out)
}

fn normalize_address(address: &str) -> String {
    address.trim_start_matches("0x").trim_start_matches("0X").to_lowercase()
}

/// Scans `bytecode` for a remaining `__..__` placeholder and, if found, recovers the library
/// name by stripping the `_` padding back off the 36-char field.
fn first_unresolved(bytecode: &str) -> Option<String> {
    let bytes = bytecode.as_bytes();
    let mut i = 0;
    while i + TOKEN_LEN <= bytes.len() {
        if &bytes[i..i + 2] == b"__" && &bytes[i + TOKEN_LEN - 2..i + TOKEN_LEN] == b"__" {
            let field = &bytecode[i + 2..i + TOKEN_LEN - 2];
            return Some(field.trim_end_matches('_').to_string());
        }
        i += 1;
    }
    None
}

/// Per-[`crate::model::unit::CompilationUnit`] cache of previously linked bytecode, keyed by
/// [`fingerprint`] of the library map used. Unshared across units, per the concurrency model —
/// each unit owns its own cache, no lock needed.
#[derive(Debug, Default)]
pub struct LinkCache {
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl LinkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links every contract's template in `templates` (contract name to template) against
    /// `libraries`, reusing a cached result for this exact fingerprint if present. Idempotent:
    /// calling this twice with the same `libraries` returns byte-identical output, and linking
    /// with a superset of addresses never changes sites already resolved by the subset.
    pub fn link_all(
        &mut self,
        templates: &BTreeMap<String, String>,
        libraries: &BTreeMap<String, String>,
        require_fully_linked: bool,
    ) -> Result<BTreeMap<String, String>> {
        let key = fingerprint(libraries);
        if let Some(cached) = self.entries.get(&key) {
            return Ok(cached.clone());
        }

        let mut linked = BTreeMap::new();
        for (contract, template) in templates {
            linked.insert(contract.clone(), link(template, libraries, require_fully_linked)?);
        }
        self.entries.insert(key, linked.clone());
        Ok(linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_exactly_forty_chars() {
        let token = placeholder_token("MathLib");
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.starts_with("__") && token.ends_with("__"));
    }

    #[test]
    fn partial_linking_leaves_other_placeholders_untouched() {
        let template = format!("600a{}600b{}", placeholder_token("MathLib"), placeholder_token("AdvancedMath"));
        let mut libs = BTreeMap::new();
        libs.insert("MathLib".to_string(), "11".repeat(20));

        let linked = link(&template, &libs, false).unwrap();
        assert!(linked.contains(&"11".repeat(20)));
        assert!(linked.contains(&placeholder_token("AdvancedMath")));
    }

    #[test]
    fn require_fully_linked_reports_unresolved() {
        let template = placeholder_token("AdvancedMath");
        let err = link(&template, &BTreeMap::new(), true).unwrap_err();
        assert!(matches!(err, CompileError::UnresolvedLibrary(name) if name == "AdvancedMath"));
    }

    #[test]
    fn linking_is_idempotent_and_monotonic() {
        let template = format!("{}{}", placeholder_token("MathLib"), placeholder_token("AdvancedMath"));
        let mut partial = BTreeMap::new();
        partial.insert("MathLib".to_string(), "aa".repeat(20));
        let once = link(&template, &partial, false).unwrap();
        let twice = link(&once, &partial, false).unwrap();
        assert_eq!(once, twice);

        let mut superset = partial.clone();
        superset.insert("AdvancedMath".to_string(), "bb".repeat(20));
        let fully = link(&template, &superset, true).unwrap();
        assert!(fully.starts_with(&"aa".repeat(20)));
    }

    #[test]
    fn cache_reuses_fingerprint() {
        let mut cache = LinkCache::new();
        let mut templates = BTreeMap::new();
        templates.insert("ComplexMath".to_string(), placeholder_token("MathLib"));
        let mut libs = BTreeMap::new();
        libs.insert("MathLib".to_string(), "cc".repeat(20));

        let first = cache.link_all(&templates, &libs, false).unwrap();
        let second = cache.link_all(&templates, &libs, false).unwrap();
        assert_eq!(first, second);
    }
}
