//! Small filesystem, hashing and solidity-source scanning helpers shared by every module.

use crate::error::{CompileError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Matches `import "./Foo.sol";`, `import {A, B} from "./Foo.sol";` and single-quote variants.
///
/// Adapted from the hardhat-core import scanner. The AST is treated as opaque here, so this
/// textual scan is all the dependency graph needs (no full grammar required).
pub static RE_SOL_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"import\s+(?:(?:"(?P<p1>.*)"|'(?P<p2>.*)')(?:\s+as\s+\w+)?|(?:(?:\w+(?:\s+as\s+\w+)?|\*\s+as\s+\w+|\{\s*(?:\w+(?:\s+as\s+\w+)?(?:\s*,\s*)?)+\s*\})\s+from\s+(?:"(?P<p3>.*)"|'(?P<p4>.*)')))\s*;"#,
    )
    .unwrap()
});

/// Matches `pragma solidity ^0.8.10;`, capturing `^0.8.10`.
pub static RE_SOL_PRAGMA_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"pragma\s+solidity\s+(?P<version>.+?);").unwrap());

/// Matches a top-level type declaration, capturing its kind (`contract`/`library`/`interface`/
/// `abstract contract`) and name. Used by the direct adapter to recover `ContractKind` and
/// inheritance lists from source text without a full grammar, since the AST is treated as opaque.
pub static RE_SOL_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<kind>abstract\s+contract|contract|library|interface)\s+(?P<name>\w+)(?P<inherits>\s+is\s+[^{]+)?\s*\{",
    )
    .unwrap()
});

/// Matches `new Foo(` / `new Foo[](` construction expressions, capturing `Foo`.
pub static RE_SOL_NEW_EXPR: Lazy<Regex> = Lazy::new(|| Regex::new(r"new\s+(?P<name>\w+)\s*[\(\[]").unwrap());

/// One declaration recovered by [`RE_SOL_DECLARATION`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredContract {
    pub kind: crate::model::source_unit::ContractKind,
    pub name: String,
    pub inherits: Vec<String>,
}

/// Scans `src` for top-level contract/library/interface declarations, in source order.
pub fn find_declarations(src: &str) -> Vec<DeclaredContract> {
    RE_SOL_DECLARATION
        .captures_iter(src)
        .map(|cap| {
            let kind = match cap.name("kind").map(|m| m.as_str()) {
                Some(k) if k.starts_with("abstract") => crate::model::source_unit::ContractKind::Abstract,
                Some("library") => crate::model::source_unit::ContractKind::Library,
                Some("interface") => crate::model::source_unit::ContractKind::Interface,
                _ => crate::model::source_unit::ContractKind::Contract,
            };
            let name = cap.name("name").map(|m| m.as_str().to_string()).unwrap_or_default();
            let inherits = cap
                .name("inherits")
                .map(|m| {
                    m.as_str()
                        .trim_start_matches(|c: char| c.is_whitespace())
                        .trim_start_matches("is")
                        .split(',')
                        .map(|s| s.trim().split_whitespace().next().unwrap_or("").to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            DeclaredContract { kind, name, inherits }
        })
        .collect()
}

/// Names referenced via `new Foo(...)` construction expressions, in source order, deduplicated.
pub fn find_construction_deps(src: &str) -> Vec<String> {
    let mut names = Vec::new();
    for cap in RE_SOL_NEW_EXPR.captures_iter(src) {
        if let Some(name) = cap.name("name") {
            let name = name.as_str().to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// Returns every import path string literal found in `src`, in source order.
pub fn find_import_paths(src: &str) -> Vec<String> {
    RE_SOL_IMPORT
        .captures_iter(src)
        .filter_map(|cap| {
            cap.name("p1").or_else(|| cap.name("p2")).or_else(|| cap.name("p3")).or_else(|| cap.name("p4"))
        })
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Returns the raw version requirement string from the first `pragma solidity` directive, if any.
pub fn find_version_pragma(src: &str) -> Option<String> {
    RE_SOL_PRAGMA_VERSION.captures(src)?.name("version").map(|m| m.as_str().to_string())
}

/// keccak256 content hash, hex-encoded, used by the cache to detect dirty sources and by the
/// verification fetcher's idempotence check.
pub fn content_hash(content: &str) -> String {
    use tiny_keccak::{Hasher, Keccak};
    let mut hasher = Keccak::v256();
    let mut out = [0u8; 32];
    hasher.update(content.as_bytes());
    hasher.finalize(&mut out);
    hex::encode(out)
}

/// The 4-byte function selector for a signature (`"withdraw(uint256)"`), hex-encoded: the first
/// four bytes of the keccak256 hash of the signature text.
pub fn function_selector(signature: &str) -> String {
    use tiny_keccak::{Hasher, Keccak};
    let mut hasher = Keccak::v256();
    let mut out = [0u8; 32];
    hasher.update(signature.as_bytes());
    hasher.finalize(&mut out);
    hex::encode(&out[..4])
}

/// Canonicalize a path, following symlinks, without erroring on non-UTF8/odd components.
/// On Windows this also collapses `\\?\` verbatim prefixes via `dunce`.
pub fn canonicalize(path: impl AsRef<Path>) -> std::io::Result<PathBuf> {
    dunce::canonicalize(path.as_ref())
}

/// Best-effort canonicalization: falls back to the syntactic path if it doesn't exist on disk.
pub fn canonicalized(path: impl Into<PathBuf>) -> PathBuf {
    let path = path.into();
    canonicalize(&path).unwrap_or(path)
}

/// `source` relative to `root`, or `source` unchanged if it isn't a descendant.
pub fn source_name<'a>(source: &'a Path, root: impl AsRef<Path>) -> &'a Path {
    source.strip_prefix(root.as_ref()).unwrap_or(source)
}

/// Recursively lists all files with one of the given extensions under `root`, following symlinks.
pub fn files_with_extension(root: impl AsRef<Path>, extensions: &[&str]) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path().extension().and_then(|e| e.to_str()).is_some_and(|ext| extensions.contains(&ext))
        })
        .map(|e| e.path().to_path_buf())
        .collect()
}

pub fn read_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| CompileError::io(e, path))?;
    serde_json::from_str(&content).map_err(CompileError::Serde)
}

pub fn write_json_file<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    create_parent_dir_all(path)?;
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).map_err(|e| CompileError::io(e, path))?;
    Ok(())
}

pub fn create_parent_dir_all(path: impl AsRef<Path>) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent).map_err(|e| CompileError::io(e, parent))?;
    }
    Ok(())
}

/// Expands a leading `~` to the user's home directory and `$VAR`/`${VAR}` environment
/// references, matching the normalizer's rule 1.
pub fn expand_user_and_env(raw: &str) -> String {
    let expanded = if let Some(rest) = raw.strip_prefix('~') {
        match dirs::home_dir() {
            Some(home) => format!("{}{}", home.display(), rest),
            None => raw.to_string(),
        }
    } else {
        raw.to_string()
    };

    let mut out = String::with_capacity(expanded.len());
    let mut chars = expanded.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                chars.next();
            } else {
                break;
            }
        }
        if braced && chars.peek() == Some(&'}') {
            chars.next();
        }
        if name.is_empty() {
            out.push('$');
            continue;
        }
        out.push_str(&std::env::var(&name).unwrap_or_default());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_find_single_quote_imports() {
        let s = r#"
pragma solidity 0.8.6;

import '@openzeppelin/contracts/access/Ownable.sol';
import './../interfaces/IThing.sol';
"#;
        let imports = find_import_paths(s);
        assert_eq!(
            imports,
            vec![
                "@openzeppelin/contracts/access/Ownable.sol".to_string(),
                "./../interfaces/IThing.sol".to_string(),
            ]
        );
        assert_eq!(find_version_pragma(s), Some("0.8.6".to_string()));
    }

    #[test]
    fn can_parse_curly_bracket_imports() {
        let s = r#"import {ReentrancyGuard} from "@openzeppelin/contracts/utils/ReentrancyGuard.sol";"#;
        assert_eq!(find_import_paths(s), vec!["@openzeppelin/contracts/utils/ReentrancyGuard.sol"]);
    }

    #[test]
    fn expands_home_and_env() {
        std::env::set_var("UNICOMPILE_TEST_VAR", "value");
        assert_eq!(expand_user_and_env("$UNICOMPILE_TEST_VAR/foo"), "value/foo");
        assert_eq!(expand_user_and_env("${UNICOMPILE_TEST_VAR}/foo"), "value/foo");
    }

    #[test]
    fn finds_declarations_and_inheritance() {
        let src = r#"
contract D is C {
    function f() public {}
}
abstract contract C {}
library MathLib {}
interface IThing {}
"#;
        let decls = find_declarations(src);
        assert_eq!(decls.len(), 4);
        assert_eq!(decls[0].name, "D");
        assert_eq!(decls[0].inherits, vec!["C".to_string()]);
        assert_eq!(decls[1].kind, crate::model::source_unit::ContractKind::Abstract);
        assert_eq!(decls[2].kind, crate::model::source_unit::ContractKind::Library);
        assert_eq!(decls[3].kind, crate::model::source_unit::ContractKind::Interface);
    }

    #[test]
    fn finds_construction_dependencies() {
        let src = "contract D { function make() public { C c = new C(); } }";
        assert_eq!(find_construction_deps(src), vec!["C".to_string()]);
    }
}
