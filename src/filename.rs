//! Identity and normalization of source paths.
//!
//! A [`Filename`] is the unit of identity for everything downstream: two compilation units
//! that mention "the same file" by different strings (a relative import, a remapped alias, an
//! absolute path) must end up pointing at one [`Filename`] instance. [`FilenameIndex`] owns that
//! mapping for a whole [`crate::model::Project`].

use crate::utils;
use cfg_if::cfg_if;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

/// A dependency-root/vendor-directory name stripped when computing [`Filename::short`].
const VENDOR_DIRS: &[&str] = &["node_modules", "lib", "dependencies"];

/// One identity for a source file. Equality and hashing are on `absolute` only; the other three
/// facets are display/lookup conveniences that may legitimately differ across the same identity
/// (that's exactly what [`FilenameIndex`] resolves).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Filename {
    /// Canonical (or best-effort syntactic) absolute path. Sole identity key.
    pub absolute: PathBuf,
    /// `absolute` relative to the project's working directory, if it's a descendant; else
    /// equal to `absolute`.
    pub relative: PathBuf,
    /// `absolute` with dependency-root/workdir/home prefixes stripped, whichever matches first.
    pub short: PathBuf,
    /// The verbatim string the caller used to reference this file (an import string, a CLI
    /// argument). Never normalized.
    pub used: String,
}

impl PartialEq for Filename {
    fn eq(&self, other: &Self) -> bool {
        self.absolute == other.absolute
    }
}
impl Eq for Filename {}

impl std::hash::Hash for Filename {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.absolute.hash(state);
    }
}

/// Hints a normalization pass may use to resolve a path that doesn't exist relative to the
/// working directory: additional search directories and import-remapping prefix substitutions
/// (`"@oz/=lib/openzeppelin-contracts/"`-style, left-hand side matched as a literal prefix).
#[derive(Debug, Clone, Default)]
pub struct NormalizeHints<'a> {
    pub include_paths: &'a [PathBuf],
    pub remappings: &'a [(String, PathBuf)],
}

/// Applies the six normalization rules from the component design, in order, producing the
/// `absolute`/`relative`/`short` facets for a raw path string. `used` is filled in by the caller
/// since it's the verbatim input, not something this function should touch.
pub fn normalize(raw: &str, workdir: &Path, hints: &NormalizeHints<'_>) -> (PathBuf, PathBuf, PathBuf) {
    // 1. expand ~ and env vars
    let expanded = utils::expand_user_and_env(raw);
    let candidate = PathBuf::from(&expanded);

    // 2. absolute + exists -> canonicalize
    let absolute = if candidate.is_absolute() && candidate.exists() {
        utils::canonicalize(&candidate).unwrap_or(candidate)
    } else {
        // 3. try workdir, include paths, remapping prefixes in order; first that exists wins
        resolve_relative(&expanded, workdir, hints)
    };

    // 4. relative
    let relative = match absolute.strip_prefix(workdir) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => absolute.clone(),
    };

    // 5. short
    let short = strip_known_prefix(&absolute, workdir);

    (absolute, relative, short)
}

fn resolve_relative(expanded: &str, workdir: &Path, hints: &NormalizeHints<'_>) -> PathBuf {
    let rel = Path::new(expanded);

    let candidate = workdir.join(rel);
    if candidate.exists() {
        return utils::canonicalize(&candidate).unwrap_or(candidate);
    }

    for include in hints.include_paths {
        let candidate = include.join(rel);
        if candidate.exists() {
            return utils::canonicalize(&candidate).unwrap_or(candidate);
        }
    }

    for (prefix, target) in hints.remappings {
        if let Some(suffix) = expanded.strip_prefix(prefix.as_str()) {
            let candidate = target.join(suffix.trim_start_matches('/'));
            if candidate.exists() {
                return utils::canonicalize(&candidate).unwrap_or(candidate);
            }
        }
    }

    // nothing exists: syntactic join, no existence requirement
    path_clean(&workdir.join(rel))
}

/// Lexically normalizes `..`/`.` components without touching the filesystem.
fn path_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn strip_known_prefix(absolute: &Path, workdir: &Path) -> PathBuf {
    for component in absolute.components() {
        if let std::path::Component::Normal(name) = component {
            if VENDOR_DIRS.iter().any(|v| name == std::ffi::OsStr::new(v)) {
                if let Ok(stripped) = find_after(absolute, name.to_str().unwrap_or_default()) {
                    return stripped;
                }
            }
        }
    }

    if let Ok(rel) = absolute.strip_prefix(workdir) {
        return rel.to_path_buf();
    }

    if let Some(home) = dirs::home_dir() {
        if let Ok(rel) = absolute.strip_prefix(&home) {
            return rel.to_path_buf();
        }
    }

    absolute.to_path_buf()
}

fn find_after(path: &Path, marker: &str) -> Result<PathBuf, ()> {
    let components: Vec<_> = path.components().collect();
    let idx = components
        .iter()
        .position(|c| matches!(c, std::path::Component::Normal(n) if n == std::ffi::OsStr::new(marker)))
        .ok_or(())?;
    let mut out = PathBuf::new();
    for c in &components[idx..] {
        out.push(c.as_os_str());
    }
    Ok(out)
}

/// Project-wide identity map. All lookups (by absolute path, by `used` alias) resolve to the
/// same [`Filename`] instance, guarded by a single `RwLock` per the concurrency model (multiple
/// compilation units may resolve imports concurrently via the rayon pool).
#[derive(Debug, Default)]
pub struct FilenameIndex {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    by_absolute: HashMap<PathBuf, Arc<Filename>>,
    by_used: HashMap<String, PathBuf>,
}

impl FilenameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs or reuses the identity for `raw`, returning the shared instance. If `raw`
    /// resolves (via `absolute`) to a path already indexed under a different `used` alias, both
    /// aliases are remembered and the existing instance is returned unchanged.
    pub fn intern(&self, raw: &str, workdir: &Path, hints: &NormalizeHints<'_>) -> Arc<Filename> {
        let (absolute, relative, short) = normalize(raw, workdir, hints);
        let key = case_fold_key(&absolute);

        {
            let guard = self.inner.read().expect("filename index lock poisoned");
            if let Some(existing) = guard.by_absolute.get(&key) {
                return existing.clone();
            }
        }

        let mut guard = self.inner.write().expect("filename index lock poisoned");
        // re-check: another thread may have inserted this identity while we waited for the lock
        if let Some(existing) = guard.by_absolute.get(&key) {
            guard.by_used.entry(raw.to_string()).or_insert_with(|| key.clone());
            return existing.clone();
        }

        let filename =
            Arc::new(Filename { absolute, relative, short, used: raw.to_string() });
        guard.by_absolute.insert(key.clone(), filename.clone());
        guard.by_used.insert(raw.to_string(), key);
        filename
    }

    pub fn get_by_used(&self, used: &str) -> Option<Arc<Filename>> {
        let guard = self.inner.read().expect("filename index lock poisoned");
        let key = guard.by_used.get(used)?;
        guard.by_absolute.get(key).cloned()
    }

    pub fn get_by_absolute(&self, absolute: &Path) -> Option<Arc<Filename>> {
        let guard = self.inner.read().expect("filename index lock poisoned");
        guard.by_absolute.get(&case_fold_key(absolute)).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("filename index lock poisoned").by_absolute.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// On case-insensitive filesystems (macOS default, Windows) two syntactically different
/// absolute paths may refer to the same file; folding the lookup key to lowercase merges them
/// per the collision policy. On case-sensitive filesystems this is a (harmless) no-op beyond
/// disallowing two genuinely distinct files that differ only in case, which is the documented
/// tradeoff.
fn case_fold_key(path: &Path) -> PathBuf {
    cfg_if! {
        if #[cfg(any(target_os = "macos", target_os = "windows"))] {
            PathBuf::from(path.to_string_lossy().to_lowercase())
        } else {
            path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_collapse_to_one_identity() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path();
        std::fs::write(workdir.join("Foo.sol"), "contract Foo {}").unwrap();

        let index = FilenameIndex::new();
        let hints = NormalizeHints::default();
        let a = index.intern("Foo.sol", workdir, &hints);
        let b = index.intern("./Foo.sol", workdir, &hints);

        assert_eq!(a.absolute, b.absolute);
        assert_eq!(index.len(), 1);
        assert_eq!(a.used, "Foo.sol");
        assert_eq!(b.used, "./Foo.sol");
    }

    #[test]
    fn short_strips_vendor_dir() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path();
        let vendor = workdir.join("node_modules").join("@oz").join("Ownable.sol");
        std::fs::create_dir_all(vendor.parent().unwrap()).unwrap();
        std::fs::write(&vendor, "contract Ownable {}").unwrap();

        let index = FilenameIndex::new();
        let hints = NormalizeHints::default();
        let f = index.intern("node_modules/@oz/Ownable.sol", workdir, &hints);
        assert_eq!(f.short, PathBuf::from("node_modules/@oz/Ownable.sol"));
    }

    #[test]
    fn nonexistent_path_still_normalizes_syntactically() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path();
        let hints = NormalizeHints::default();
        let (absolute, _, _) = normalize("../outside/Thing.sol", workdir, &hints);
        assert!(!absolute.to_string_lossy().contains(".."));
    }
}
