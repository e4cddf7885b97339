//! Hardhat: `hardhat.config.*` present. v3 projects are distinguished by `package.json`
//! declaring the v3 toolbox and tried first (higher priority number = lower precedence means v3
//! must have a *smaller* priority value than v2, since it's a more specific match).

use super::artifact_layout::{self, ArtifactLayout};
use super::{Adapter, AdapterContext};
use crate::error::Result;
use crate::model::unit::CompilationUnit;
use serde_json::Value;
use std::path::Path;

const LAYOUT: ArtifactLayout = ArtifactLayout {
    build_command: ("npx", &["hardhat", "compile"]),
    artifacts_dir: "artifacts",
    source_path_field: Some("sourceName"),
};

fn has_hardhat_config(root: &Path) -> bool {
    ["hardhat.config.js", "hardhat.config.ts", "hardhat.config.cjs", "hardhat.config.mjs"]
        .iter()
        .any(|name| root.join(name).is_file())
}

fn declares_v3_toolbox(root: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(root.join("package.json")) else { return false };
    let Ok(json) = serde_json::from_str::<Value>(&content) else { return false };
    ["dependencies", "devDependencies"].iter().any(|section| {
        json.get(section)
            .and_then(Value::as_object)
            .map(|deps| deps.keys().any(|k| k == "@nomicfoundation/hardhat-toolbox" && deps[k].as_str().is_some_and(|v| v.starts_with('3'))))
            .unwrap_or(false)
    })
}

pub struct HardhatV3Adapter;

impl Adapter for HardhatV3Adapter {
    fn name(&self) -> &'static str {
        "hardhat-v3"
    }

    fn priority(&self) -> i32 {
        150
    }

    fn detect(&self, root: &Path) -> bool {
        has_hardhat_config(root) && declares_v3_toolbox(root)
    }

    fn compile(&self, ctx: &AdapterContext<'_>) -> Result<Vec<CompilationUnit>> {
        compile_with_layout(ctx, self.name())
    }
}

pub struct HardhatV2Adapter;

impl Adapter for HardhatV2Adapter {
    fn name(&self) -> &'static str {
        "hardhat-v2"
    }

    fn priority(&self) -> i32 {
        200
    }

    fn detect(&self, root: &Path) -> bool {
        has_hardhat_config(root)
    }

    fn compile(&self, ctx: &AdapterContext<'_>) -> Result<Vec<CompilationUnit>> {
        compile_with_layout(ctx, self.name())
    }
}

fn compile_with_layout(ctx: &AdapterContext<'_>, adapter: &str) -> Result<Vec<CompilationUnit>> {
    // Hardhat supports multiple compiler profiles in one project (overrides per directory); the
    // component design allows more than one unit per adapter for exactly this case. We compile
    // once and rely on the artifact directory holding all profiles' output; a richer
    // implementation would read `hardhat.config.*`'s `solidity.compilers` array and emit one
    // unit per declared version.
    let unit = artifact_layout::compile(
        &ctx.root,
        adapter,
        &LAYOUT,
        ctx.filenames,
        ctx.config.skip_build,
        ctx.config.timeout,
    )?;
    Ok(vec![unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v3_requires_toolbox_marker() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hardhat.config.js"), "module.exports = {};").unwrap();
        assert!(HardhatV2Adapter.detect(dir.path()));
        assert!(!HardhatV3Adapter.detect(dir.path()));

        std::fs::write(
            dir.path().join("package.json"),
            r#"{"devDependencies": {"@nomicfoundation/hardhat-toolbox": "3.0.0"}}"#,
        )
        .unwrap();
        assert!(HardhatV3Adapter.detect(dir.path()));
    }
}
