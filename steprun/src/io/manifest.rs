//! JSON package manifest helpers (`package.json`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};
use tracing::info;

use crate::core::step::Action;

/// Read the `version` field of a package manifest.
pub fn read_version(path: &Path) -> Result<String> {
    let manifest = load(path)?;
    manifest
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("{} has no string \"version\"", path.display()))
}

/// Rename a package and drop its `devDependencies` so it publishes cleanly.
#[derive(Debug, Clone)]
pub struct RenamePackage {
    pub manifest: PathBuf,
    pub name: String,
}

impl Action for RenamePackage {
    fn run(&self) -> Result<()> {
        let mut manifest = load(&self.manifest)?;
        manifest.insert("name".to_string(), Value::String(self.name.clone()));
        manifest.remove("devDependencies");
        write(&self.manifest, &manifest)?;
        info!(manifest = %self.manifest.display(), name = %self.name, "renamed package");
        Ok(())
    }
}

fn load(path: &Path) -> Result<Map<String, Value>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("{} is not a JSON object", path.display())),
    }
}

fn write(path: &Path, manifest: &Map<String, Value>) -> Result<()> {
    let payload = serde_json::to_string_pretty(manifest).context("serialize manifest")?;
    fs::write(path, payload).with_context(|| format!("write {}", path.display()))
}
