//! `.terraform/modules/modules.json`, written by `terraform init`
//!
//! Lists where remote modules were downloaded to. Keys are the dotted module call names (`vpc`, `vpc.subnets`).
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const MANIFEST_PATH: &str = ".terraform/modules/modules.json";

#[derive(Debug, Default, Deserialize)]
pub struct ModuleManifest {
    #[serde(rename = "Modules", default)]
    modules: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ManifestEntry {
    key: String,
    #[serde(default)]
    source: String,
    dir: PathBuf,
}

impl ModuleManifest {
    /// Read the manifest below `root`, a missing manifest is empty
    pub fn load(root: &Path) -> Result<Self, super::LoadError> {
        let path = root.join(MANIFEST_PATH);
        if !path.is_file() {
            return Ok(Self::default());
        }

        tracing::debug!(path = %path.display(), "reading module manifest");
        let contents = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Directory of the module call `key`, relative to the root
    pub fn dir(&self, key: &str) -> Option<&Path> {
        self.modules
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| {
                tracing::trace!(key, source = %entry.source, "module found in manifest");
                entry.dir.as_path()
            })
    }
}
