//! Plugin discovery
//!
//! A plugin module is a TOML manifest in the patches directory:
//!
//! ```toml
//! name = "ui-fixes"
//! exports = ["Stamp", "Inventory"]
//! ```
//!
//! Every exported type name must be registered in the [`PatchCatalog`]; each
//! is instantiated once per run. Any module that cannot be read, parsed or
//! instantiated aborts the whole load.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use serde::Deserialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use binpatch_core::{Error, Result};

use crate::guard::guarded;
use crate::registry::{Patch, PatchCatalog};

#[derive(Debug, Deserialize)]
struct ModuleManifest {
    name: Option<String>,
    #[serde(default)]
    exports: Vec<String>,
}

pub struct PluginLoader<'a> {
    catalog: &'a PatchCatalog,
    pattern: GlobMatcher,
}

impl<'a> PluginLoader<'a> {
    pub fn new(catalog: &'a PatchCatalog, module_pattern: &str) -> Result<Self> {
        let pattern = GlobBuilder::new(module_pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| Error::InvalidSetting {
                section: "Main".into(),
                key: "ModulePattern".into(),
                value: module_pattern.into(),
                reason: e.to_string(),
            })?
            .compile_matcher();
        Ok(Self { catalog, pattern })
    }

    /// Module files directly inside `dir`, sorted by file name.
    pub fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(Error::directory_not_found("patches", dir));
        }

        let mut modules = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| Error::module_load(dir, e.to_string()))?;
            if entry.file_type().is_file() && self.pattern.is_match(entry.file_name()) {
                modules.push(entry.into_path());
            }
        }
        Ok(modules)
    }

    /// Instantiate every patch exported by one module.
    pub fn load_module(&self, path: &Path) -> Result<Vec<Box<dyn Patch>>> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::module_load(path, e.to_string()))?;
        let manifest: ModuleManifest =
            toml::from_str(&text).map_err(|e| Error::module_load(path, e.to_string()))?;

        let module = manifest
            .name
            .clone()
            .unwrap_or_else(|| path.display().to_string());
        info!("Loading module '{}'", module);
        if manifest.exports.is_empty() {
            warn!("Module '{}' exports no patches", module);
        }

        let mut patches = Vec::with_capacity(manifest.exports.len());
        for type_name in &manifest.exports {
            let patch = guarded(|| {
                self.catalog
                    .instantiate(type_name)
                    .ok_or_else(|| anyhow::anyhow!("unknown patch type '{type_name}'"))
            })
            .map_err(|reason| Error::module_load(path, reason))?;
            patches.push(patch);
        }
        Ok(patches)
    }

    /// Load every module in `dir`. The first failing module aborts the load.
    pub fn load(&self, dir: &Path) -> Result<Vec<Box<dyn Patch>>> {
        let mut patches = Vec::new();
        for module in self.discover(dir)? {
            patches.extend(self.load_module(&module)?);
        }

        if patches.is_empty() {
            info!("No patches found in {}", dir.display());
        }
        for patch in &patches {
            info!("Loaded patcher '{}'", patch.label());
        }
        Ok(patches)
    }
}
