//! Configuration store and the typed run configuration built from it
//!
//! The store keeps the raw INI document (comments included) and resolves
//! values on read. [`RunConfig`] is the resolved view handed to the
//! orchestrator once at startup.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info};

use binpatch_core::{Error, Result};

use crate::ini::IniDocument;
use crate::resolve::{ExternalSource, VariableResolver, DEFAULT_MAX_DEPTH};

pub const MAIN: &str = "Main";
pub const MAIN_PATCHES: &str = "PatchesDir";
pub const MAIN_ARTIFACTS: &str = "ArtifactsDir";
pub const MAIN_EXTENSION: &str = "Extension";
pub const MAIN_MODULE_PATTERN: &str = "ModulePattern";
pub const MAIN_EMPTY_PATCH_SET: &str = "EmptyPatchSet";
pub const MAIN_MAX_DEPTH: &str = "MaxExpansionDepth";
pub const ARTIFACTS: &str = "Artifacts";
pub const LAUNCH: &str = "Launch";
pub const LAUNCH_EXE: &str = "Executable";
pub const LAUNCH_ARGS: &str = "Arguments";
pub const LAUNCH_DIR: &str = "WorkingDir";

pub const DEFAULT_PATCHES_DIR: &str = "Patches";
pub const DEFAULT_ARTIFACTS_DIR: &str = "Artifacts";
pub const DEFAULT_EXTENSION: &str = "dll";
pub const DEFAULT_MODULE_PATTERN: &str = "*.toml";

/// Append `.ini` unless the path already ends with it (any case).
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let is_ini = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ini"));
    if is_ini {
        path.to_path_buf()
    } else {
        let mut s = path.as_os_str().to_os_string();
        s.push(".ini");
        PathBuf::from(s)
    }
}

/// What to do when the patches directory yields no patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPatchSetPolicy {
    /// Report it and run the remaining phases with no patches.
    #[default]
    Proceed,
    /// Abort the run.
    Fail,
}

impl FromStr for EmptyPatchSetPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "proceed" => Ok(Self::Proceed),
            "fail" => Ok(Self::Fail),
            other => Err(format!("expected 'proceed' or 'fail', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub executable: PathBuf,
    pub arguments: String,
    pub working_dir: Option<PathBuf>,
}

impl LaunchSpec {
    /// Configured working directory, else the executable's own directory.
    pub fn effective_working_dir(&self) -> Option<PathBuf> {
        self.working_dir.clone().or_else(|| {
            self.executable
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
        })
    }
}

/// Resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub patches_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    /// Canonical artifact extension, without the leading dot.
    pub extension: String,
    pub module_pattern: String,
    pub empty_patch_set: EmptyPatchSetPolicy,
    pub artifacts: Vec<ArtifactEntry>,
    pub launch: Option<LaunchSpec>,
}

impl RunConfig {
    pub fn new(patches_dir: impl Into<PathBuf>, artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            patches_dir: patches_dir.into(),
            artifacts_dir: artifacts_dir.into(),
            extension: DEFAULT_EXTENSION.into(),
            module_pattern: DEFAULT_MODULE_PATTERN.into(),
            empty_patch_set: EmptyPatchSetPolicy::default(),
            artifacts: Vec::new(),
            launch: None,
        }
    }

    pub fn with_artifact(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.artifacts.push(ArtifactEntry {
            name: name.to_string(),
            path: path.into(),
        });
        self
    }

    /// Full path of every configured artifact, in config order. The canonical
    /// extension is appended when missing; relative entries are taken from
    /// the artifacts directory.
    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        let suffix = format!(".{}", self.extension);
        self.artifacts
            .iter()
            .map(|entry| {
                let raw = entry.path.to_string_lossy();
                let file = if raw.to_ascii_lowercase().ends_with(&suffix.to_ascii_lowercase()) {
                    entry.path.clone()
                } else {
                    PathBuf::from(format!("{raw}{suffix}"))
                };
                if file.is_absolute() {
                    file
                } else {
                    self.artifacts_dir.join(file)
                }
            })
            .collect()
    }

    /// Directories a codec may search when resolving artifact references.
    pub fn search_paths(&self, artifact: &Path) -> Vec<PathBuf> {
        let mut paths = vec![self.artifacts_dir.clone(), self.patches_dir.clone()];
        if let Some(parent) = artifact.parent() {
            paths.push(parent.to_path_buf());
        }
        paths
    }
}

pub struct ConfigStore {
    path: PathBuf,
    doc: IniDocument,
    resolver: VariableResolver,
}

impl ConfigStore {
    /// Load and parse an existing config file.
    pub fn open(path: impl AsRef<Path>, source: Box<dyn ExternalSource>) -> Result<Self> {
        let path = normalize_path(path);
        let bytes = std::fs::read(&path)?;
        let text = String::from_utf8(bytes).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            Error::ConfigParse {
                line: valid.iter().filter(|&&b| b == b'\n').count() + 1,
                reason: "not valid UTF-8".into(),
            }
        })?;
        let doc = IniDocument::parse(&text)?;
        info!("Loaded config from {}", path.display());
        Self::from_document(path, doc, source)
    }

    /// Write the default config to `path` and return a store over it.
    pub fn create_default(path: impl AsRef<Path>, source: Box<dyn ExternalSource>) -> Result<Self> {
        let path = normalize_path(path);
        let store = Self::from_document(path, Self::default_document(), source)?;
        store.save()?;
        info!("Created config file {}", store.path.display());
        Ok(store)
    }

    pub fn from_document(
        path: impl Into<PathBuf>,
        doc: IniDocument,
        source: Box<dyn ExternalSource>,
    ) -> Result<Self> {
        let mut resolver = VariableResolver::new(source);
        resolver.define_from_comments(doc.comments());

        if let Some(raw) = doc.get(MAIN, MAIN_MAX_DEPTH).filter(|v| !v.is_empty()) {
            let depth = raw.parse::<usize>().map_err(|e| Error::InvalidSetting {
                section: MAIN.into(),
                key: MAIN_MAX_DEPTH.into(),
                value: raw.into(),
                reason: e.to_string(),
            })?;
            resolver.set_max_depth(depth);
        }

        Ok(Self {
            path: path.into(),
            doc,
            resolver,
        })
    }

    pub fn default_document() -> IniDocument {
        let mut doc = IniDocument::new();

        let main = doc.section_or_create(MAIN);
        main.comment(&[
            "Default configuration file for binpatch",
            "$(KEY\\PATH\\NAME) in any value is replaced by an external lookup",
            "%NAME% in any value expands an environment variable",
            "Define or override a variable with a comment of the form ;@NAME=value anywhere in this file",
        ]);
        let key = main.key_or_create(MAIN_PATCHES);
        key.comments.push("Directory to search for patch modules".into());
        key.value = DEFAULT_PATCHES_DIR.into();
        let key = main.key_or_create(MAIN_ARTIFACTS);
        key.comments.push("Directory to look for artifacts to patch".into());
        key.value = DEFAULT_ARTIFACTS_DIR.into();
        let key = main.key_or_create(MAIN_EXTENSION);
        key.comments.push("Extension appended to artifact entries that lack it".into());
        key.value = DEFAULT_EXTENSION.into();
        let key = main.key_or_create(MAIN_MODULE_PATTERN);
        key.comments.push("File pattern of patch modules inside PatchesDir".into());
        key.value = DEFAULT_MODULE_PATTERN.into();
        let key = main.key_or_create(MAIN_EMPTY_PATCH_SET);
        key.comments.push("proceed or fail when no patches are found".into());
        key.value = "proceed".into();
        let key = main.key_or_create(MAIN_MAX_DEPTH);
        key.comments.push("Maximum placeholder expansion passes per value".into());
        key.value = DEFAULT_MAX_DEPTH.to_string();

        doc.section_or_create(ARTIFACTS).comment(&[
            "Add artifact entries here",
            "Absolute, or relative to ArtifactsDir",
            "In the format <Name>=<Path>",
        ]);

        let launch = doc.section_or_create(LAUNCH);
        launch.comment(&["Application to start after patching (leave Executable empty to skip)"]);
        launch.key_or_create(LAUNCH_EXE);
        launch.key_or_create(LAUNCH_ARGS);
        launch.key_or_create(LAUNCH_DIR);

        doc
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &IniDocument {
        &self.doc
    }

    pub fn resolver(&self) -> &VariableResolver {
        &self.resolver
    }

    pub fn raw(&self, section: &str, key: &str) -> Option<&str> {
        self.doc.get(section, key)
    }

    /// Resolved value of `section.key`; missing keys read as empty.
    pub fn value(&self, section: &str, key: &str) -> Result<String> {
        self.resolver.resolve(self.raw(section, key).unwrap_or_default())
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.doc.set(section, key, value);
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, self.doc.to_string())?;
        debug!("Saved config to {}", self.path.display());
        Ok(())
    }

    /// Register an artifact under its file stem and save.
    pub fn request_artifact(&mut self, path: &str) -> Result<()> {
        let name = Path::new(path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        self.set(ARTIFACTS, &name, path);
        self.save()
    }

    pub fn run_config(&self) -> Result<RunConfig> {
        let mut config = RunConfig::new(
            self.value(MAIN, MAIN_PATCHES)?,
            self.value(MAIN, MAIN_ARTIFACTS)?,
        );

        let extension = self.value(MAIN, MAIN_EXTENSION)?;
        let extension = extension.trim_start_matches('.');
        if !extension.is_empty() {
            config.extension = extension.to_string();
        }

        let pattern = self.value(MAIN, MAIN_MODULE_PATTERN)?;
        if !pattern.is_empty() {
            config.module_pattern = pattern;
        }

        let policy = self.value(MAIN, MAIN_EMPTY_PATCH_SET)?;
        config.empty_patch_set = policy.parse().map_err(|reason| Error::InvalidSetting {
            section: MAIN.into(),
            key: MAIN_EMPTY_PATCH_SET.into(),
            value: policy.clone(),
            reason,
        })?;

        if let Some(section) = self.doc.section(ARTIFACTS) {
            for key in section.keys() {
                let value = self.resolver.resolve(&key.value)?;
                if value.is_empty() {
                    continue;
                }
                config.artifacts.push(ArtifactEntry {
                    name: key.name.clone(),
                    path: PathBuf::from(value),
                });
            }
        }

        let exe = self.value(LAUNCH, LAUNCH_EXE)?;
        if !exe.is_empty() {
            let dir = self.value(LAUNCH, LAUNCH_DIR)?;
            config.launch = Some(LaunchSpec {
                executable: PathBuf::from(exe),
                arguments: self.value(LAUNCH, LAUNCH_ARGS)?,
                working_dir: (!dir.is_empty()).then(|| PathBuf::from(dir)),
            });
        }

        Ok(config)
    }
}
