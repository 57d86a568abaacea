//! PatchOrchestrator: the run lifecycle
//!
//! ```text
//! Init → ConfigLoaded → PatchersLoaded → PrePatched → ArtifactsLoaded
//!      → Patched → Saved → PostPatched → Done
//! ```
//!
//! `Init → Done` is the first-run halt after writing a default config.
//! Every other state may go to `Failed`. Any plugin error or panic aborts the
//! run at once; nothing already written is rolled back.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use binpatch_config::{
    normalize_path, ConfigStore, EmptyPatchSetPolicy, ExternalSource, NullSource, RunConfig,
};
use binpatch_core::marker::{self, FINALIZED};
use binpatch_core::{ArtifactCodec, ArtifactHandle, BlobCodec, Error, ExitCode, Result};
use binpatch_patches::{guarded, Patch, PatchCatalog, PluginLoader};

use crate::backup;
use crate::launch::{Launcher, ProcessLauncher};
use crate::store::ArtifactStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Init,
    ConfigLoaded,
    PatchersLoaded,
    PrePatched,
    ArtifactsLoaded,
    Patched,
    Saved,
    PostPatched,
    Done,
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::ConfigLoaded => "ConfigLoaded",
            Self::PatchersLoaded => "PatchersLoaded",
            Self::PrePatched => "PrePatched",
            Self::ArtifactsLoaded => "ArtifactsLoaded",
            Self::Patched => "Patched",
            Self::Saved => "Saved",
            Self::PostPatched => "PostPatched",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn allowed_transitions(from: Phase) -> Vec<Phase> {
    use Phase::*;
    match from {
        Init => vec![ConfigLoaded, Done, Failed],
        ConfigLoaded => vec![PatchersLoaded, Failed],
        PatchersLoaded => vec![PrePatched, Failed],
        PrePatched => vec![ArtifactsLoaded, Failed],
        ArtifactsLoaded => vec![Patched, Failed],
        Patched => vec![Saved, Failed],
        Saved => vec![PostPatched, Failed],
        PostPatched => vec![Done, Failed],
        Done => vec![],
        Failed => vec![],
    }
}

pub fn validate_transition(from: Phase, to: Phase) -> Result<()> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(Error::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub config_path: PathBuf,
    /// Overwrite the config with defaults, then carry on with the run.
    pub force_create: bool,
    /// Load each artifact from its newest backup when one exists.
    pub prefer_backup: bool,
}

impl RunOptions {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            force_create: false,
            prefer_backup: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSummary {
    pub location: PathBuf,
    pub from_backup: bool,
    pub patched: bool,
    /// Backup taken during this run, if any.
    pub backup: Option<PathBuf>,
    pub saved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub config: PathBuf,
    pub patches: Vec<String>,
    pub artifacts: Vec<ArtifactSummary>,
    pub launched: Option<u32>,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// A default config was written; the user should edit it and re-run.
    ConfigCreated(PathBuf),
    Completed(RunReport),
}

#[derive(Debug, thiserror::Error)]
#[error("{error} (phase {phase})")]
pub struct RunFailure {
    pub code: ExitCode,
    /// Last phase reached before the failure.
    pub phase: Phase,
    #[source]
    pub error: Error,
}

pub type SourceFactory = Box<dyn Fn() -> Box<dyn ExternalSource>>;

pub struct PatchOrchestrator {
    catalog: PatchCatalog,
    codec: Box<dyn ArtifactCodec>,
    launcher: Box<dyn Launcher>,
    source: SourceFactory,
    phase: Phase,
}

impl PatchOrchestrator {
    pub fn new(catalog: PatchCatalog) -> Self {
        Self {
            catalog,
            codec: Box::new(BlobCodec),
            launcher: Box::new(ProcessLauncher),
            source: Box::new(|| Box::new(NullSource) as Box<dyn ExternalSource>),
            phase: Phase::Init,
        }
    }

    pub fn with_codec(mut self, codec: impl ArtifactCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn with_launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Box::new(launcher);
        self
    }

    /// Source for `$(...)` lookups in config values.
    pub fn with_source(mut self, source: impl Fn() -> Box<dyn ExternalSource> + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, to: Phase) -> Result<()> {
        validate_transition(self.phase, to)?;
        debug!("phase {} -> {}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    pub fn run(&mut self, options: &RunOptions) -> std::result::Result<RunOutcome, RunFailure> {
        self.phase = Phase::Init;
        match self.execute(options) {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                let phase = self.phase;
                self.phase = Phase::Failed;
                let code = error.exit_code();
                error!("{} ({})", error, code);
                Err(RunFailure { code, phase, error })
            }
        }
    }

    fn execute(&mut self, options: &RunOptions) -> Result<RunOutcome> {
        let Some(store) = self.load_config(options)? else {
            let path = normalize_path(&options.config_path);
            self.advance(Phase::Done)?;
            return Ok(RunOutcome::ConfigCreated(path));
        };
        let config = store.run_config()?;
        check_directory("patches", &config.patches_dir)?;
        check_directory("artifacts", &config.artifacts_dir)?;
        self.advance(Phase::ConfigLoaded)?;

        let mut report = RunReport {
            config: store.path().to_path_buf(),
            ..RunReport::default()
        };

        let mut patches = self.load_patches(&config)?;
        report.patches = patches.iter().map(|p| p.label()).collect();
        self.advance(Phase::PatchersLoaded)?;

        for patch in patches.iter_mut() {
            guarded(|| patch.pre_patch())
                .map_err(|m| Error::patch_failed(patch.name(), "PrePatch", None, m))?;
        }
        self.advance(Phase::PrePatched)?;

        let mut artifacts = self.load_artifacts(&config, options.prefer_backup)?;
        self.advance(Phase::ArtifactsLoaded)?;

        dispatch(&mut patches, &mut artifacts)?;
        self.advance(Phase::Patched)?;

        report.artifacts = self.save_artifacts(&mut artifacts)?;
        self.advance(Phase::Saved)?;

        for patch in patches.iter_mut() {
            guarded(|| patch.post_patch())
                .map_err(|m| Error::patch_failed(patch.name(), "PostPatch", None, m))?;
        }
        self.advance(Phase::PostPatched)?;

        if let Some(spec) = &config.launch {
            info!("Launching {}", spec.executable.display());
            match self.launcher.launch(spec) {
                Ok(pid) => report.launched = Some(pid),
                Err(e) => warn!("Could not launch {}: {}", spec.executable.display(), e),
            }
        }
        self.advance(Phase::Done)?;

        Ok(RunOutcome::Completed(report))
    }

    /// `None` means a default config was written and the run should halt.
    fn load_config(&self, options: &RunOptions) -> Result<Option<ConfigStore>> {
        let path = normalize_path(&options.config_path);

        if options.force_create {
            let store = ConfigStore::create_default(&path, (self.source)())?;
            info!("Recreated config {}", path.display());
            return Ok(Some(store));
        }

        if !path.exists() {
            ConfigStore::create_default(&path, (self.source)())?;
            info!("Created config {}; edit it and run again", path.display());
            return Ok(None);
        }

        match ConfigStore::open(&path, (self.source)()) {
            Ok(store) => Ok(Some(store)),
            Err(e @ Error::ConfigParse { .. }) => {
                warn!("Config {} is unreadable: {}", path.display(), e);
                backup::create_backup(&path)?;
                ConfigStore::create_default(&path, (self.source)())?;
                info!("Replaced config {} with defaults; edit it and run again", path.display());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn load_patches(&self, config: &RunConfig) -> Result<Vec<Box<dyn Patch>>> {
        let patches = PluginLoader::new(&self.catalog, &config.module_pattern)?
            .load(&config.patches_dir)?;
        if patches.is_empty() && config.empty_patch_set == EmptyPatchSetPolicy::Fail {
            return Err(Error::NoPatchesFound(config.patches_dir.clone()));
        }
        Ok(patches)
    }

    /// Every configured file must exist before any is loaded. Entries naming
    /// a file already listed are dropped so each file has one handle.
    fn load_artifacts(&self, config: &RunConfig, prefer_backup: bool) -> Result<Vec<ArtifactHandle>> {
        let configured = config.artifact_paths();
        if let Some(missing) = configured.iter().find(|p| !p.is_file()) {
            return Err(Error::ArtifactNotFound(missing.clone()));
        }

        let mut seen = HashSet::new();
        let mut paths = Vec::with_capacity(configured.len());
        for path in configured {
            if seen.insert(fs::canonicalize(&path)?) {
                paths.push(path);
            } else {
                warn!("{} is listed more than once; patching it once", path.display());
            }
        }

        let store = ArtifactStore::new(self.codec.as_ref());
        paths
            .iter()
            .map(|path| store.load_artifact(path, prefer_backup, &config.search_paths(path)))
            .collect()
    }

    fn save_artifacts(&self, artifacts: &mut [ArtifactHandle]) -> Result<Vec<ArtifactSummary>> {
        let store = ArtifactStore::new(self.codec.as_ref());
        let mut summaries = Vec::with_capacity(artifacts.len());

        for handle in artifacts.iter_mut() {
            let mut summary = ArtifactSummary {
                location: handle.location().to_path_buf(),
                from_backup: handle.from_backup(),
                patched: handle.was_patched(),
                backup: None,
                saved: false,
            };

            if !handle.from_backup() && !handle.was_patched() {
                info!("{} not patched", handle.file_name());
                summaries.push(summary);
                continue;
            }

            let finalized = marker::has_marker(handle.artifact());
            if !handle.from_backup() && !finalized {
                summary.backup = Some(backup::create_backup(handle.location())?);
            }
            if !finalized {
                marker::add_marker(handle.artifact_mut(), FINALIZED)?;
            }
            store.save_artifact(handle)?;
            summary.saved = true;
            summaries.push(summary);
        }
        Ok(summaries)
    }
}

fn check_directory(kind: &'static str, dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(Error::directory_not_found(kind, dir))
    }
}

/// Try every patch against artifact 1, then every patch against artifact 2,
/// and so on.
fn dispatch(patches: &mut [Box<dyn Patch>], artifacts: &mut [ArtifactHandle]) -> Result<()> {
    for handle in artifacts.iter_mut() {
        for patch in patches.iter_mut() {
            let applies = guarded(|| patch.can_patch(&*handle)).map_err(|m| {
                Error::patch_failed(patch.name(), "CanPatch", Some(handle.file_name()), m)
            })?;
            if !applies {
                info!("{} skipped {}", patch.label(), handle.file_name());
                continue;
            }

            guarded(|| patch.patch(&mut *handle)).map_err(|m| {
                Error::patch_failed(patch.name(), "Patch", Some(handle.file_name()), m)
            })?;
            handle.mark_patched();
            info!("{} patched {}", patch.label(), handle.file_name());
        }
    }
    Ok(())
}
