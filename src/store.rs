//! Loading and saving artifacts through a codec

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use binpatch_core::{ArtifactCodec, ArtifactHandle, Error, Result};

use crate::backup;

pub struct ArtifactStore<'a> {
    codec: &'a dyn ArtifactCodec,
}

impl<'a> ArtifactStore<'a> {
    pub fn new(codec: &'a dyn ArtifactCodec) -> Self {
        Self { codec }
    }

    /// Load `path`, or its newest backup when `prefer_backup` is set and one
    /// exists. The handle always points at `path`.
    pub fn load_artifact(
        &self,
        path: &Path,
        prefer_backup: bool,
        search_paths: &[PathBuf],
    ) -> Result<ArtifactHandle> {
        let latest = if prefer_backup {
            backup::find_latest(path)?
        } else {
            None
        };
        let (source, from_backup) = match latest {
            Some(snapshot) => (snapshot.path, true),
            None => (path.to_path_buf(), false),
        };

        let bytes = fs::read(&source).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::ArtifactNotFound(source.clone()),
            _ => Error::unreadable(&source, e.to_string()),
        })?;
        let artifact = self
            .codec
            .read_from(&bytes, search_paths)
            .map_err(|e| match e {
                Error::ArtifactUnreadable { reason, .. } => {
                    Error::unreadable(&source, format!("{}: {reason}", self.codec.name()))
                }
                other => other,
            })?;

        if from_backup {
            info!(
                "Loaded {} from backup {} ({})",
                path.display(),
                source.display(),
                self.codec.name()
            );
        } else {
            info!("Loaded {} ({})", path.display(), self.codec.name());
        }
        Ok(ArtifactHandle::new(path, artifact, from_backup))
    }

    /// Overwrite the artifact's primary location.
    pub fn save_artifact(&self, handle: &ArtifactHandle) -> Result<()> {
        self.codec.write_to(handle.artifact(), handle.location())?;
        info!("Saved {} ({})", handle.location().display(), self.codec.name());
        Ok(())
    }
}
