//! ArtifactHandle: one loaded artifact plus its provenance

use std::path::{Path, PathBuf};

use crate::artifact::Artifact;

pub struct ArtifactHandle {
    location: PathBuf,
    from_backup: bool,
    was_patched: bool,
    artifact: Box<dyn Artifact>,
}

impl ArtifactHandle {
    /// `location` is the primary path the artifact is saved back to, even
    /// when the bytes were read from a backup.
    pub fn new(location: impl Into<PathBuf>, artifact: Box<dyn Artifact>, from_backup: bool) -> Self {
        Self {
            location: location.into(),
            from_backup,
            was_patched: false,
            artifact,
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// File name of the primary location, used in log output and backup names.
    pub fn file_name(&self) -> String {
        self.location
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.location.display().to_string())
    }

    pub fn from_backup(&self) -> bool {
        self.from_backup
    }

    pub fn was_patched(&self) -> bool {
        self.was_patched
    }

    /// Record that a patch succeeded. There is no way to clear the flag.
    pub fn mark_patched(&mut self) {
        self.was_patched = true;
    }

    pub fn artifact(&self) -> &dyn Artifact {
        self.artifact.as_ref()
    }

    pub fn artifact_mut(&mut self) -> &mut dyn Artifact {
        self.artifact.as_mut()
    }

    /// Downcast to the codec's concrete artifact type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.artifact.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.artifact.as_any_mut().downcast_mut::<T>()
    }
}

impl std::fmt::Debug for ArtifactHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactHandle")
            .field("location", &self.location)
            .field("from_backup", &self.from_backup)
            .field("was_patched", &self.was_patched)
            .finish_non_exhaustive()
    }
}
