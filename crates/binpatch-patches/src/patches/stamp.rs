//! Stamp: record name and version of this build on every artifact

use anyhow::Context;
use binpatch_core::marker;
use binpatch_core::{ArtifactHandle, TagTarget};
use tracing::debug;

use crate::registry::Patch;

pub struct StampPatch {
    stamp: String,
}

impl Default for StampPatch {
    fn default() -> Self {
        Self {
            stamp: format!("Stamp {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Patch for StampPatch {
    fn name(&self) -> &str { "Stamp" }

    fn version(&self) -> &str { env!("CARGO_PKG_VERSION") }

    /// Skips artifacts that already carry this stamp.
    fn can_patch(&mut self, artifact: &ArtifactHandle) -> anyhow::Result<bool> {
        let existing = marker::markers(artifact.artifact(), &TagTarget::Artifact)?;
        Ok(!existing.contains(&self.stamp.as_str()))
    }

    fn patch(&mut self, artifact: &mut ArtifactHandle) -> anyhow::Result<()> {
        marker::add_marker(artifact.artifact_mut(), &self.stamp)
            .with_context(|| format!("stamping {}", artifact.file_name()))?;
        debug!("stamp: {}", artifact.file_name());
        Ok(())
    }
}
