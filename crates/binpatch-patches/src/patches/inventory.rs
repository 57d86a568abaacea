//! Inventory: report artifact members without changing anything

use binpatch_core::ArtifactHandle;
use tracing::info;

use crate::registry::Patch;

#[derive(Default)]
pub struct InventoryPatch {
    seen: usize,
}

impl InventoryPatch {
    pub fn seen(&self) -> usize {
        self.seen
    }
}

impl Patch for InventoryPatch {
    fn name(&self) -> &str { "Inventory" }

    fn version(&self) -> &str { env!("CARGO_PKG_VERSION") }

    fn pre_patch(&mut self) -> anyhow::Result<()> {
        self.seen = 0;
        Ok(())
    }

    /// Never patches; logs what it sees.
    fn can_patch(&mut self, artifact: &ArtifactHandle) -> anyhow::Result<bool> {
        self.seen += 1;
        let members = artifact.artifact().members();
        info!(
            "inventory: {} has {} member(s){}",
            artifact.file_name(),
            members.len(),
            if artifact.from_backup() { " (from backup)" } else { "" }
        );
        Ok(false)
    }

    fn patch(&mut self, _artifact: &mut ArtifactHandle) -> anyhow::Result<()> {
        Ok(())
    }

    fn post_patch(&mut self) -> anyhow::Result<()> {
        info!("inventory: inspected {} artifact(s)", self.seen);
        Ok(())
    }
}
