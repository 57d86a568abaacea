//! binpatch: apply patch plugins to binary artifacts, once
//!
//! Library half of the `binpatch` binary: artifact store, backups, the run
//! orchestrator and the post-patch launcher. The member crates hold the
//! artifact capability (`binpatch-core`), configuration (`binpatch-config`)
//! and the patch contract (`binpatch-patches`).

pub mod backup;
pub mod console;
pub mod launch;
pub mod orchestrator;
pub mod store;

pub use launch::{split_arguments, Launcher, ProcessLauncher};
pub use orchestrator::{
    ArtifactSummary, Phase, PatchOrchestrator, RunFailure, RunOptions, RunOutcome, RunReport,
};
pub use store::ArtifactStore;
