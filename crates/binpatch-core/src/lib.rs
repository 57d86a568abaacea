//! binpatch core - artifact capability, markers, errors and exit codes

pub mod artifact;
pub mod blob;
pub mod error;
pub mod exit;
pub mod handle;
pub mod marker;

pub use artifact::{Artifact, ArtifactCodec, Tag, TagTarget};
pub use blob::{BlobArtifact, BlobCodec};
pub use error::{Error, Result};
pub use exit::ExitCode;
pub use handle::ArtifactHandle;
