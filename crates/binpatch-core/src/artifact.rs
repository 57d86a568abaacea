//! Artifact capability: the surface the orchestrator and patches need from a
//! binary format, without knowing the format itself.
//!
//! A codec turns bytes into an [`Artifact`] and back. An artifact carries an
//! append-only list of [`Tag`]s, both on itself and on each of its named
//! members.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A metadata annotation attached to an artifact or one of its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub kind: String,
    pub payload: String,
}

impl Tag {
    pub fn new(kind: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
        }
    }
}

/// Where a tag is read from or written to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagTarget {
    Artifact,
    Member(String),
}

impl TagTarget {
    pub fn member(name: impl Into<String>) -> Self {
        Self::Member(name.into())
    }
}

impl fmt::Display for TagTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Artifact => write!(f, "<artifact>"),
            Self::Member(name) => write!(f, "{name}"),
        }
    }
}

/// A loaded binary artifact.
pub trait Artifact {
    /// Names of the members that can carry tags.
    fn members(&self) -> Vec<&str>;

    /// All tags on `target`, oldest first.
    fn tags(&self, target: &TagTarget) -> Result<&[Tag]>;

    /// Append a tag to `target`. Existing tags are never replaced or merged.
    fn push_tag(&mut self, target: &TagTarget, tag: Tag) -> Result<()>;

    /// Serialize the artifact, including its tags.
    fn to_bytes(&self) -> Result<Vec<u8>>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// True if `target` has at least one tag of `kind`.
    fn has_tag(&self, target: &TagTarget, kind: &str) -> Result<bool> {
        Ok(self.tags(target)?.iter().any(|t| t.kind == kind))
    }
}

/// Reads and writes artifacts of one binary format.
pub trait ArtifactCodec {
    /// Short format name used in log output.
    fn name(&self) -> &str;

    /// Deserialize an artifact. `search_paths` lists directories the format
    /// may consult to resolve references to other artifacts.
    fn read_from(&self, bytes: &[u8], search_paths: &[PathBuf]) -> Result<Box<dyn Artifact>>;

    /// Serialize `artifact` to `path`, overwriting it.
    fn write_to(&self, artifact: &dyn Artifact, path: &Path) -> Result<()> {
        let bytes = artifact.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
