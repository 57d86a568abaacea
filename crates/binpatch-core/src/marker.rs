//! Idempotency markers embedded in the artifact itself.
//!
//! A marker is a tag of kind [`MARKER_KIND`]. An artifact carrying a marker
//! whose payload is [`FINALIZED`] has already been saved by this tool, so no
//! fresh backup is taken for it. Patches may add their own markers, with any
//! payload, on the artifact or on the members they touched.

use crate::artifact::{Artifact, Tag, TagTarget};
use crate::error::Result;

pub const MARKER_KIND: &str = "Patched";

/// Payload written by the orchestrator when it saves an artifact.
pub const FINALIZED: &str = "binpatch";

/// True if the artifact has been finalized by a previous run.
pub fn has_marker(artifact: &dyn Artifact) -> bool {
    artifact
        .tags(&TagTarget::Artifact)
        .map(|tags| {
            tags.iter()
                .any(|t| t.kind == MARKER_KIND && t.payload == FINALIZED)
        })
        .unwrap_or(false)
}

/// Append an artifact-level marker.
pub fn add_marker(artifact: &mut dyn Artifact, info: &str) -> Result<()> {
    artifact.push_tag(&TagTarget::Artifact, Tag::new(MARKER_KIND, info))
}

/// Append a marker to one member.
pub fn add_member_marker(artifact: &mut dyn Artifact, member: &str, info: &str) -> Result<()> {
    artifact.push_tag(&TagTarget::member(member), Tag::new(MARKER_KIND, info))
}

/// Payloads of every marker on `target`, oldest first.
pub fn markers<'a>(artifact: &'a dyn Artifact, target: &TagTarget) -> Result<Vec<&'a str>> {
    Ok(artifact
        .tags(target)?
        .iter()
        .filter(|t| t.kind == MARKER_KIND)
        .map(|t| t.payload.as_str())
        .collect())
}
