//! Reference codec: opaque payload bytes with a tag trailer.
//!
//! Layout on disk:
//!
//! ```text
//! payload | manifest (JSON) | manifest length (u32 LE) | TRAILER_MAGIC
//! ```
//!
//! Bytes that do not end in the magic are an untagged payload, so any file
//! can be loaded. Members are named slots declared by patches.

use std::any::Any;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifact::{Artifact, ArtifactCodec, Tag, TagTarget};
use crate::error::{Error, Result};

pub const TRAILER_MAGIC: &[u8; 8] = b"BPTAGv1\0";

const LEN_BYTES: usize = 4;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Manifest {
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    members: BTreeMap<String, Vec<Tag>>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlobArtifact {
    payload: Vec<u8>,
    manifest: Manifest,
}

impl BlobArtifact {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            manifest: Manifest::default(),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Vec<u8> {
        &mut self.payload
    }

    /// Declare a member so it can carry tags. Returns false if it already existed.
    pub fn declare_member(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.manifest.members.contains_key(&name) {
            return false;
        }
        self.manifest.members.insert(name, Vec::new());
        true
    }

    fn parse(bytes: &[u8]) -> std::result::Result<Self, String> {
        let footer = LEN_BYTES + TRAILER_MAGIC.len();
        if bytes.len() < footer || !bytes.ends_with(TRAILER_MAGIC) {
            return Ok(Self::new(bytes));
        }

        let len_at = bytes.len() - footer;
        let mut len_buf = [0u8; LEN_BYTES];
        len_buf.copy_from_slice(&bytes[len_at..len_at + LEN_BYTES]);
        let manifest_len = u32::from_le_bytes(len_buf) as usize;
        if manifest_len > len_at {
            return Err(format!(
                "tag trailer claims {manifest_len} bytes but only {len_at} precede it"
            ));
        }

        let manifest_at = len_at - manifest_len;
        let manifest: Manifest = serde_json::from_slice(&bytes[manifest_at..len_at])
            .map_err(|e| format!("corrupt tag trailer: {e}"))?;

        Ok(Self {
            payload: bytes[..manifest_at].to_vec(),
            manifest,
        })
    }
}

impl Artifact for BlobArtifact {
    fn members(&self) -> Vec<&str> {
        self.manifest.members.keys().map(|k| k.as_str()).collect()
    }

    fn tags(&self, target: &TagTarget) -> Result<&[Tag]> {
        match target {
            TagTarget::Artifact => Ok(&self.manifest.tags),
            TagTarget::Member(name) => self
                .manifest
                .members
                .get(name)
                .map(|tags| tags.as_slice())
                .ok_or_else(|| Error::MemberNotFound(name.clone())),
        }
    }

    fn push_tag(&mut self, target: &TagTarget, tag: Tag) -> Result<()> {
        match target {
            TagTarget::Artifact => self.manifest.tags.push(tag),
            TagTarget::Member(name) => self
                .manifest
                .members
                .get_mut(name)
                .ok_or_else(|| Error::MemberNotFound(name.clone()))?
                .push(tag),
        }
        Ok(())
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.manifest == Manifest::default() {
            return Ok(self.payload.clone());
        }
        let manifest = serde_json::to_vec(&self.manifest)?;
        let manifest_len = u32::try_from(manifest.len())
            .map_err(|_| Error::Internal("tag manifest exceeds 4 GiB".into()))?;

        let mut out =
            Vec::with_capacity(self.payload.len() + manifest.len() + LEN_BYTES + TRAILER_MAGIC.len());
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&manifest);
        out.extend_from_slice(&manifest_len.to_le_bytes());
        out.extend_from_slice(TRAILER_MAGIC);
        Ok(out)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Codec for [`BlobArtifact`]. Search paths are not consulted; blobs do not
/// reference each other.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlobCodec;

impl ArtifactCodec for BlobCodec {
    fn name(&self) -> &str {
        "blob"
    }

    fn read_from(&self, bytes: &[u8], _search_paths: &[PathBuf]) -> Result<Box<dyn Artifact>> {
        BlobArtifact::parse(bytes)
            .map(|a| Box::new(a) as Box<dyn Artifact>)
            .map_err(|reason| Error::unreadable(PathBuf::new(), reason))
    }

    fn write_to(&self, artifact: &dyn Artifact, path: &Path) -> Result<()> {
        std::fs::write(path, artifact.to_bytes()?)?;
        tracing::debug!("blob: wrote {}", path.display());
        Ok(())
    }
}
