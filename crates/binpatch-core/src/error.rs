//! Error types for binpatch

use std::path::PathBuf;

use thiserror::Error;

use crate::exit::ExitCode;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{kind} directory not found: {}", .path.display())]
    DirectoryNotFound { kind: &'static str, path: PathBuf },

    #[error("file not found: '{}'", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("cannot read artifact '{}': {reason}", .path.display())]
    ArtifactUnreadable { path: PathBuf, reason: String },

    #[error("malformed backup name '{}': {reason}", .path.display())]
    MalformedBackupName { path: PathBuf, reason: String },

    #[error("member not found: {0}")]
    MemberNotFound(String),

    #[error("config parse error at line {line}: {reason}")]
    ConfigParse { line: usize, reason: String },

    #[error("invalid value '{value}' for {section}.{key}: {reason}")]
    InvalidSetting {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("expansion of '{value}' exceeded depth {depth}")]
    ResolutionDepthExceeded { value: String, depth: usize },

    #[error("failed to load module '{}': {reason}", .path.display())]
    ModuleLoad { path: PathBuf, reason: String },

    #[error("no patches found in '{}'", .0.display())]
    NoPatchesFound(PathBuf),

    #[error("error in patcher '{patch}' during {phase}{}: {message}", artifact_suffix(.artifact))]
    PatchFailed {
        patch: String,
        phase: &'static str,
        artifact: Option<String>,
        message: String,
    },

    #[error("illegal phase transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

fn artifact_suffix(artifact: &Option<String>) -> String {
    artifact
        .as_ref()
        .map(|a| format!(" at artifact '{a}'"))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn directory_not_found(kind: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::DirectoryNotFound {
            kind,
            path: path.into(),
        }
    }

    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ArtifactUnreadable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn module_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ModuleLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn patch_failed(
        patch: impl Into<String>,
        phase: &'static str,
        artifact: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::PatchFailed {
            patch: patch.into(),
            phase,
            artifact,
            message: message.into(),
        }
    }

    /// The process exit code this error terminates a run with.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::PatchFailed { .. } => ExitCode::NoPatchesApplied,
            Self::DirectoryNotFound { .. } => ExitCode::DirectoryNotFound,
            Self::ArtifactNotFound(_) => ExitCode::FileNotFound,
            Self::NoPatchesFound(_) => ExitCode::NoPatchesFound,
            Self::ArtifactUnreadable { .. }
            | Self::MalformedBackupName { .. }
            | Self::MemberNotFound(_) => ExitCode::ArtifactUnreadable,
            Self::ConfigParse { .. }
            | Self::InvalidSetting { .. }
            | Self::ResolutionDepthExceeded { .. }
            | Self::ModuleLoad { .. }
            | Self::IllegalTransition { .. }
            | Self::IoError(_)
            | Self::JsonError(_)
            | Self::Internal(_) => ExitCode::InternalException,
        }
    }
}
