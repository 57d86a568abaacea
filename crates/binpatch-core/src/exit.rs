//! Process exit codes
//!
//! Values are fixed and printed in the usage text. Zero is success, every
//! failure kind has its own non-zero value.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    NoPatchesApplied = 1,
    DirectoryNotFound = -1,
    FileNotFound = -2,
    InternalException = -3,
    NoPatchesFound = -4,
    ArtifactUnreadable = -5,
}

impl ExitCode {
    pub const ALL: [ExitCode; 7] = [
        ExitCode::Success,
        ExitCode::NoPatchesApplied,
        ExitCode::DirectoryNotFound,
        ExitCode::FileNotFound,
        ExitCode::InternalException,
        ExitCode::NoPatchesFound,
        ExitCode::ArtifactUnreadable,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::NoPatchesApplied => "NoPatchesApplied",
            Self::DirectoryNotFound => "DirectoryNotFound",
            Self::FileNotFound => "FileNotFound",
            Self::InternalException => "InternalException",
            Self::NoPatchesFound => "NoPatchesFound",
            Self::ArtifactUnreadable => "ArtifactUnreadable",
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
