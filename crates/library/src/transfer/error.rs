//! Error types for the [`transfer`](super) module.
//!
//! Transfer errors never escape a batch: each one is stored in the
//! [`TransferOutcome`](super::TransferOutcome) of the file it belongs to.

use derive_more::{Display, Error};

/// A per-file error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for transfer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The step of a transfer an I/O error happened in.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Stage {
    #[display("reading source")]
    Read,
    #[display("creating destination directory")]
    CreateDir,
    #[display("copying")]
    Copy,
    #[display("converting")]
    Convert,
    #[display("moving into place")]
    Rename,
    #[display("verifying")]
    Verify,
    #[display("deleting original")]
    Delete,
}

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The converter failed, timed out or produced nothing usable.
    #[display("conversion failed: {reason}")]
    Conversion { reason: String, exit_code: Option<i32> },
    #[display("I/O error while {_0}")]
    Io(#[error(not(source))] Stage),
    /// The written file does not match what was expected.
    #[display("verification failed: {_0}")]
    VerificationFailed(#[error(not(source))] String),
    /// No destination could be planned for the file.
    #[display("could not plan a destination path")]
    Plan,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Conversion { .. } | Self::VerificationFailed(_) | Self::Plan => false,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Conversion { .. } => Some(Stage::Convert),
            Self::Io(stage) => Some(*stage),
            Self::VerificationFailed(_) => Some(Stage::Verify),
            Self::Plan => None,
        }
    }

    /// Exit code of a converter that ran and failed.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Conversion { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}
