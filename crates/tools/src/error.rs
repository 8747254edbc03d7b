//! Tool Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;
use std::time::Duration;

/// A tool error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for tool operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("DNG converter not detected on your system")]
    ConverterNotFound,
    #[display("exiftool not detected on your system")]
    ExifToolNotFound,
    #[display("external tool did not finish within {_0:?}")]
    Timeout(#[error(not(source))] Duration),
    /// The tool exited with a non-zero exit code.
    #[display("external tool exited with code: {_0}")]
    Failed(#[error(not(source))] i32),
    /// The tool was terminated by a signal, so there is no exit code.
    #[display("external tool was killed before it exited")]
    Killed,
    /// The converter exited successfully but the expected file is not there.
    #[display("converter produced no output at {}", _0.display())]
    OutputMissing(#[error(not(source))] PathBuf),
    #[display("unrecognised setting: {_0}")]
    InvalidSetting(#[error(not(source))] String),
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Killed)
    }

    /// Exit code of the tool, when it exited on its own.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed(code) => Some(*code),
            _ => None,
        }
    }
}
