//! Error types for the [`batch`](super) module.
//!
//! These are batch-level failures: they are raised before any file is touched
//! and end the event stream. Per-file failures never surface here; they are
//! recorded in each [`TransferOutcome`](crate::TransferOutcome) instead.

use derive_more::{Display, Error};

/// A batch error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for batch operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The sub-folder pattern id is not one of the recognized patterns.
    #[display("unrecognized sub-folder pattern: {_0}")]
    InvalidPattern(#[error(not(source))] String),
    /// The options cannot describe a valid batch (relative destination,
    /// unusable custom folder name, ...).
    #[display("invalid import options: {_0}")]
    InvalidOptions(#[error(not(source))] String),
    /// Conversion was requested but no working converter is available.
    #[display("DNG conversion requested but the converter is not available")]
    ConverterUnavailable,
    /// The event stream ended before the final report was produced.
    #[display("import ended without a report")]
    Incomplete,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConverterUnavailable => true,
            Self::InvalidPattern(_) | Self::InvalidOptions(_) | Self::Incomplete => false,
        }
    }
}
