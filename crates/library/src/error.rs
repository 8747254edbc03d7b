//! Errors raised while discovering source files.
//!
//! Batch and per-file errors have their own kinds in [`batch::error`](crate::batch::error)
//! and [`transfer::error`](crate::transfer::error).

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A discovery error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A directory below the source root could not be listed.
    #[display("could not read directory: {}", _0.display())]
    ReadDir(#[error(not(source))] PathBuf),
    /// A candidate file could not be read for hashing.
    #[display("could not hash file: {}", _0.display())]
    Hash(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ReadDir(_) | Self::Hash(_) => false,
        }
    }
}
