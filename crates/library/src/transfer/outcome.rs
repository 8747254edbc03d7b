use crate::ImportItem;
use crate::transfer::error::Error;
use derive_more::Display;
use std::path::PathBuf;

/// Terminal state of one file.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Status {
    #[display("copied")]
    Copied,
    #[display("converted")]
    Converted,
    /// Never started because the batch was cancelled.
    #[display("skipped")]
    Skipped,
    #[display("failed")]
    Failed,
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Copied | Self::Converted)
    }
}

/// What happened to one file of a batch. Created once, never updated.
#[derive(Debug)]
pub struct TransferOutcome {
    pub item: ImportItem,
    /// Where the file was (or would have been) written. `None` only when no
    /// destination could be planned.
    pub destination: Option<PathBuf>,
    pub status: Status,
    /// Why the file failed. Successful files may still carry the error of a
    /// failed deletion or of the conversion they fell back from.
    pub error: Option<Error>,
    /// Only ever set after the destination was verified.
    pub original_deleted: bool,
    /// A failed conversion was replaced by a plain copy.
    pub fell_back: bool,
}

impl TransferOutcome {
    pub(crate) fn failed(item: ImportItem, destination: Option<PathBuf>, error: Error) -> Self {
        Self {
            item,
            destination,
            status: Status::Failed,
            error: Some(error),
            original_deleted: false,
            fell_back: false,
        }
    }

    pub(crate) fn skipped(item: ImportItem, destination: Option<PathBuf>) -> Self {
        Self { item, destination, status: Status::Skipped, error: None, original_deleted: false, fell_back: false }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
