use crate::transfer::{Status, TransferOutcome};
use time::UtcDateTime;

/// Every file's outcome, in the order the files were submitted.
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<TransferOutcome>,
    pub started_at: UtcDateTime,
    pub finished_at: UtcDateTime,
    /// The batch was cancelled; files that never started are `Skipped`.
    pub cancelled: bool,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Files that were copied or converted.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.count(Status::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(Status::Skipped)
    }

    pub fn converted(&self) -> usize {
        self.count(Status::Converted)
    }

    pub fn copied(&self) -> usize {
        self.count(Status::Copied)
    }

    pub fn originals_deleted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.original_deleted).count()
    }

    pub fn duration(&self) -> time::Duration {
        self.finished_at - self.started_at
    }

    fn count(&self, status: Status) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}
