//! Moving one file's bytes into the destination tree.
//!
//! [`transfer`] copies or converts a single [`ImportItem`](crate::ImportItem)
//! to a destination already claimed by the [`PathPlanner`](crate::PathPlanner),
//! verifies the result and, if requested, deletes the original. It never
//! fails: whatever happens is described by the returned [`TransferOutcome`].

pub mod error;
mod file;
mod outcome;

pub use self::file::transfer;
pub use self::outcome::{Status, TransferOutcome};
