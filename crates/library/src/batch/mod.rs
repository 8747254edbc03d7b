//! Running a whole selection of files.
//!
//! [`import`] validates the [`ImportOptions`](crate::ImportOptions), checks the
//! converter is available when conversion is requested, plans every
//! destination up front, then transfers files with bounded concurrency,
//! streaming an [`ImportEvent`] as each one finishes. [`run`] drives the same
//! stream to completion and hands back the [`BatchReport`].
//!
//! One file failing never stops the others. Only problems with the batch
//! itself (bad options, missing converter) are returned as errors; those are
//! raised before anything is written.

pub mod error;
mod report;
mod stream;

pub use self::report::BatchReport;
pub use self::stream::{ImportEvent, Progress, import, run};
