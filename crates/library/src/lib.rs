//! Batch import engine for photos.
//!
//! Takes an ordered selection of [`ImportItem`]s, plans a destination for
//! each one below a destination root (dated sub-folder plus collision
//! avoidance), then copies or DNG-converts every file with bounded
//! concurrency. Each file is verified before its original is (optionally)
//! deleted, and every file ends up with exactly one [`TransferOutcome`] in the
//! final [`BatchReport`].
//!
//! The primary entry points are [`import`] (a stream of [`ImportEvent`]s) and
//! [`run`] (the same, driven to completion with a progress callback). Items
//! are usually built by [`discover`]ing a source directory.

pub mod batch;
pub mod discover;
pub mod error;
mod item;
mod options;
pub mod plan;
pub mod transfer;

pub use crate::batch::{BatchReport, ImportEvent, Progress, import, run};
pub use crate::discover::{describe, discover, discover_all};
pub use crate::item::{DEFAULT_RAW_EXTENSIONS, ImportItem, RawFormats};
pub use crate::options::{ConversionFallback, ImportOptions};
pub use crate::plan::{PathPlanner, SubFolderPattern, UNKNOWN_DATE_FOLDER};
pub use crate::transfer::{Status, TransferOutcome};
pub use tokio_util::sync::CancellationToken;

use photo_import_tools::{ConverterHandle, ExifTool};

/// Number of files transferred at the same time unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Collaborators and engine-wide policy shared by every batch.
///
/// Per-batch choices (where files go, whether to convert) live in
/// [`ImportOptions`] instead.
#[derive(Clone)]
pub struct Context {
    /// DNG converter; required only for batches that request conversion.
    pub converter: Option<ConverterHandle>,
    /// Used by [`discover`] to fill in capture dates.
    pub exiftool: Option<ExifTool>,
    pub raw_formats: RawFormats,
    /// Maximum in-flight transfers. Values below one are treated as one.
    pub concurrency: usize,
    pub fallback: ConversionFallback,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            converter: None,
            exiftool: None,
            raw_formats: RawFormats::default(),
            concurrency: DEFAULT_CONCURRENCY,
            fallback: ConversionFallback::default(),
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_converter(mut self, converter: impl Into<Option<ConverterHandle>>) -> Self {
        self.converter = converter.into();
        self
    }

    pub fn with_exiftool(mut self, exiftool: impl Into<Option<ExifTool>>) -> Self {
        self.exiftool = exiftool.into();
        self
    }

    pub fn with_raw_formats(mut self, raw_formats: RawFormats) -> Self {
        self.raw_formats = raw_formats;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_fallback(mut self, fallback: ConversionFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub(crate) fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}
