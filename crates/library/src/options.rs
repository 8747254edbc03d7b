use crate::batch::error::{Error, ErrorKind, Result};
use crate::plan::SubFolderPattern;
use derive_more::Display;
use photo_import_tools::DngSettings;
use std::path::PathBuf;
use std::str::FromStr;

/// Per-batch import choices, captured once before the batch starts.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportOptions {
    /// Absolute directory the dated sub-folders are created in.
    pub destination_root: PathBuf,
    pub sub_folder: SubFolderPattern,
    /// Convert RAW files to DNG instead of copying them. Files that are not
    /// eligible RAW files are still copied.
    pub convert_to_dng: bool,
    /// Delete each original once its copy or conversion has been verified.
    pub delete_original: bool,
    /// Converter settings; the defaults apply when unset.
    pub dng_settings: Option<DngSettings>,
}

impl ImportOptions {
    pub fn new(destination_root: impl Into<PathBuf>, sub_folder: SubFolderPattern) -> Self {
        Self {
            destination_root: destination_root.into(),
            sub_folder,
            convert_to_dng: false,
            delete_original: false,
            dng_settings: None,
        }
    }

    /// Enables DNG conversion with the given settings (or the defaults).
    pub fn with_conversion(mut self, settings: impl Into<Option<DngSettings>>) -> Self {
        self.convert_to_dng = true;
        self.dng_settings = settings.into();
        self
    }

    pub fn with_delete_original(mut self, delete_original: bool) -> Self {
        self.delete_original = delete_original;
        self
    }

    pub fn dng_settings(&self) -> DngSettings {
        self.dng_settings.clone().unwrap_or_default()
    }

    /// Checks what can be checked without touching the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.destination_root.as_os_str().is_empty() {
            exn::bail!(ErrorKind::InvalidOptions("destination root is empty".into()));
        }
        if !self.destination_root.is_absolute() {
            exn::bail!(ErrorKind::InvalidOptions(format!(
                "destination root must be an absolute path: {}",
                self.destination_root.display()
            )));
        }
        Ok(())
    }
}

/// What happens to a RAW file whose conversion fails.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum ConversionFallback {
    /// The file fails; nothing is written for it.
    #[default]
    #[display("fail")]
    Fail,
    /// The original RAW file is copied instead, keeping its extension.
    #[display("copy")]
    Copy,
}

impl FromStr for ConversionFallback {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "copy" => Ok(Self::Copy),
            other => exn::bail!(ErrorKind::InvalidOptions(format!("unknown conversion fallback: {other}"))),
        }
    }
}
