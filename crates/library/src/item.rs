use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use time::Date;

/// RAW extensions the DNG converter accepts, lower-cased.
pub const DEFAULT_RAW_EXTENSIONS: &[&str] = &[
    "3fr", "ari", "arw", "bay", "braw", "cap", "cr2", "cr3", "cri", "crw", "dcr", "dcs", "drf", "eip", "erf", "fff",
    "gpr", "iiq", "jxs", "k25", "kdc", "mdc", "mef", "mos", "mrw", "nef", "nrw", "orf", "pef", "ptx", "pxn", "r3d",
    "raf", "raw", "rw2", "rwl", "rwz", "sr2", "srf", "srw", "tco", "x3f",
];

const DNG: &str = "dng";

/// One file selected for import.
///
/// The `hash` is assigned once, when the item is created, and identifies the
/// item in progress events and reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportItem {
    pub source: PathBuf,
    /// Day the photo was taken, if known.
    pub captured_at: Option<Date>,
    pub hash: String,
}

impl ImportItem {
    pub fn new(source: impl Into<PathBuf>, captured_at: Option<Date>, hash: impl Into<String>) -> Self {
        Self { source: source.into(), captured_at, hash: hash.into() }
    }

    /// Builds an item whose identifier is derived from its path rather than
    /// its content. Use [`describe`](crate::describe) to hash the content.
    pub fn from_path(source: impl Into<PathBuf>, captured_at: Option<Date>) -> Self {
        let source = source.into();
        let hash = blake3::hash(source.as_os_str().as_encoded_bytes()).to_hex().to_string();
        Self { source, captured_at, hash }
    }
}

/// Allow-list of RAW file extensions.
///
/// Files with one of these extensions are eligible for DNG conversion. DNG
/// files are always importable but are never converted again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFormats {
    extensions: BTreeSet<String>,
}

impl Default for RawFormats {
    fn default() -> Self {
        Self::new(DEFAULT_RAW_EXTENSIONS)
    }
}

impl RawFormats {
    /// Extensions are matched case-insensitively; a leading dot is ignored.
    pub fn new(extensions: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext != DNG)
            .collect();
        Self { extensions }
    }

    /// Whether the converter should be run on `path`.
    pub fn is_convertible(&self, path: &Path) -> bool {
        extension(path).is_some_and(|ext| self.extensions.contains(&ext))
    }

    /// Whether `path` is a photo this importer picks up at all.
    pub fn is_importable(&self, path: &Path) -> bool {
        extension(path).is_some_and(|ext| ext == DNG || self.extensions.contains(&ext))
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase)
}
