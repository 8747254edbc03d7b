//! Destination planning.
//!
//! Every file of a batch gets its destination from a [`PathPlanner`]:
//! `<destination root>/<sub-folder>/<file name>`, where the sub-folder comes
//! from the photo's capture date and the configured [`SubFolderPattern`], and
//! the file name is the source's, with a `.dng` extension when the file is
//! going to be converted.
//!
//! A destination that already exists on disk, or that the planner has already
//! handed out, is never reused: `-1`, `-2`, ... is inserted before the
//! extension until the name is free.

mod path;
mod pattern;
mod template;

pub use self::pattern::SubFolderPattern;
pub use self::template::FolderTemplate;

use crate::transfer::error::{ErrorKind, Result};
use crate::{ImportItem, ImportOptions, RawFormats};
use exn::OptionExt;
use photo_import_tools::dng_file_name;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Folder used by date-based patterns for photos without a capture date.
pub const UNKNOWN_DATE_FOLDER: &str = "unknown-date";

/// Highest collision suffix tried before giving up on a file.
const MAX_SUFFIX: u32 = 9_999;

/// Resolves and claims destination paths for one batch.
///
/// Resolution is deterministic: given the same destination tree and the same
/// earlier claims, the same item always gets the same path. Claims are
/// recorded under a single lock so that no two items are ever handed the same
/// destination, even when resolved concurrently.
#[derive(Debug, Default)]
pub struct PathPlanner {
    raw_formats: RawFormats,
    claimed: Mutex<HashSet<PathBuf>>,
}

impl PathPlanner {
    pub fn new(raw_formats: RawFormats) -> Self {
        Self { raw_formats, claimed: Mutex::default() }
    }

    /// Whether `item` is converted (rather than copied) under `options`.
    pub fn converts(&self, item: &ImportItem, options: &ImportOptions) -> bool {
        options.convert_to_dng && self.raw_formats.is_convertible(&item.source)
    }

    /// Claims the destination for `item`.
    ///
    /// # Errors
    /// [`ErrorKind::Plan`] when the source has no file name or every suffix up
    /// to the limit is taken.
    pub async fn resolve(&self, item: &ImportItem, options: &ImportOptions) -> Result<PathBuf> {
        let file_name = match self.converts(item, options) {
            true => dng_file_name(&item.source),
            false => item.source.file_name().map(OsStr::to_os_string),
        };
        self.claim(Self::directory(item, options), file_name).await
    }

    /// Claims a destination that keeps the source's own extension, for files
    /// that fall back to a plain copy after a failed conversion.
    pub async fn resolve_original(&self, item: &ImportItem, options: &ImportOptions) -> Result<PathBuf> {
        let file_name = item.source.file_name().map(OsStr::to_os_string);
        self.claim(Self::directory(item, options), file_name).await
    }

    /// Directory `item` is placed in, before collision handling.
    pub fn directory(item: &ImportItem, options: &ImportOptions) -> PathBuf {
        match options.sub_folder.folder(item.captured_at) {
            Some(folder) => options.destination_root.join(folder),
            None => options.destination_root.clone(),
        }
    }

    async fn claim(&self, directory: PathBuf, file_name: Option<OsString>) -> Result<PathBuf> {
        let file_name = file_name.ok_or_raise(|| ErrorKind::Plan)?;
        let mut claimed = self.claimed.lock().await;
        for attempt in 0..=MAX_SUFFIX {
            let candidate = directory.join(with_suffix(&file_name, attempt));
            if claimed.contains(&candidate) || occupied(&candidate).await {
                continue;
            }
            if attempt > 0 {
                tracing::debug!(destination = %candidate.display(), "Destination taken; using suffixed name");
            }
            claimed.insert(candidate.clone());
            return Ok(candidate);
        }
        tracing::error!(directory = %directory.display(), file = ?file_name, "No free destination name");
        exn::bail!(ErrorKind::Plan)
    }
}

/// Anything at `path` (including a dangling symlink) counts as taken. So does
/// a path whose existence cannot be checked.
async fn occupied(path: &Path) -> bool {
    match tokio::fs::symlink_metadata(path).await {
        Ok(_) => true,
        Err(e) => e.kind() != std::io::ErrorKind::NotFound,
    }
}

/// `IMG_0001.CR2` with suffix 2 becomes `IMG_0001-2.CR2`.
fn with_suffix(file_name: &OsStr, suffix: u32) -> OsString {
    if suffix == 0 {
        return file_name.to_os_string();
    }
    let path = Path::new(file_name);
    let mut name = path.file_stem().unwrap_or(file_name).to_os_string();
    name.push(format!("-{suffix}"));
    if let Some(extension) = path.extension() {
        name.push(".");
        name.push(extension);
    }
    name
}
