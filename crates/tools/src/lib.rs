//! Wrappers around the external programs the importer delegates to.
//!
//! - [`DngConverter`] runs Adobe DNG Converter (natively, or through a
//!   launcher such as Wine) to turn RAW files into DNG.
//! - [`ExifTool`] reads the shot date of a photo.
//!
//! Neither tool is reimplemented here; both are black-box subprocesses with a
//! bounded wall-clock timeout. The conversion side is exposed through the
//! [`Converter`] trait so that callers (and tests) can swap implementations.

mod dng;
pub mod error;
mod exif;
#[cfg(feature = "mock")]
mod mock;
mod process;
mod settings;

pub use crate::dng::DngConverter;
pub use crate::exif::{ExifTool, parse_shot_date};
#[cfg(feature = "mock")]
pub use crate::mock::MockConverter;
pub use crate::settings::{ConversionMethod, DngSettings, JpegPreviewSize};

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default wall-clock limit for a single external tool invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

pub type ConverterHandle = Arc<dyn Converter + Send + Sync>;

/// A RAW to DNG converter.
///
/// Implementations write the converted file somewhere inside `output_dir` and
/// return its path. Moving the file to its final location (and verifying it)
/// is the caller's job.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Used for logging only.
    fn name(&self) -> &str;

    /// Whether the converter can currently be invoked.
    async fn is_available(&self) -> bool;

    /// Convert `source`, writing the result into `output_dir`.
    async fn convert(&self, source: &Path, output_dir: &Path, settings: &DngSettings) -> Result<PathBuf>;
}

/// The file name a converter produces for `source`: same stem, `.dng`
/// extension.
///
/// Only the last extension is replaced, so `IMG.0001.CR2` becomes
/// `IMG.0001.dng`.
pub fn dng_file_name(source: &Path) -> Option<std::ffi::OsString> {
    let mut name = source.file_stem()?.to_os_string();
    name.push(".dng");
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/card/DCIM/IMG_0001.CR2", Some("IMG_0001.dng"))]
    #[case("IMG.0001.NEF", Some("IMG.0001.dng"))]
    #[case("noext", Some("noext.dng"))]
    #[case("/", None)]
    fn test_dng_file_name(#[case] source: &str, #[case] expected: Option<&str>) {
        let name = dng_file_name(Path::new(source));
        assert_eq!(name.as_deref().and_then(|n| n.to_str()), expected);
    }
}
