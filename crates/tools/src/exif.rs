use crate::error::{ErrorKind, Result};
use crate::{DEFAULT_TIMEOUT, process};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use time::{Date, Month};
use tokio::process::Command;
use tracing::instrument;

static EXIF_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{4}):(\d{2}):(\d{2})").unwrap());

/// `exiftool`, used to read when a photo was taken.
#[derive(Clone, Debug)]
pub struct ExifTool {
    path: PathBuf,
    timeout: Duration,
}
impl ExifTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), timeout: DEFAULT_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Uses the `configured` path if it exists, otherwise searches `PATH`.
    pub fn discover(configured: Option<&Path>) -> Result<Self> {
        if let Some(path) = configured.filter(|p| p.is_file()) {
            return Ok(Self::new(path));
        }
        match which::which("exiftool") {
            Ok(path) => Ok(Self::new(path)),
            Err(_) => exn::bail!(ErrorKind::ExifToolNotFound),
        }
    }

    /// Reads `DateTimeOriginal` from `file`.
    ///
    /// Returns `Ok(None)` when the tag is absent or unparseable; only a failed
    /// invocation is an error.
    #[instrument(skip_all, fields(file = %file.display()))]
    pub async fn shot_date(&self, file: &Path) -> Result<Option<Date>> {
        let mut command = Command::new(&self.path);
        command.args(["-DateTimeOriginal", "-s3"]).arg(file);
        let output = process::run(command, self.timeout).await?;
        process::check(&output)?;
        let date = parse_shot_date(&String::from_utf8_lossy(&output.stdout));
        if date.is_none() {
            tracing::debug!("No shot date found");
        }
        Ok(date)
    }
}

/// Extracts the first `YYYY:MM:DD` date from exiftool's output.
///
/// The time of day, sub-seconds and timezone (if any) are ignored.
pub fn parse_shot_date(output: &str) -> Option<Date> {
    let captures = EXIF_DATE.captures(output.trim())?;
    let year = captures[1].parse().ok()?;
    let month = Month::try_from(captures[2].parse::<u8>().ok()?).ok()?;
    let day = captures[3].parse().ok()?;
    Date::from_calendar_date(year, month, day).ok()
}
