//! Scriptable converter for testing.

use crate::error::{ErrorKind, Result};
use crate::{Converter, DngSettings, dng_file_name};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-process stand-in for the DNG converter.
///
/// "Converts" by writing `DNG:` followed by the source bytes to
/// `<output_dir>/<stem>.dng`. Per-file delays and exit codes can be scripted
/// by source file name, and the converter records how many conversions ran
/// and the highest number that ran at the same time.
///
/// # Examples
///
/// ```
/// use photo_import_tools::MockConverter;
/// use std::time::Duration;
///
/// let converter = MockConverter::new()
///     .with_delay("slow.CR2", Duration::from_millis(50))
///     .failing("broken.CR2", 1);
/// assert_eq!(converter.calls(), 0);
/// ```
#[derive(Default)]
pub struct MockConverter {
    unavailable: bool,
    delays: HashMap<OsString, Duration>,
    failures: HashMap<OsString, i32>,
    empty_output: Vec<OsString>,
    consumed: Vec<OsString>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    settings: Mutex<Vec<DngSettings>>,
}

impl MockConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports itself as not installed.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn with_delay(mut self, file_name: impl Into<OsString>, delay: Duration) -> Self {
        self.delays.insert(file_name.into(), delay);
        self
    }

    /// Makes conversions of `file_name` exit with `code`.
    pub fn failing(mut self, file_name: impl Into<OsString>, code: i32) -> Self {
        self.failures.insert(file_name.into(), code);
        self
    }

    /// Makes conversions of `file_name` "succeed" but write an empty file.
    pub fn with_empty_output(mut self, file_name: impl Into<OsString>) -> Self {
        self.empty_output.push(file_name.into());
        self
    }

    /// Makes conversions of `file_name` remove the source once the output is
    /// written, as if another process had moved it away.
    pub fn consuming_source(mut self, file_name: impl Into<OsString>) -> Self {
        self.consumed.push(file_name.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of conversions that were running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Settings received, in call order.
    pub fn received_settings(&self) -> Vec<DngSettings> {
        self.settings.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

struct InFlight<'a>(&'a AtomicUsize);
impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn is_available(&self) -> bool {
        !self.unavailable
    }

    async fn convert(&self, source: &Path, output_dir: &Path, settings: &DngSettings) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(running, Ordering::SeqCst);
        if let Ok(mut received) = self.settings.lock() {
            received.push(settings.clone());
        }

        let name = source.file_name().ok_or_raise(|| ErrorKind::Io)?.to_os_string();
        if let Some(delay) = self.delays.get(&name) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(code) = self.failures.get(&name) {
            exn::bail!(ErrorKind::Failed(*code));
        }
        let output = output_dir.join(dng_file_name(source).ok_or_raise(|| ErrorKind::Io)?);
        let contents = if self.empty_output.contains(&name) {
            Vec::new()
        } else {
            let mut contents = b"DNG:".to_vec();
            contents.extend(tokio::fs::read(source).await.or_raise(|| ErrorKind::Io)?);
            contents
        };
        tokio::fs::write(&output, contents).await.or_raise(|| ErrorKind::Io)?;
        if self.consumed.contains(&name) {
            tokio::fs::remove_file(source).await.or_raise(|| ErrorKind::Io)?;
        }
        Ok(output)
    }
}
