use crate::error::{ErrorKind, Result};
use crate::{Converter, DEFAULT_TIMEOUT, DngSettings, dng_file_name, process};
use async_trait::async_trait;
use exn::OptionExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::instrument;

const MACOS_APP: &str = "/Applications/Adobe DNG Converter.app/Contents/MacOS/Adobe DNG Converter";
const WINDOWS_EXE: &str = r"Adobe\Adobe DNG Converter\Adobe DNG Converter.exe";
const WINE_EXE: &str = "drive_c/Program Files/Adobe/Adobe DNG Converter/Adobe DNG Converter.exe";

/// How the converter executable gets started.
#[derive(Clone, Debug)]
enum Program {
    /// A directly executable binary.
    Binary { path: PathBuf },
    /// An executable started through a launcher, e.g. the Windows build
    /// running under Wine.
    Wrapped { launcher: PathBuf, program: PathBuf },
}

/// Adobe DNG Converter, invoked once per file.
///
/// The converter is started as `<converter> -mp <settings> -d <output_dir> <source>`
/// and writes `<output_dir>/<source stem>.dng`.
#[derive(Clone, Debug)]
pub struct DngConverter {
    program: Program,
    timeout: Duration,
}
impl DngConverter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { program: Program::Binary { path: path.into() }, timeout: DEFAULT_TIMEOUT }
    }

    pub fn wrapped(launcher: impl Into<PathBuf>, program: impl Into<PathBuf>) -> Self {
        Self {
            program: Program::Wrapped { launcher: launcher.into(), program: program.into() },
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Looks for the converter: the `configured` path first, then the
    /// platform's default install location, then `PATH`, then a Wine prefix.
    pub fn discover(configured: Option<&Path>) -> Result<Self> {
        if let Some(path) = configured {
            if path.is_file() {
                return Ok(Self::new(path));
            }
            tracing::warn!(
                path = %path.display(),
                "Configured DNG converter does not exist; searching default locations"
            );
        }
        let mut candidates = vec![PathBuf::from(MACOS_APP)];
        for var in ["ProgramFiles", "ProgramFiles(x86)"] {
            if let Some(dir) = std::env::var_os(var) {
                candidates.push(PathBuf::from(dir).join(WINDOWS_EXE));
            }
        }
        if let Some(path) = candidates.into_iter().find(|p| p.is_file()) {
            return Ok(Self::new(path));
        }
        for exe in ["Adobe DNG Converter", "dngconverter", "dng-converter"] {
            if let Ok(path) = which::which(exe) {
                return Ok(Self::new(path));
            }
        }
        tracing::info!("DNG converter executable not found in default locations or PATH");
        if let Ok(wine) = which::which("wine") {
            tracing::trace!(wine = %wine.display(), "Discovered Wine on system; searching prefix");
            let prefix = std::env::var_os("WINEPREFIX")
                .map(PathBuf::from)
                .or_else(|| directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".wine")));
            if let Some(program) = prefix.map(|p| p.join(WINE_EXE)).filter(|p| p.is_file()) {
                return Ok(Self::wrapped(wine, program));
            }
        } else {
            tracing::info!("Wine not found; skipping Windows converter checks.");
        }
        exn::bail!(ErrorKind::ConverterNotFound);
    }

    fn command(&self) -> Command {
        match &self.program {
            Program::Binary { path } => Command::new(path),
            Program::Wrapped { launcher, program } => {
                let mut command = Command::new(launcher);
                command.arg(program);
                command
            },
        }
    }
}

#[async_trait]
impl Converter for DngConverter {
    fn name(&self) -> &str {
        "adobe-dng-converter"
    }

    async fn is_available(&self) -> bool {
        let paths: Vec<&Path> = match &self.program {
            Program::Binary { path } => vec![path.as_path()],
            Program::Wrapped { launcher, program } => vec![launcher.as_path(), program.as_path()],
        };
        for path in paths {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return false;
            }
        }
        true
    }

    #[instrument(skip_all, fields(source = %source.display()))]
    async fn convert(&self, source: &Path, output_dir: &Path, settings: &DngSettings) -> Result<PathBuf> {
        let expected = output_dir.join(dng_file_name(source).ok_or_raise(|| ErrorKind::Io)?);
        let mut command = self.command();
        command.arg("-mp").args(settings.args()).arg("-d").arg(output_dir).arg(source);
        tracing::debug!(args = %settings.to_arg_string(), "Converting to DNG");

        let output = process::run(command, self.timeout).await?;
        if let Err(e) = process::check(&output) {
            tracing::warn!(
                stdout = %String::from_utf8_lossy(&output.stdout).trim(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "DNG converter failed"
            );
            return Err(e);
        }
        if !tokio::fs::try_exists(&expected).await.unwrap_or(false) {
            exn::bail!(ErrorKind::OutputMissing(expected));
        }
        tracing::debug!(output = %expected.display(), "DNG conversion completed");
        Ok(expected)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Stand-in for the real converter: copies the source to `<-d dir>/<stem>.dng`
    /// and records its arguments, unless told to fail via `FAKE_EXIT`.
    const FAKE_CONVERTER: &str = r#"
out=""
while [ $# -gt 1 ]; do
    case "$1" in
        -d) shift; out="$1" ;;
        *) echo "$1" >> "$ARGS_LOG" ;;
    esac
    shift
done
src="$1"
name=$(basename "$src")
if [ -n "$FAKE_EXIT" ]; then exit "$FAKE_EXIT"; fi
cp "$src" "$out/${name%.*}.dng"
"#;

    fn fake(dir: &Path, exit: Option<i32>) -> DngConverter {
        let script = dir.join("fake-converter.sh");
        let log = dir.join("args.log");
        let mut body = format!("ARGS_LOG='{}'\n", log.display());
        if let Some(code) = exit {
            body.push_str(&format!("FAKE_EXIT={code}\n"));
        }
        body.push_str(FAKE_CONVERTER);
        std::fs::write(&script, body).unwrap();
        DngConverter::wrapped("/bin/sh", script).with_timeout(Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_convert_produces_dng() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("IMG_0001.CR2");
        std::fs::write(&source, b"raw data").unwrap();
        let out = temp_dir.path().join("out");
        std::fs::create_dir(&out).unwrap();

        let converter = fake(temp_dir.path(), None);
        assert!(converter.is_available().await);
        let settings = DngSettings { embed_original_raw_file: true, ..Default::default() };
        let produced = converter.convert(&source, &out, &settings).await.unwrap();
        assert_eq!(produced, out.join("IMG_0001.dng"));
        assert_eq!(std::fs::read(&produced).unwrap(), b"raw data");

        let args = std::fs::read_to_string(temp_dir.path().join("args.log")).unwrap();
        let args: Vec<_> = args.lines().collect();
        assert_eq!(args, vec!["-mp", "-p1", "-c", "-e"]);
    }

    #[tokio::test]
    async fn test_convert_non_zero_exit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("IMG_0001.NEF");
        std::fs::write(&source, b"raw data").unwrap();

        let converter = fake(temp_dir.path(), Some(2));
        let err = converter.convert(&source, temp_dir.path(), &DngSettings::default()).await.unwrap_err();
        assert_eq!(err.exit_code(), Some(2));
        assert!(!temp_dir.path().join("IMG_0001.dng").exists());
    }

    #[tokio::test]
    async fn test_unavailable_binary() {
        let converter = DngConverter::new("/definitely/not/installed");
        assert!(!converter.is_available().await);
    }

    #[test]
    fn test_discover_prefers_configured_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let exe = temp_dir.path().join("converter");
        std::fs::write(&exe, b"").unwrap();
        let converter = DngConverter::discover(Some(&exe)).unwrap();
        assert!(matches!(converter.program, Program::Binary { ref path } if path == &exe));
    }
}
