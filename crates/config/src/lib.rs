//! Configuration for the photo importer.
//!
//! Settings are layered with [figment], later layers overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A configuration file: either the one passed explicitly, or
//!    `config.toml`, `config.yaml` and `config.json` (in that order) from the
//!    platform's configuration directory (see [`config_dir`]).
//! 3. Environment variables prefixed with `PHOTO_IMPORT_`, with nested keys
//!    separated by `__`, e.g. `PHOTO_IMPORT_ENGINE__CONCURRENCY=8`.
//!
//! ```toml
//! [import]
//! location = "/Volumes/Photos/Library"
//! sub_folder_pattern = "custom"
//! custom_sub_folder_name = "{{ year }}/{{ month }}-{{ month_name }}"
//! convert_to_dng = true
//!
//! [dng]
//! jpeg_preview_size = "fullSize"
//! image_conversion_method = "linear"
//!
//! [engine]
//! concurrency = 2
//! conversion_fallback = "copy"
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use photo_import_library::{
    ConversionFallback, Context, DEFAULT_CONCURRENCY, DEFAULT_RAW_EXTENSIONS, ImportOptions, RawFormats,
    SubFolderPattern,
};
use photo_import_tools::{ConverterHandle, DEFAULT_TIMEOUT, DngConverter, DngSettings, ExifTool};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const APP_NAME: &str = "photo-import";
const ENV_PREFIX: &str = "PHOTO_IMPORT_";
const CONFIG_FILES: [&str; 3] = ["config.toml", "config.yaml", "config.json"];

/// Platform configuration directory, e.g. `~/.config/photo-import` on Linux.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub import: ImportConfig,
    pub dng: DngSettings,
    pub engine: EngineConfig,
}

/// What a batch does with the selected photos.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Destination root.
    pub location: Option<PathBuf>,
    /// One of [`SubFolderPattern::IDS`].
    pub sub_folder_pattern: String,
    /// Folder name (or template) for the `custom` pattern.
    pub custom_sub_folder_name: Option<String>,
    pub convert_to_dng: bool,
    pub delete_original: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            location: None,
            sub_folder_pattern: SubFolderPattern::default().id().to_string(),
            custom_sub_folder_name: None,
            convert_to_dng: false,
            delete_original: false,
        }
    }
}

/// How the engine runs, independent of any one batch.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub concurrency: usize,
    pub conversion_timeout_secs: u64,
    /// `fail` or `copy`.
    pub conversion_fallback: String,
    /// Explicit converter executable; searched for when unset.
    pub converter_path: Option<PathBuf>,
    /// Explicit exiftool executable; searched for on `PATH` when unset.
    pub exiftool_path: Option<PathBuf>,
    /// RAW extensions eligible for conversion.
    pub raw_extensions: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            conversion_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            conversion_fallback: ConversionFallback::default().to_string(),
            converter_path: None,
            exiftool_path: None,
            raw_extensions: DEFAULT_RAW_EXTENSIONS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Config {
    /// The layered sources, without extracting them. With `explicit`, that
    /// file replaces the ones from [`config_dir`].
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match explicit {
            Some(path) => figment = merge_file(figment, path),
            None => {
                if let Some(dir) = config_dir() {
                    for name in CONFIG_FILES {
                        figment = merge_file(figment, &dir.join(name));
                    }
                }
            },
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads and validates the configuration.
    ///
    /// # Errors
    /// [`ErrorKind::Invalid`] if `explicit` does not exist or the result fails
    /// [`validate`](Self::validate); [`ErrorKind::Load`] if a source cannot
    /// be parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit.filter(|p| !p.is_file()) {
            exn::bail!(ErrorKind::Invalid(format!("config file not found: {}", path.display())));
        }
        Self::from_figment(Self::figment(explicit))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Checks everything that can be checked without touching the disk.
    pub fn validate(&self) -> Result<()> {
        if self.engine.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("engine.concurrency must be at least 1".into()));
        }
        if self.engine.conversion_timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("engine.conversion_timeout_secs must be at least 1".into()));
        }
        self.fallback()?;
        self.sub_folder()?;
        Ok(())
    }

    pub fn sub_folder(&self) -> Result<SubFolderPattern> {
        let import = &self.import;
        SubFolderPattern::from_id(&import.sub_folder_pattern, import.custom_sub_folder_name.as_deref())
            .or_raise(|| ErrorKind::Invalid(format!("import.sub_folder_pattern: {}", import.sub_folder_pattern)))
    }

    pub fn fallback(&self) -> Result<ConversionFallback> {
        self.engine
            .conversion_fallback
            .parse::<ConversionFallback>()
            .or_raise(|| ErrorKind::Invalid(format!("engine.conversion_fallback: {}", self.engine.conversion_fallback)))
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.conversion_timeout_secs)
    }

    /// Options for one batch. `destination` overrides `import.location`.
    pub fn import_options(&self, destination: Option<PathBuf>) -> Result<ImportOptions> {
        let root = destination
            .or_else(|| self.import.location.clone())
            .ok_or_raise(|| ErrorKind::Invalid("no destination: set import.location".into()))?;
        let mut options =
            ImportOptions::new(root, self.sub_folder()?).with_delete_original(self.import.delete_original);
        if self.import.convert_to_dng {
            options = options.with_conversion(self.dng.clone());
        }
        Ok(options)
    }

    /// Builds the engine context, looking for the external tools. A tool that
    /// cannot be found is left unset (and logged), not an error.
    pub fn context(&self) -> Result<Context> {
        let timeout = self.conversion_timeout();
        let converter = match DngConverter::discover(self.engine.converter_path.as_deref()) {
            Ok(converter) => Some(Arc::new(converter.with_timeout(timeout)) as ConverterHandle),
            Err(e) => {
                tracing::info!(error = %*e, "DNG conversion unavailable");
                None
            },
        };
        let exiftool = match ExifTool::discover(self.engine.exiftool_path.as_deref()) {
            Ok(exiftool) => Some(exiftool.with_timeout(timeout)),
            Err(e) => {
                tracing::info!(error = %*e, "Capture dates unavailable; photos will be filed as undated");
                None
            },
        };
        Ok(Context::new()
            .with_converter(converter)
            .with_exiftool(exiftool)
            .with_raw_formats(RawFormats::new(&self.engine.raw_extensions))
            .with_concurrency(self.engine.concurrency)
            .with_fallback(self.fallback()?))
    }
}

/// Picks the provider from the file extension; anything unknown is read as TOML.
fn merge_file(figment: Figment, path: &Path) -> Figment {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => figment.merge(Toml::file(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_import_tools::{ConversionMethod, JpegPreviewSize};
    use rstest::rstest;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.concurrency, 4);
        assert_eq!(config.engine.conversion_timeout_secs, 300);
        assert_eq!(config.sub_folder().unwrap(), SubFolderPattern::Yyyymmdd);
        assert_eq!(config.fallback().unwrap(), ConversionFallback::Fail);
        assert_eq!(config.dng, DngSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(
            temp_dir.path(),
            "photo-import.toml",
            r#"
            [import]
            location = "/photos"
            sub_folder_pattern = "ddmmmyyyy"
            convert_to_dng = true

            [dng]
            jpeg_preview_size = "fullSize"
            image_conversion_method = "linear"

            [engine]
            concurrency = 2
            conversion_fallback = "copy"
            "#,
        );
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.import.location.as_deref(), Some(Path::new("/photos")));
        assert_eq!(config.sub_folder().unwrap(), SubFolderPattern::Ddmmmyyyy);
        assert_eq!(config.dng.jpeg_preview_size, JpegPreviewSize::FullSize);
        assert_eq!(config.dng.image_conversion_method, ConversionMethod::Linear);
        assert!(config.dng.compressed_lossless);
        assert_eq!(config.engine.concurrency, 2);
        assert_eq!(config.fallback().unwrap(), ConversionFallback::Copy);
        assert_eq!(config.engine.conversion_timeout_secs, 300);

        let options = config.import_options(None).unwrap();
        assert!(options.convert_to_dng);
        assert_eq!(options.dng_settings().to_arg_string(), "-p2 -c -l");
    }

    #[rstest]
    #[case("config.yaml", "import:\n  sub_folder_pattern: yymmdd\nengine:\n  concurrency: 8\n")]
    #[case("config.json", r#"{"import": {"sub_folder_pattern": "yymmdd"}, "engine": {"concurrency": 8}}"#)]
    fn test_other_formats(#[case] name: &str, #[case] contents: &str) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(temp_dir.path(), name, contents);
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.sub_folder().unwrap(), SubFolderPattern::Yymmdd);
        assert_eq!(config.engine.concurrency, 8);
    }

    #[test]
    fn test_later_layers_win() {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string("[engine]\nconcurrency = 2"))
            .merge(("engine.concurrency", 6));
        assert_eq!(Config::from_figment(figment).unwrap().engine.concurrency, 6);
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(temp_dir.path(), "config.toml", "[engine]\nconcurrency = \"lots\"");
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }

    #[rstest]
    #[case("[engine]\nconcurrency = 0")]
    #[case("[engine]\nconversion_timeout_secs = 0")]
    #[case("[engine]\nconversion_fallback = \"retry\"")]
    #[case("[import]\nsub_folder_pattern = \"mmddyy\"")]
    #[case("[import]\nsub_folder_pattern = \"custom\"")]
    fn test_invalid_values(#[case] contents: &str) {
        let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(contents));
        let err = Config::from_figment(figment).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_custom_pattern() {
        let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(
            "[import]\nsub_folder_pattern = \"custom\"\ncustom_sub_folder_name = \"{{ year }}/Shoot\"",
        ));
        let config = Config::from_figment(figment).unwrap();
        assert_eq!(config.sub_folder().unwrap().id(), "custom");
    }

    #[test]
    fn test_destination_override() {
        let mut config = Config::default();
        assert!(matches!(&*config.import_options(None).unwrap_err(), ErrorKind::Invalid(_)));
        config.import.location = Some(PathBuf::from("/photos"));
        let options = config.import_options(Some(PathBuf::from("/elsewhere"))).unwrap();
        assert_eq!(options.destination_root, Path::new("/elsewhere"));
        assert!(!options.convert_to_dng);
    }
}
