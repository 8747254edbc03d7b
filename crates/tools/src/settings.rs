use crate::error::{Error, ErrorKind};
use std::str::FromStr;

/// Size of the JPEG preview embedded in the DNG.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(rename_all = "camelCase"))]
pub enum JpegPreviewSize {
    None,
    #[default]
    Medium,
    FullSize,
}
impl JpegPreviewSize {
    fn flag(&self) -> &'static str {
        match self {
            Self::None => "-p0",
            Self::Medium => "-p1",
            Self::FullSize => "-p2",
        }
    }
}
impl FromStr for JpegPreviewSize {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" => Ok(Self::None),
            "medium" => Ok(Self::Medium),
            "fullSize" | "full-size" | "full" => Ok(Self::FullSize),
            other => exn::bail!(ErrorKind::InvalidSetting(other.to_string())),
        }
    }
}

/// How the converter treats the sensor data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(rename_all = "camelCase"))]
pub enum ConversionMethod {
    /// Keep the mosaic (raw) sensor data.
    #[default]
    Preserve,
    /// Demosaic into linear image data.
    Linear,
}
impl FromStr for ConversionMethod {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "preserve" => Ok(Self::Preserve),
            "linear" => Ok(Self::Linear),
            other => exn::bail!(ErrorKind::InvalidSetting(other.to_string())),
        }
    }
}

/// Options passed to the DNG converter for every file of a batch.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(default))]
pub struct DngSettings {
    pub jpeg_preview_size: JpegPreviewSize,
    /// Lossless compression (`-c`) when set, otherwise uncompressed (`-u`).
    pub compressed_lossless: bool,
    pub image_conversion_method: ConversionMethod,
    pub embed_original_raw_file: bool,
}
impl Default for DngSettings {
    fn default() -> Self {
        Self {
            jpeg_preview_size: JpegPreviewSize::default(),
            compressed_lossless: true,
            image_conversion_method: ConversionMethod::default(),
            embed_original_raw_file: false,
        }
    }
}
impl DngSettings {
    /// Converter flags in a fixed order: preview size, compression, linear,
    /// embed. Disabled optional flags are left out entirely.
    pub fn args(&self) -> Vec<&'static str> {
        let mut args = vec![self.jpeg_preview_size.flag()];
        args.push(if self.compressed_lossless { "-c" } else { "-u" });
        if self.image_conversion_method == ConversionMethod::Linear {
            args.push("-l");
        }
        if self.embed_original_raw_file {
            args.push("-e");
        }
        args
    }

    /// [`args`](Self::args) joined with single spaces.
    pub fn to_arg_string(&self) -> String {
        self.args().join(" ")
    }
}
