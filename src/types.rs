//! Shared types used across the pipeline, history and app state.
//!
//! [`GeneratedArtifact`] is the record persisted in the history slot. Its
//! serialized field names are stable: existing history slots must keep
//! loading after upgrades.

use crate::imaging::{WatermarkEffect, WatermarkPosition, WatermarkSize};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Encodings the studio reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MimeType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[default]
    #[serde(rename = "image/png")]
    Png,
}

impl MimeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// File extension used for downloads.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
        }
    }

    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            _ => None,
        }
    }

    /// Guess from a file extension (`jpg`, `jpeg`, `png`, any case).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MimeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "image/jpeg" | "image/jpg" | "jpeg" | "jpg" => Ok(Self::Jpeg),
            "image/png" | "png" => Ok(Self::Png),
            other => Err(format!("unsupported MIME type: {other}")),
        }
    }
}

/// Aspect ratio requested from the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "9:16")]
    Tall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "standard")]
    Standard,
    #[default]
    #[serde(rename = "hd")]
    Hd,
    #[serde(rename = "4k")]
    Uhd4k,
    #[serde(rename = "8k")]
    Uhd8k,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StylePreset {
    #[default]
    None,
    Cinematic,
    Anime,
    Photographic,
    DigitalArt,
    ComicBook,
    PixelArt,
    #[serde(rename = "3d-model")]
    ThreeDModel,
    OilPainting,
    Watercolor,
    Cyberpunk,
    Steampunk,
    Sketch,
    LowPoly,
    Vintage,
    Fantasy,
    Origami,
    NeonPunk,
}

fn default_watermark_opacity() -> u8 {
    70
}

/// One generated (or edited) image with the settings it was made with.
///
/// Immutable once stored; edits produce a new artifact with a new
/// `timestamp`, which doubles as the identity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifact {
    /// Encoded image bytes, stored as base64 text.
    #[serde(rename = "base64", with = "base64_bytes")]
    pub image_data: Vec<u8>,
    pub mime_type: MimeType,
    pub prompt: String,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_preset: Option<StylePreset>,
    #[serde(default)]
    pub watermark_text_effect: WatermarkEffect,
    #[serde(default = "default_watermark_opacity")]
    pub watermark_opacity: u8,
    #[serde(default)]
    pub watermark_position: WatermarkPosition,
    #[serde(default)]
    pub watermark_size: WatermarkSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lighting: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl GeneratedArtifact {
    /// Artifact with default settings around already-encoded bytes.
    pub fn new(
        image_data: Vec<u8>,
        mime_type: MimeType,
        prompt: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            image_data,
            mime_type,
            prompt: prompt.into(),
            timestamp,
            aspect_ratio: AspectRatio::default(),
            resolution: None,
            style_preset: None,
            watermark_text_effect: WatermarkEffect::default(),
            watermark_opacity: default_watermark_opacity(),
            watermark_position: WatermarkPosition::default(),
            watermark_size: WatermarkSize::default(),
            lighting: None,
            camera: None,
            mood: None,
            seed: None,
            model: None,
        }
    }

    pub fn id(&self) -> i64 {
        self.timestamp
    }

    /// `tdanimator-<timestamp>.<ext>`
    pub fn download_name(&self) -> String {
        format!("tdanimator-{}.{}", self.timestamp, self.mime_type.extension())
    }

    /// `tdanimator-edited-<timestamp>.<ext>`
    pub fn edited_download_name(&self) -> String {
        format!(
            "tdanimator-edited-{}.{}",
            self.timestamp,
            self.mime_type.extension()
        )
    }
}

/// Smallest timestamp `>= now_ms` not already used by `taken`.
///
/// Items created in the same millisecond (batch renders) get consecutive
/// keys instead of colliding.
pub fn unique_timestamp(now_ms: i64, taken: &[i64]) -> i64 {
    let mut candidate = now_ms;
    while taken.contains(&candidate) {
        candidate += 1;
    }
    candidate
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(de::Error::custom)
    }
}
