//! Studio configuration module.
//!
//! Handles loading, validating, and merging `studio.toml`. Stock defaults are
//! the base layer; a user file overrides just the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [history]
//! max_items = 5                   # Most recent artifacts kept
//! slot = "imagen_studio_history"  # Name of the persisted slot
//! quota_bytes = 5242880           # Size limit of the storage medium
//! store_dir = ".imagen-studio"    # Directory holding slot files
//!
//! [watermark]
//! text = "TdAnimator"
//! effect = "none"                 # none, outline, shadow, glow, emboss, vintage, neon
//! opacity = 70                    # 0-100
//! position = "bottomRight"        # topLeft, topRight, bottomLeft, bottomRight, center, tile
//! size = "medium"                 # small, medium, large, extraLarge
//! tile_angle_deg = -25.0          # Grid rotation for position = "tile"
//!
//! [output]
//! jpeg_quality = 92               # 1-100
//! max_surface_pixels = 268435456  # Largest surface the rasterizer allocates
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{
    DEFAULT_TILE_ANGLE_DEG, WatermarkEffect, WatermarkPosition, WatermarkSize, WatermarkSpec,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Studio configuration loaded from `studio.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudioConfig {
    pub history: HistoryConfig,
    pub watermark: WatermarkConfig,
    pub output: OutputConfig,
}

impl StudioConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let history = &self.history;
        if history.max_items == 0 {
            return Err(ConfigError::Validation(
                "history.max_items must be at least 1".into(),
            ));
        }
        if history.quota_bytes == 0 {
            return Err(ConfigError::Validation(
                "history.quota_bytes must be non-zero".into(),
            ));
        }
        if history.slot.is_empty()
            || !history
                .slot
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Validation(format!(
                "history.slot {:?} may only contain letters, digits, '_' and '-'",
                history.slot
            )));
        }
        if self.watermark.opacity > 100 {
            return Err(ConfigError::Validation(format!(
                "watermark.opacity must be 0-100, got {}",
                self.watermark.opacity
            )));
        }
        if !self.watermark.tile_angle_deg.is_finite() {
            return Err(ConfigError::Validation(
                "watermark.tile_angle_deg must be a finite number".into(),
            ));
        }
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(ConfigError::Validation(format!(
                "output.jpeg_quality must be 1-100, got {}",
                self.output.jpeg_quality
            )));
        }
        if self.output.max_surface_pixels == 0 {
            return Err(ConfigError::Validation(
                "output.max_surface_pixels must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Where and how much history is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    pub max_items: usize,
    pub slot: String,
    pub quota_bytes: usize,
    /// Directory for slot files, relative to the working directory.
    pub store_dir: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_items: crate::history::DEFAULT_MAX_ITEMS,
            slot: crate::history::DEFAULT_SLOT.to_string(),
            quota_bytes: 5 * 1024 * 1024,
            store_dir: ".imagen-studio".to_string(),
        }
    }
}

/// Default watermark applied by `edit` and restored into a fresh session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    pub text: String,
    pub effect: WatermarkEffect,
    pub opacity: u8,
    pub position: WatermarkPosition,
    pub size: WatermarkSize,
    pub tile_angle_deg: f32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: "TdAnimator".to_string(),
            effect: WatermarkEffect::default(),
            opacity: 70,
            position: WatermarkPosition::default(),
            size: WatermarkSize::default(),
            tile_angle_deg: DEFAULT_TILE_ANGLE_DEG,
        }
    }
}

impl WatermarkConfig {
    pub fn spec(&self) -> WatermarkSpec {
        WatermarkSpec {
            text: self.text.clone(),
            effect: self.effect,
            opacity_percent: self.opacity,
            position: self.position,
            size: self.size,
            tile_angle_deg: self.tile_angle_deg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub jpeg_quality: u8,
    pub max_surface_pixels: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 92,
            max_surface_pixels: crate::imaging::raster_backend::DEFAULT_MAX_SURFACE_PIXELS,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(StudioConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<StudioConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: StudioConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `path` over stock defaults. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<StudioConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `studio.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Imagen Studio Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# History
# ---------------------------------------------------------------------------
[history]
# How many recent artifacts are kept, newest first.
max_items = 5

# Name of the slot the history list is stored under.
slot = "imagen_studio_history"

# Total bytes the storage medium may hold. When the list does not fit,
# the oldest entries are dropped from the persisted copy until it does.
quota_bytes = 5242880

# Directory holding one JSON file per slot.
store_dir = ".imagen-studio"

# ---------------------------------------------------------------------------
# Watermark
# ---------------------------------------------------------------------------
[watermark]
text = "TdAnimator"

# One of: none, outline, shadow, glow, emboss, vintage, neon
effect = "none"

# 0 = invisible, 100 = opaque
opacity = 70

# One of: topLeft, topRight, bottomLeft, bottomRight, center, tile
position = "bottomRight"

# One of: small, medium, large, extraLarge
size = "medium"

# Rotation in degrees of the repeated grid used by position = "tile".
tile_angle_deg = -25.0

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# JPEG encoding quality (1 = worst, 100 = best). Ignored for PNG.
jpeg_quality = 92

# Largest drawing surface (width * height) the rasterizer will allocate.
max_surface_pixels = 268435456
"##
}
