//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the UI layer (which collects slider and toggle values)
//! and [`operations`](super::operations) (which plans the drawing and hands
//! it to a [`backend`](super::backend)).
//!
//! ## Types
//!
//! - [`AdjustmentParameters`]: color filters, each with an identity value.
//! - [`TransformParameters`]: quarter-turn rotation, flips, aspect crop, zoom.
//! - [`WatermarkSpec`]: text overlay: effect, opacity, position, size.
//!
//! Every numeric field is clamped into its domain by `clamped()`. The core
//! trusts callers to validate ranges; clamping only keeps out-of-range input
//! from producing garbage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Color adjustments applied as a single filter chain.
///
/// | Field | Domain | Identity |
/// |---|---|---|
/// | `brightness` | 0–200 % | 100 |
/// | `contrast` | 0–200 % | 100 |
/// | `saturation` | 0–200 % | 100 |
/// | `hue_rotate_deg` | −180–180 ° | 0 |
/// | `sepia` | 0–100 % | 0 |
/// | `blur_radius_px` | 0–20 px | 0 |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdjustmentParameters {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub hue_rotate_deg: f32,
    pub sepia: f32,
    pub blur_radius_px: f32,
}

impl AdjustmentParameters {
    pub const IDENTITY: Self = Self {
        brightness: 100.0,
        contrast: 100.0,
        saturation: 100.0,
        hue_rotate_deg: 0.0,
        sepia: 0.0,
        blur_radius_px: 0.0,
    };

    /// Copy with every field clamped into its domain. NaN falls back to identity.
    pub fn clamped(&self) -> Self {
        let id = Self::IDENTITY;
        Self {
            brightness: clamp_or(self.brightness, 0.0, 200.0, id.brightness),
            contrast: clamp_or(self.contrast, 0.0, 200.0, id.contrast),
            saturation: clamp_or(self.saturation, 0.0, 200.0, id.saturation),
            hue_rotate_deg: clamp_or(self.hue_rotate_deg, -180.0, 180.0, id.hue_rotate_deg),
            sepia: clamp_or(self.sepia, 0.0, 100.0, id.sepia),
            blur_radius_px: clamp_or(self.blur_radius_px, 0.0, 20.0, id.blur_radius_px),
        }
    }

    /// True when the color stage (everything except blur) is a no-op.
    pub fn is_color_identity(&self) -> bool {
        let c = self.clamped();
        c.brightness == 100.0
            && c.contrast == 100.0
            && c.saturation == 100.0
            && c.hue_rotate_deg == 0.0
            && c.sepia == 0.0
    }

    pub fn is_identity(&self) -> bool {
        self.is_color_identity() && self.clamped().blur_radius_px == 0.0
    }
}

impl Default for AdjustmentParameters {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

/// Clockwise quarter-turn rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Normalize any degree value mod 360 and snap to the nearest quarter turn.
    pub fn from_degrees(degrees: i32) -> Self {
        let normalized = degrees.rem_euclid(360);
        match ((normalized + 45) / 90) % 4 {
            0 => Self::None,
            1 => Self::Cw90,
            2 => Self::Cw180,
            _ => Self::Cw270,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Cw90 => 90,
            Self::Cw180 => 180,
            Self::Cw270 => 270,
        }
    }

    /// Whether the output canvas swaps width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::Cw90 | Self::Cw270)
    }
}

impl TryFrom<i32> for Rotation {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(Self::from_degrees(value))
    }
}

impl From<Rotation> for i32 {
    fn from(value: Rotation) -> Self {
        value.degrees()
    }
}

/// Target aspect ratio for the center crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CropAspect {
    #[default]
    #[serde(rename = "original")]
    Original,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "9:16")]
    Tall,
}

impl CropAspect {
    /// Ratio as `(width, height)`; `None` for [`CropAspect::Original`].
    pub fn ratio(self) -> Option<(u32, u32)> {
        match self {
            Self::Original => None,
            Self::Square => Some((1, 1)),
            Self::Wide => Some((16, 9)),
            Self::Standard => Some((4, 3)),
            Self::Tall => Some((9, 16)),
        }
    }
}

impl FromStr for CropAspect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "original" => Ok(Self::Original),
            "1:1" => Ok(Self::Square),
            "16:9" => Ok(Self::Wide),
            "4:3" => Ok(Self::Standard),
            "9:16" => Ok(Self::Tall),
            other => Err(format!("unknown crop aspect: {other}")),
        }
    }
}

/// Geometric transform applied after the color filters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformParameters {
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub crop_aspect: CropAspect,
    /// Centered zoom applied after the aspect crop. 1.0 = no zoom.
    pub zoom: f32,
}

impl TransformParameters {
    pub const IDENTITY: Self = Self {
        rotation: Rotation::None,
        flip_horizontal: false,
        flip_vertical: false,
        crop_aspect: CropAspect::Original,
        zoom: 1.0,
    };

    pub fn clamped(&self) -> Self {
        Self {
            zoom: if self.zoom.is_finite() {
                self.zoom.max(1.0)
            } else {
                1.0
            },
            ..*self
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY || self.clamped() == Self::IDENTITY
    }
}

impl Default for TransformParameters {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Text effect drawn for the watermark. Effects are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkEffect {
    #[default]
    None,
    Outline,
    Shadow,
    Glow,
    Emboss,
    Vintage,
    Neon,
}

/// Where the watermark is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
    Tile,
}

/// Relative watermark size; multiplies the width-proportional base font size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WatermarkSize {
    Small,
    #[default]
    Medium,
    Large,
    ExtraLarge,
}

impl WatermarkSize {
    pub fn multiplier(self) -> f32 {
        match self {
            Self::Small => 0.7,
            Self::Medium => 1.0,
            Self::Large => 1.3,
            Self::ExtraLarge => 1.6,
        }
    }
}

/// Default rotation of the tiled watermark grid, counter-clockwise.
pub const DEFAULT_TILE_ANGLE_DEG: f32 = -25.0;

/// Text overlay settings.
///
/// Empty or whitespace-only `text` means "no watermark".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatermarkSpec {
    pub text: String,
    pub effect: WatermarkEffect,
    /// 0–100. Zero draws nothing visible but is not an error.
    pub opacity_percent: u8,
    pub position: WatermarkPosition,
    pub size: WatermarkSize,
    /// Grid rotation for [`WatermarkPosition::Tile`].
    pub tile_angle_deg: f32,
}

impl WatermarkSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Trimmed text, or `None` when there is nothing to draw.
    pub fn visible_text(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn alpha(&self) -> f32 {
        f32::from(self.opacity_percent.min(100)) / 100.0
    }
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            text: String::new(),
            effect: WatermarkEffect::None,
            opacity_percent: 70,
            position: WatermarkPosition::BottomRight,
            size: WatermarkSize::Medium,
            tile_angle_deg: DEFAULT_TILE_ANGLE_DEG,
        }
    }
}

macro_rules! keyword_enum {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($name => Ok(Self::$variant),)+
                    other => Err(format!(
                        concat!("unknown ", stringify!($ty), ": {}"),
                        other
                    )),
                }
            }
        }
    };
}

keyword_enum!(WatermarkEffect {
    None => "none",
    Outline => "outline",
    Shadow => "shadow",
    Glow => "glow",
    Emboss => "emboss",
    Vintage => "vintage",
    Neon => "neon",
});

keyword_enum!(WatermarkPosition {
    TopLeft => "topLeft",
    TopRight => "topRight",
    BottomLeft => "bottomLeft",
    BottomRight => "bottomRight",
    Center => "center",
    Tile => "tile",
});

keyword_enum!(WatermarkSize {
    Small => "small",
    Medium => "medium",
    Large => "large",
    ExtraLarge => "extraLarge",
});
