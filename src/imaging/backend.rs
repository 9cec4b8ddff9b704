//! Drawing-surface trait and shared types.
//!
//! The [`ImageBackend`] trait is the only place pixels are touched. It
//! exposes four primitives:
//!
//! | Primitive | Purpose |
//! |---|---|
//! | `create_surface` | allocate a transparent RGBA canvas |
//! | `draw_image` | filter, orient, crop a source onto a surface |
//! | `measure_text` | size of a text run at a font size |
//! | `draw_text` | styled text, anchored or tiled, at a global alpha |
//!
//! The production implementation is
//! [`RasterBackend`](super::raster_backend::RasterBackend). Tests use
//! [`MockBackend`](tests::MockBackend), which records calls and can be told
//! to refuse surfaces so the fail-closed paths are exercised.

use super::calculations::CropRect;
use super::color::FilterChain;
use super::effects::TextPass;
use super::params::Rotation;
use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    /// No drawing surface could be obtained (zero-sized or over the pixel limit).
    #[error("Drawing surface unavailable: {0}")]
    ResourceUnavailable(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Rendered size of a text run in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub width: f32,
    pub height: f32,
}

/// Draw a source image onto a surface.
///
/// Order: `filter` on the source pixels, then flips in the source frame,
/// then `rotation`, then `crop` (in the rotated frame). The surface must be
/// exactly `crop.width × crop.height`.
#[derive(Debug, Clone)]
pub struct DrawImageParams<'a> {
    pub source: &'a RgbaImage,
    pub filter: &'a FilterChain,
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub crop: CropRect,
}

/// Where text lands on the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextLayout {
    /// Single run with its top-left corner at `(x, y)`.
    Anchored { x: f32, y: f32 },
    /// Repeating grid rotated by `angle_deg` about the surface center,
    /// covering the whole surface.
    Tiled {
        angle_deg: f32,
        step_x: f32,
        step_y: f32,
    },
}

#[derive(Debug, Clone)]
pub struct DrawTextParams<'a> {
    pub text: &'a str,
    pub font_px: f32,
    pub passes: &'a [TextPass],
    /// Global alpha multiplied into every pass, 0–1.
    pub alpha: f32,
    pub layout: TextLayout,
}

/// Trait for drawing backends.
///
/// Implementations must be `Sync`: batch rendering shares one backend across
/// rayon workers, and every call owns its own surface.
pub trait ImageBackend: Sync {
    /// Allocate a fully transparent surface.
    fn create_surface(&self, width: u32, height: u32) -> Result<RgbaImage, BackendError>;

    /// Draw `params.source` onto `surface`, replacing its pixels.
    fn draw_image(
        &self,
        surface: &mut RgbaImage,
        params: &DrawImageParams<'_>,
    ) -> Result<(), BackendError>;

    fn measure_text(&self, text: &str, font_px: f32) -> TextMetrics;

    /// Composite styled text over `surface`.
    fn draw_text(
        &self,
        surface: &mut RgbaImage,
        params: &DrawTextParams<'_>,
    ) -> Result<(), BackendError>;
}
