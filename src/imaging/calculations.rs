//! Pure calculation functions for canvas geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Operations call these to turn [`params`](super::params) into concrete
//! pixel rectangles and anchor points before touching a backend.

use super::params::{CropAspect, Rotation, WatermarkPosition, WatermarkSize};

/// Smallest base font size for watermark text, in pixels.
const MIN_BASE_FONT_PX: f32 = 20.0;

/// Base watermark font size as a fraction of image width.
const FONT_WIDTH_FRACTION: f32 = 0.035;

/// Edge padding for anchored watermarks as a fraction of image width.
const PADDING_WIDTH_FRACTION: f32 = 0.025;

/// Canvas dimensions after a quarter-turn rotation.
///
/// # Examples
/// ```
/// # use imagen_studio::imaging::{Rotation, rotated_dimensions};
/// assert_eq!(rotated_dimensions((100, 200), Rotation::Cw90), (200, 100));
/// assert_eq!(rotated_dimensions((100, 200), Rotation::Cw180), (100, 200));
/// ```
pub fn rotated_dimensions(source: (u32, u32), rotation: Rotation) -> (u32, u32) {
    let (w, h) = source;
    if rotation.swaps_axes() { (h, w) } else { (w, h) }
}

/// Axis-aligned pixel rectangle inside a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// The whole canvas.
    pub fn full(canvas: (u32, u32)) -> Self {
        Self {
            x: 0,
            y: 0,
            width: canvas.0,
            height: canvas.1,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Largest centered rectangle of `ratio` that fits inside `canvas`.
///
/// If the canvas is wider than the target ratio the width is cropped,
/// otherwise the height is. No letterboxing.
///
/// # Arguments
/// * `canvas` - Canvas dimensions (width, height)
/// * `ratio` - Target aspect ratio as (width, height)
pub fn calculate_aspect_crop(canvas: (u32, u32), ratio: (u32, u32)) -> CropRect {
    let (cw, ch) = canvas;
    let (aw, ah) = ratio;
    if cw == 0 || ch == 0 || aw == 0 || ah == 0 {
        return CropRect::full(canvas);
    }

    let (width, height) = if cw as u64 * ah as u64 > ch as u64 * aw as u64 {
        // Canvas is wider: keep full height, crop width
        let w = (ch as f64 * aw as f64 / ah as f64).round() as u32;
        (w.clamp(1, cw), ch)
    } else {
        // Canvas is taller (or exact): keep full width, crop height
        let h = (cw as f64 * ah as f64 / aw as f64).round() as u32;
        (cw, h.clamp(1, ch))
    };

    CropRect {
        x: (cw - width) / 2,
        y: (ch - height) / 2,
        width,
        height,
    }
}

/// Shrink `rect` by `1/zoom` on both axes, re-centered inside `rect`.
///
/// A zoom of 1.0 (or anything below) returns `rect` unchanged.
pub fn calculate_zoom_crop(rect: CropRect, zoom: f32) -> CropRect {
    if !zoom.is_finite() || zoom <= 1.0 {
        return rect;
    }
    let width = ((rect.width as f64 / zoom as f64).round() as u32).clamp(1, rect.width.max(1));
    let height = ((rect.height as f64 / zoom as f64).round() as u32).clamp(1, rect.height.max(1));
    CropRect {
        x: rect.x + (rect.width - width) / 2,
        y: rect.y + (rect.height - height) / 2,
        width,
        height,
    }
}

/// Final crop rectangle for a transformed canvas: aspect crop, then zoom.
///
/// `CropAspect::Original` with zoom 1.0 yields the full canvas.
pub fn calculate_crop(canvas: (u32, u32), aspect: CropAspect, zoom: f32) -> CropRect {
    let base = match aspect.ratio() {
        Some(ratio) => calculate_aspect_crop(canvas, ratio),
        None => CropRect::full(canvas),
    };
    calculate_zoom_crop(base, zoom)
}

/// Watermark font size in pixels for an image of the given width.
///
/// # Examples
/// ```
/// # use imagen_studio::imaging::{WatermarkSize, calculate_watermark_font_px};
/// // 2000px wide → 3.5% = 70px at medium, 112px at extra large
/// let medium = calculate_watermark_font_px(2000, WatermarkSize::Medium);
/// let extra = calculate_watermark_font_px(2000, WatermarkSize::ExtraLarge);
/// assert!((medium - 70.0).abs() < 1e-3);
/// assert!((extra - 112.0).abs() < 1e-3);
/// ```
pub fn calculate_watermark_font_px(image_width: u32, size: WatermarkSize) -> f32 {
    let base = (image_width as f32 * FONT_WIDTH_FRACTION).max(MIN_BASE_FONT_PX);
    base * size.multiplier()
}

/// Edge padding in pixels for anchored watermarks.
pub fn calculate_watermark_padding(image_width: u32) -> f32 {
    image_width as f32 * PADDING_WIDTH_FRACTION
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

/// Anchor point for a single watermark draw.
///
/// `(x, y)` is the point the text box is aligned against: with
/// `Right`/`Bottom` the text ends at `x` and sits above `y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextAnchor {
    pub x: f32,
    pub y: f32,
    pub align: HorizontalAlign,
    pub baseline: VerticalAlign,
}

/// Anchor for every position except [`WatermarkPosition::Tile`], which has none.
pub fn calculate_watermark_anchor(
    position: WatermarkPosition,
    image: (u32, u32),
) -> Option<TextAnchor> {
    let (w, h) = (image.0 as f32, image.1 as f32);
    let pad = calculate_watermark_padding(image.0);
    let anchor = |x, y, align, baseline| TextAnchor {
        x,
        y,
        align,
        baseline,
    };
    use HorizontalAlign as H;
    use VerticalAlign as V;
    match position {
        WatermarkPosition::TopLeft => Some(anchor(pad, pad, H::Left, V::Top)),
        WatermarkPosition::TopRight => Some(anchor(w - pad, pad, H::Right, V::Top)),
        WatermarkPosition::BottomLeft => Some(anchor(pad, h - pad, H::Left, V::Bottom)),
        WatermarkPosition::BottomRight => Some(anchor(w - pad, h - pad, H::Right, V::Bottom)),
        WatermarkPosition::Center => Some(anchor(w / 2.0, h / 2.0, H::Center, V::Middle)),
        WatermarkPosition::Tile => None,
    }
}

/// Top-left corner of a `text_size` box aligned against `anchor`.
pub fn calculate_text_origin(anchor: &TextAnchor, text_size: (f32, f32)) -> (f32, f32) {
    let (tw, th) = text_size;
    let x = match anchor.align {
        HorizontalAlign::Left => anchor.x,
        HorizontalAlign::Center => anchor.x - tw / 2.0,
        HorizontalAlign::Right => anchor.x - tw,
    };
    let y = match anchor.baseline {
        VerticalAlign::Top => anchor.y,
        VerticalAlign::Middle => anchor.y - th / 2.0,
        VerticalAlign::Bottom => anchor.y - th,
    };
    (x, y)
}

/// Horizontal and vertical repeat distance of the tiled watermark grid.
///
/// Columns are 1.5 text widths apart, rows 3 text heights apart.
pub fn calculate_tile_steps(text_size: (f32, f32)) -> (f32, f32) {
    let (tw, th) = text_size;
    ((tw * 1.5).max(1.0), (th * 3.0).max(1.0))
}
