//! Pure Rust raster backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Surfaces | `image::RgbaImage` (straight alpha) |
//! | Color filters | [`FilterChain`] per pixel, parallel via `rayon` |
//! | Blur, shadow blur | `image::imageops::blur` |
//! | Flips, quarter turns | `image::imageops::{flip_*, rotate*}` |
//! | Crop | `image::imageops::crop_imm` |
//! | Glyphs | `font8x8` bitmaps, nearest-neighbor scaled |
//!
//! Text is rendered once into a transparent stamp (shadow, stroke and fill
//! for every pass), then composited onto the surface with the global alpha.
//! Tiled layouts sample the stamp through the inverse grid rotation, so the
//! grid is effectively infinite and reaches every edge of the surface.

use super::backend::{
    BackendError, DrawImageParams, DrawTextParams, ImageBackend, TextLayout, TextMetrics,
};
use super::color::FilterChain;
use super::effects::TextPass;
use super::params::Rotation;
use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{GrayImage, Luma, Rgba, RgbaImage, imageops};
use rayon::prelude::*;
use std::borrow::Cow;

/// Largest surface the backend will allocate: 16384 × 16384.
pub const DEFAULT_MAX_SURFACE_PIXELS: u64 = 268_435_456;

/// Native glyph cell of the bitmap font.
const GLYPH_PX: u32 = 8;

/// Pure Rust backend drawing into in-memory RGBA buffers.
///
/// Stateless apart from the surface limit, so one instance can serve any
/// number of concurrent operations.
#[derive(Debug, Clone, Copy)]
pub struct RasterBackend {
    max_surface_pixels: u64,
}

impl RasterBackend {
    pub fn new() -> Self {
        Self {
            max_surface_pixels: DEFAULT_MAX_SURFACE_PIXELS,
        }
    }

    pub fn with_max_surface_pixels(max_surface_pixels: u64) -> Self {
        Self { max_surface_pixels }
    }

    pub fn max_surface_pixels(&self) -> u64 {
        self.max_surface_pixels
    }
}

impl Default for RasterBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RasterBackend {
    fn create_surface(&self, width: u32, height: u32) -> Result<RgbaImage, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::ResourceUnavailable(format!(
                "zero-sized surface {width}x{height}"
            )));
        }
        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.max_surface_pixels {
            return Err(BackendError::ResourceUnavailable(format!(
                "surface {width}x{height} exceeds limit of {} pixels",
                self.max_surface_pixels
            )));
        }
        Ok(RgbaImage::new(width, height))
    }

    fn draw_image(
        &self,
        surface: &mut RgbaImage,
        params: &DrawImageParams<'_>,
    ) -> Result<(), BackendError> {
        let filtered = apply_filter(params.source, params.filter);
        let oriented = orient(
            filtered,
            params.rotation,
            params.flip_horizontal,
            params.flip_vertical,
        );

        let crop = params.crop;
        let (ow, oh) = oriented.dimensions();
        let fits = crop.width > 0
            && crop.height > 0
            && u64::from(crop.x) + u64::from(crop.width) <= u64::from(ow)
            && u64::from(crop.y) + u64::from(crop.height) <= u64::from(oh);
        if !fits {
            return Err(BackendError::ProcessingFailed(format!(
                "crop {crop:?} outside {ow}x{oh} canvas"
            )));
        }
        if surface.dimensions() != crop.dimensions() {
            return Err(BackendError::ProcessingFailed(format!(
                "surface {:?} does not match crop {:?}",
                surface.dimensions(),
                crop.dimensions()
            )));
        }

        let view =
            imageops::crop_imm(&*oriented, crop.x, crop.y, crop.width, crop.height).to_image();
        imageops::replace(surface, &view, 0, 0);
        Ok(())
    }

    fn measure_text(&self, text: &str, font_px: f32) -> TextMetrics {
        let cell = (GLYPH_PX * glyph_scale(font_px)) as f32;
        TextMetrics {
            width: text.chars().count() as f32 * cell,
            height: cell,
        }
    }

    fn draw_text(
        &self,
        surface: &mut RgbaImage,
        params: &DrawTextParams<'_>,
    ) -> Result<(), BackendError> {
        let alpha = params.alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 || params.text.is_empty() || params.passes.is_empty() {
            return Ok(());
        }

        let stamp = render_stamp(params.text, params.font_px, params.passes);
        match params.layout {
            TextLayout::Anchored { x, y } => {
                let left = x.round() as i64 - i64::from(stamp.margin);
                let top = y.round() as i64 - i64::from(stamp.margin);
                composite_at(surface, &stamp.image, left, top, alpha);
            }
            TextLayout::Tiled {
                angle_deg,
                step_x,
                step_y,
            } => {
                if !(step_x.is_finite() && step_y.is_finite()) || step_x < 1.0 || step_y < 1.0 {
                    return Err(BackendError::ProcessingFailed(format!(
                        "invalid tile step {step_x}x{step_y}"
                    )));
                }
                composite_tiled(surface, &stamp.image, angle_deg, (step_x, step_y), alpha);
            }
        }
        Ok(())
    }
}

/// Integer magnification of the 8px bitmap font for a requested size.
pub fn glyph_scale(font_px: f32) -> u32 {
    if !font_px.is_finite() {
        return 1;
    }
    (font_px / GLYPH_PX as f32).round().max(1.0) as u32
}

fn glyph_bits(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Coverage mask of `text` rendered with the bitmap font.
pub fn glyph_mask(text: &str, font_px: f32) -> GrayImage {
    let scale = glyph_scale(font_px);
    let cell = GLYPH_PX * scale;
    let chars = text.chars().count() as u32;
    let mut mask = GrayImage::new((chars * cell).max(1), cell);

    for (idx, ch) in text.chars().enumerate() {
        let origin_x = idx as u32 * cell;
        for (row, bits) in glyph_bits(ch).iter().enumerate() {
            for col in 0..GLYPH_PX {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let x0 = origin_x + col * scale;
                let y0 = row as u32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        mask.put_pixel(x0 + dx, y0 + dy, Luma([255]));
                    }
                }
            }
        }
    }
    mask
}

/// Pre-rendered text with every pass applied, padded by `margin` on all sides.
struct Stamp {
    image: RgbaImage,
    margin: u32,
}

fn render_stamp(text: &str, font_px: f32, passes: &[TextPass]) -> Stamp {
    let mask = glyph_mask(text, font_px);
    let margin = passes.iter().map(TextPass::bleed).fold(0.0f32, f32::max) as u32 + 1;
    let (lw, lh) = (mask.width() + 2 * margin, mask.height() + 2 * margin);
    let mut layer = RgbaImage::new(lw, lh);

    for pass in passes {
        let ox = margin as f32 + pass.offset.0;
        let oy = margin as f32 + pass.offset.1;

        if let Some(shadow) = pass.shadow {
            let placed = place_mask(&mask, (lw, lh), ox + shadow.offset.0, oy + shadow.offset.1);
            let sigma = shadow.blur / 2.0;
            let coverage = if sigma > 0.0 {
                imageops::blur(&placed, sigma)
            } else {
                placed
            };
            paint(&mut layer, &coverage, shadow.color);
        }
        if let Some(stroke) = pass.stroke {
            let placed = place_mask(&mask, (lw, lh), ox, oy);
            let radius = (stroke.width / 2.0).round().max(1.0) as u32;
            paint(&mut layer, &dilate(&placed, radius), stroke.color);
        }
        let placed = place_mask(&mask, (lw, lh), ox, oy);
        paint(&mut layer, &placed, pass.fill);
    }

    Stamp {
        image: layer,
        margin,
    }
}

fn place_mask(mask: &GrayImage, size: (u32, u32), x: f32, y: f32) -> GrayImage {
    let mut placed = GrayImage::new(size.0, size.1);
    imageops::replace(&mut placed, mask, x.round() as i64, y.round() as i64);
    placed
}

/// Grow coverage by a disc of `radius` pixels.
fn dilate(mask: &GrayImage, radius: u32) -> GrayImage {
    let (w, h) = mask.dimensions();
    let r = radius as i64;
    let mut out = GrayImage::new(w, h);
    for (x, y, px) in mask.enumerate_pixels() {
        if px[0] == 0 {
            continue;
        }
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let dst = out.get_pixel_mut(nx as u32, ny as u32);
                dst[0] = dst[0].max(px[0]);
            }
        }
    }
    out
}

/// Paint `color` through a coverage mask of the same size as `layer`.
fn paint(layer: &mut RgbaImage, coverage: &GrayImage, color: Rgba<u8>) {
    for (dst, cov) in layer.pixels_mut().zip(coverage.pixels()) {
        if cov[0] == 0 {
            continue;
        }
        let mut src = color;
        src[3] = ((u16::from(color[3]) * u16::from(cov[0]) + 127) / 255) as u8;
        blend_over(dst, src, 1.0);
    }
}

/// Straight-alpha source-over with an extra opacity factor.
pub fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>, opacity: f32) {
    let sa = f32::from(src[3]) / 255.0 * opacity.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    let mut out = [0u8; 4];
    for i in 0..3 {
        let c = (f32::from(src[i]) * sa + f32::from(dst[i]) * da * (1.0 - sa)) / out_a;
        out[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    *dst = Rgba(out);
}

fn composite_at(surface: &mut RgbaImage, stamp: &RgbaImage, left: i64, top: i64, alpha: f32) {
    let (sw, sh) = surface.dimensions();
    for (x, y, src) in stamp.enumerate_pixels() {
        if src[3] == 0 {
            continue;
        }
        let (tx, ty) = (left + i64::from(x), top + i64::from(y));
        if tx < 0 || ty < 0 || tx >= i64::from(sw) || ty >= i64::from(sh) {
            continue;
        }
        blend_over(surface.get_pixel_mut(tx as u32, ty as u32), *src, alpha);
    }
}

/// Composite a rotated, repeating grid of `stamp` over the whole surface.
///
/// Grid points sit at `center + R(angle) · (i·step_x, j·step_y)` with the
/// stamp centered on each point. Every surface pixel is mapped back into the
/// unrotated grid frame and checked against the nearest cells.
fn composite_tiled(
    surface: &mut RgbaImage,
    stamp: &RgbaImage,
    angle_deg: f32,
    step: (f32, f32),
    alpha: f32,
) {
    let (w, h) = surface.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let (stamp_w, stamp_h) = stamp.dimensions();
    let (half_w, half_h) = (stamp_w as f32 / 2.0, stamp_h as f32 / 2.0);
    let (step_x, step_y) = step;
    let width = w as usize;

    surface
        .par_chunks_exact_mut(width * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let dy = y as f32 + 0.5 - cy;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let dx = x as f32 + 0.5 - cx;
                let gx = dx * cos + dy * sin;
                let gy = -dx * sin + dy * cos;
                let u = gx.rem_euclid(step_x);
                let v = gy.rem_euclid(step_y);

                let mut dst = Rgba([px[0], px[1], px[2], px[3]]);
                for ky in [-1.0f32, 0.0, 1.0] {
                    let sy = v - ky * step_y + half_h;
                    if sy < 0.0 || sy >= stamp_h as f32 {
                        continue;
                    }
                    for kx in [-1.0f32, 0.0, 1.0] {
                        let sx = u - kx * step_x + half_w;
                        if sx < 0.0 || sx >= stamp_w as f32 {
                            continue;
                        }
                        let src = *stamp.get_pixel(sx as u32, sy as u32);
                        if src[3] != 0 {
                            blend_over(&mut dst, src, alpha);
                        }
                    }
                }
                px.copy_from_slice(&dst.0);
            }
        });
}

fn apply_filter<'a>(source: &'a RgbaImage, filter: &FilterChain) -> Cow<'a, RgbaImage> {
    if filter.is_identity() {
        return Cow::Borrowed(source);
    }
    let mut out = source.clone();
    if filter.has_color_stages() {
        out.par_chunks_exact_mut(4).for_each(|px| {
            let [r, g, b] = filter.apply_color([px[0], px[1], px[2]]);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        });
    }
    if let Some(sigma) = filter.blur_sigma() {
        out = imageops::blur(&out, sigma);
    }
    Cow::Owned(out)
}

/// Flips in the source frame, then the clockwise quarter turn.
fn orient(
    image: Cow<'_, RgbaImage>,
    rotation: Rotation,
    flip_horizontal: bool,
    flip_vertical: bool,
) -> Cow<'_, RgbaImage> {
    let mut image = image;
    if flip_horizontal {
        image = Cow::Owned(imageops::flip_horizontal(&*image));
    }
    if flip_vertical {
        image = Cow::Owned(imageops::flip_vertical(&*image));
    }
    match rotation {
        Rotation::None => image,
        Rotation::Cw90 => Cow::Owned(imageops::rotate90(&*image)),
        Rotation::Cw180 => Cow::Owned(imageops::rotate180(&*image)),
        Rotation::Cw270 => Cow::Owned(imageops::rotate270(&*image)),
    }
}
