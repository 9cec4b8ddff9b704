//! High-level image operations.
//!
//! These functions combine calculations with backend execution. Each one
//! plans its drawing with pure functions first (`plan_*`, unit testable
//! without pixels), then hands the plan to an [`ImageBackend`].
//!
//! ## Failure policy
//!
//! [`apply_adjustments_and_transforms`] and [`apply_watermark`] never fail:
//! when the backend cannot provide a surface or a draw fails they log a
//! warning and return the input unchanged. Only [`render_encoded`] returns
//! errors, and only for decode/encode problems.

use super::backend::{BackendError, DrawImageParams, DrawTextParams, ImageBackend, TextLayout};
use super::calculations::{
    CropRect, calculate_crop, calculate_text_origin, calculate_tile_steps,
    calculate_watermark_anchor, calculate_watermark_font_px, rotated_dimensions,
};
use super::codec::{CodecError, RasterImage};
use super::color::FilterChain;
use super::effects::{TextPass, text_passes};
use super::params::{
    AdjustmentParameters, Rotation, TransformParameters, WatermarkPosition, WatermarkSpec,
};
use crate::types::MimeType;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that escape the pipeline. Surface failures never do.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("decode failed: {0}")]
    Decode(#[source] CodecError),
    #[error("encode failed: {0}")]
    Encode(#[source] CodecError),
}

/// Drawing plan for the adjust/transform stage.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustPlan {
    pub filter: FilterChain,
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    /// Crop in the rotated frame; its size is the output size.
    pub crop: CropRect,
}

impl AdjustPlan {
    pub fn output_dimensions(&self) -> (u32, u32) {
        self.crop.dimensions()
    }

    pub fn is_identity(&self, source: (u32, u32)) -> bool {
        self.filter.is_identity()
            && self.rotation == Rotation::None
            && !self.flip_horizontal
            && !self.flip_vertical
            && self.crop == CropRect::full(source)
    }
}

/// Plan the adjust/transform stage without executing it.
pub fn plan_adjustments(
    source: (u32, u32),
    adjust: &AdjustmentParameters,
    transform: &TransformParameters,
) -> AdjustPlan {
    let transform = transform.clamped();
    let canvas = rotated_dimensions(source, transform.rotation);
    AdjustPlan {
        filter: FilterChain::from_adjustments(adjust),
        rotation: transform.rotation,
        flip_horizontal: transform.flip_horizontal,
        flip_vertical: transform.flip_vertical,
        crop: calculate_crop(canvas, transform.crop_aspect, transform.zoom),
    }
}

/// Color filters, then flips and rotation, then aspect crop and zoom.
///
/// Returns a new image; `source` is untouched. Fails closed.
pub fn apply_adjustments_and_transforms(
    backend: &impl ImageBackend,
    source: &RasterImage,
    adjust: &AdjustmentParameters,
    transform: &TransformParameters,
) -> RasterImage {
    let plan = plan_adjustments(source.dimensions(), adjust, transform);
    if plan.is_identity(source.dimensions()) {
        debug!("identity adjustments, skipping draw");
        return source.clone();
    }
    match execute_adjustments(backend, source, &plan) {
        Ok(image) => image,
        Err(e) => {
            warn!(error = %e, "adjustments skipped, returning original image");
            source.clone()
        }
    }
}

fn execute_adjustments(
    backend: &impl ImageBackend,
    source: &RasterImage,
    plan: &AdjustPlan,
) -> Result<RasterImage, BackendError> {
    let (width, height) = plan.output_dimensions();
    let mut surface = backend.create_surface(width, height)?;
    backend.draw_image(
        &mut surface,
        &DrawImageParams {
            source: &source.pixels,
            filter: &plan.filter,
            rotation: plan.rotation,
            flip_horizontal: plan.flip_horizontal,
            flip_vertical: plan.flip_vertical,
            crop: plan.crop,
        },
    )?;
    Ok(RasterImage::new(surface, source.mime))
}

/// Drawing plan for one watermark.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkPlan {
    pub text: String,
    pub font_px: f32,
    pub passes: Vec<TextPass>,
    pub alpha: f32,
    pub layout: TextLayout,
}

/// Plan a watermark for an image of `dimensions`.
///
/// `None` when there is nothing visible to draw: blank text or zero opacity.
pub fn plan_watermark(
    backend: &impl ImageBackend,
    dimensions: (u32, u32),
    spec: &WatermarkSpec,
) -> Option<WatermarkPlan> {
    let text = spec.visible_text()?;
    let alpha = spec.alpha();
    if alpha <= 0.0 {
        return None;
    }

    let font_px = calculate_watermark_font_px(dimensions.0, spec.size);
    let metrics = backend.measure_text(text, font_px);
    let layout = match calculate_watermark_anchor(spec.position, dimensions) {
        Some(anchor) => {
            let (x, y) = calculate_text_origin(&anchor, (metrics.width, metrics.height));
            TextLayout::Anchored { x, y }
        }
        None => {
            debug_assert_eq!(spec.position, WatermarkPosition::Tile);
            let (step_x, step_y) = calculate_tile_steps((metrics.width, metrics.height));
            TextLayout::Tiled {
                angle_deg: spec.tile_angle_deg,
                step_x,
                step_y,
            }
        }
    };

    Some(WatermarkPlan {
        text: text.to_string(),
        font_px,
        passes: text_passes(spec.effect, font_px),
        alpha,
        layout,
    })
}

/// Composite `spec` onto a copy of `source`. Fails closed.
///
/// Blank text or zero opacity returns an exact copy of `source`.
pub fn apply_watermark(
    backend: &impl ImageBackend,
    source: &RasterImage,
    spec: &WatermarkSpec,
) -> RasterImage {
    let Some(plan) = plan_watermark(backend, source.dimensions(), spec) else {
        debug!("nothing to watermark");
        return source.clone();
    };
    match execute_watermark(backend, source, &plan) {
        Ok(image) => image,
        Err(e) => {
            warn!(error = %e, "watermark skipped, returning original image");
            source.clone()
        }
    }
}

fn execute_watermark(
    backend: &impl ImageBackend,
    source: &RasterImage,
    plan: &WatermarkPlan,
) -> Result<RasterImage, BackendError> {
    let (width, height) = source.dimensions();
    let mut surface = backend.create_surface(width, height)?;
    backend.draw_image(
        &mut surface,
        &DrawImageParams {
            source: &source.pixels,
            filter: &FilterChain::identity(),
            rotation: Rotation::None,
            flip_horizontal: false,
            flip_vertical: false,
            crop: CropRect::full((width, height)),
        },
    )?;
    backend.draw_text(
        &mut surface,
        &DrawTextParams {
            text: &plan.text,
            font_px: plan.font_px,
            passes: &plan.passes,
            alpha: plan.alpha,
            layout: plan.layout,
        },
    )?;
    Ok(RasterImage::new(surface, source.mime))
}

/// Encoded result of [`render_encoded`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime: MimeType,
    pub width: u32,
    pub height: u32,
}

/// Everything needed to render one image end to end.
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    pub adjust: AdjustmentParameters,
    pub transform: TransformParameters,
    /// `None` skips the watermark stage.
    pub watermark: Option<WatermarkSpec>,
    /// Output encoding; `None` keeps the input's.
    pub output_mime: Option<MimeType>,
    pub jpeg_quality: u8,
}

/// Decode → adjust/transform → watermark → encode.
///
/// Decode and encode errors propagate; drawing failures fall back to the
/// previous stage's image.
pub fn render_encoded(
    backend: &impl ImageBackend,
    bytes: &[u8],
    mime: MimeType,
    request: &RenderRequest,
) -> Result<EncodedImage, PipelineError> {
    let decoded = RasterImage::decode(bytes, mime).map_err(PipelineError::Decode)?;
    let adjusted =
        apply_adjustments_and_transforms(backend, &decoded, &request.adjust, &request.transform);
    let finished = match &request.watermark {
        Some(spec) => apply_watermark(backend, &adjusted, spec),
        None => adjusted,
    };

    let out_mime = request.output_mime.unwrap_or(decoded.mime);
    let bytes = finished
        .encode(out_mime, request.jpeg_quality)
        .map_err(PipelineError::Encode)?;
    Ok(EncodedImage {
        bytes,
        mime: out_mime,
        width: finished.width(),
        height: finished.height(),
    })
}
