//! Image processing in pure Rust, no native libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / encode** | `image` (JPEG, PNG) |
//! | **Color filters** | CSS-style color matrices + HSL hue rotation |
//! | **Blur** | `image::imageops::blur` |
//! | **Rotate / flip / crop** | `image::imageops` |
//! | **Watermark text** | `font8x8` bitmap glyphs, software compositing |
//!
//! The module is split into:
//! - **Parameters**: Data structures describing image operations
//! - **Calculations**: Pure functions for geometry (unit testable)
//! - **Color / Effects**: filter chain and watermark text styles
//! - **Backend**: [`ImageBackend`] drawing-surface trait + [`RasterBackend`]
//! - **Codec**: bytes ↔ [`RasterImage`], base64, data URLs
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod codec;
pub mod color;
pub mod effects;
pub mod operations;
mod params;
pub mod raster_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{
    CropRect, calculate_aspect_crop, calculate_crop, calculate_watermark_font_px,
    calculate_zoom_crop, rotated_dimensions,
};
pub use codec::{CodecError, RasterImage};
pub use operations::{
    EncodedImage, PipelineError, RenderRequest, apply_adjustments_and_transforms,
    apply_watermark, plan_adjustments, render_encoded,
};
pub use params::{
    AdjustmentParameters, CropAspect, DEFAULT_TILE_ANGLE_DEG, Rotation, TransformParameters,
    WatermarkEffect, WatermarkPosition, WatermarkSize, WatermarkSpec,
};
pub use raster_backend::RasterBackend;
