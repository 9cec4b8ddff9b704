//! Pipeline laws checked end to end on the software rasterizer.

use image::{Rgba, RgbaImage};
use imagen_studio::imaging::{
    AdjustmentParameters, CropAspect, RasterBackend, RasterImage, RenderRequest, Rotation,
    TransformParameters, WatermarkEffect, WatermarkPosition, WatermarkSpec,
    apply_adjustments_and_transforms, apply_watermark, render_encoded,
};
use imagen_studio::types::MimeType;

/// Every pixel distinct enough to catch reordering.
fn pattern(w: u32, h: u32) -> RasterImage {
    let pixels = RgbaImage::from_fn(w, h, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x / 256) * 16 + y / 256) as u8, 255])
    });
    RasterImage::new(pixels, MimeType::Png)
}

fn solid(w: u32, h: u32) -> RasterImage {
    RasterImage::new(
        RgbaImage::from_pixel(w, h, Rgba([40, 40, 40, 255])),
        MimeType::Png,
    )
}

fn transform(f: impl FnOnce(&mut TransformParameters)) -> TransformParameters {
    let mut t = TransformParameters::IDENTITY;
    f(&mut t);
    t
}

fn adjust(backend: &RasterBackend, img: &RasterImage, t: TransformParameters) -> RasterImage {
    apply_adjustments_and_transforms(backend, img, &AdjustmentParameters::IDENTITY, &t)
}

#[test]
fn identity_parameters_leave_pixels_unchanged() {
    let backend = RasterBackend::new();
    let img = pattern(37, 23);
    let out = adjust(&backend, &img, TransformParameters::IDENTITY);
    assert_eq!(out, img);
}

#[test]
fn quarter_turns_swap_dimensions() {
    let backend = RasterBackend::new();
    let img = pattern(100, 200);
    for (degrees, expected) in [(0, (100, 200)), (90, (200, 100)), (180, (100, 200)), (270, (200, 100))] {
        let out = adjust(
            &backend,
            &img,
            transform(|t| t.rotation = Rotation::from_degrees(degrees)),
        );
        assert_eq!(out.dimensions(), expected, "rotation {degrees}");
    }
}

#[test]
fn flipping_twice_is_identity() {
    let backend = RasterBackend::new();
    let img = pattern(31, 17);
    for flip in [
        transform(|t| t.flip_horizontal = true),
        transform(|t| t.flip_vertical = true),
    ] {
        let once = adjust(&backend, &img, flip);
        assert_ne!(once, img);
        let twice = adjust(&backend, &once, flip);
        assert_eq!(twice, img);
    }
}

#[test]
fn aspect_crops_match_ratio_and_fit() {
    let backend = RasterBackend::new();
    let img = pattern(640, 400);
    for aspect in [
        CropAspect::Square,
        CropAspect::Wide,
        CropAspect::Standard,
        CropAspect::Tall,
    ] {
        let out = adjust(&backend, &img, transform(|t| t.crop_aspect = aspect));
        let (w, h) = out.dimensions();
        let (rw, rh) = aspect.ratio().unwrap();
        let target = rw as f64 / rh as f64;
        assert!(w <= 640 && h <= 400);
        assert!(
            (w as f64 / h as f64 - target).abs() < 0.02,
            "{aspect:?}: {w}x{h}"
        );
    }
}

#[test]
fn zoom_strictly_shrinks_crop() {
    let backend = RasterBackend::new();
    let img = solid(400, 300);
    let mut last = img.dimensions();
    for zoom in [1.25, 1.5, 2.0, 3.0] {
        let out = adjust(
            &backend,
            &img,
            transform(|t| {
                t.crop_aspect = CropAspect::Standard;
                t.zoom = zoom;
            }),
        );
        let (w, h) = out.dimensions();
        assert!(w < last.0 && h < last.1, "zoom {zoom}: {w}x{h}");
        last = (w, h);
    }
}

#[test]
fn rotating_tall_image_by_90() {
    let backend = RasterBackend::new();
    let out = adjust(
        &backend,
        &pattern(100, 200),
        transform(|t| t.rotation = Rotation::Cw90),
    );
    assert_eq!(out.dimensions(), (200, 100));
}

#[test]
fn square_crop_is_horizontally_centered() {
    let backend = RasterBackend::new();
    let img = pattern(400, 200);
    let out = adjust(
        &backend,
        &img,
        transform(|t| t.crop_aspect = CropAspect::Square),
    );
    assert_eq!(out.dimensions(), (200, 200));
    for y in (0..200).step_by(13) {
        for x in (0..200).step_by(7) {
            assert_eq!(
                out.pixels.get_pixel(x, y),
                img.pixels.get_pixel(x + 100, y)
            );
        }
    }
}

#[test]
fn bottom_right_watermark_lands_in_corner() {
    let backend = RasterBackend::new();
    let img = solid(500, 500);
    let spec = WatermarkSpec {
        opacity_percent: 100,
        effect: WatermarkEffect::None,
        position: WatermarkPosition::BottomRight,
        ..WatermarkSpec::new("X")
    };
    let out = apply_watermark(&backend, &img, &spec);
    let background = *img.pixels.get_pixel(0, 0);
    let changed = |x0: u32, y0: u32, x1: u32, y1: u32| {
        (y0..y1).any(|y| (x0..x1).any(|x| *out.pixels.get_pixel(x, y) != background))
    };

    assert!(changed(450, 450, 500, 500));
    assert!(!changed(0, 0, 250, 250));
}

#[test]
fn blank_text_is_a_no_op() {
    let backend = RasterBackend::new();
    let img = pattern(64, 64);
    for text in ["", "   "] {
        let out = apply_watermark(&backend, &img, &WatermarkSpec::new(text));
        assert_eq!(out, img);
    }
}

#[test]
fn zero_opacity_is_invisible() {
    let backend = RasterBackend::new();
    let img = pattern(120, 80);
    for position in [WatermarkPosition::Center, WatermarkPosition::Tile] {
        let spec = WatermarkSpec {
            opacity_percent: 0,
            effect: WatermarkEffect::Neon,
            position,
            ..WatermarkSpec::new("Studio")
        };
        assert_eq!(apply_watermark(&backend, &img, &spec), img);
    }
}

#[test]
fn tiled_watermark_covers_every_region() {
    let backend = RasterBackend::new();
    let img = solid(300, 300);
    let spec = WatermarkSpec {
        opacity_percent: 100,
        position: WatermarkPosition::Tile,
        ..WatermarkSpec::new("TdAnimator")
    };
    let out = apply_watermark(&backend, &img, &spec);
    let background = *img.pixels.get_pixel(0, 0);
    for (x0, y0) in [(0, 0), (150, 0), (0, 150), (150, 150)] {
        let touched = (y0..y0 + 150)
            .any(|y| (x0..x0 + 150).any(|x| *out.pixels.get_pixel(x, y) != background));
        assert!(touched, "quadrant at ({x0}, {y0}) has no watermark");
    }
}

#[test]
fn unavailable_surface_returns_input() {
    let backend = RasterBackend::with_max_surface_pixels(16);
    let img = pattern(10, 10);
    let rotated = adjust(&backend, &img, transform(|t| t.rotation = Rotation::Cw90));
    assert_eq!(rotated, img);
    let marked = apply_watermark(
        &backend,
        &img,
        &WatermarkSpec {
            opacity_percent: 100,
            ..WatermarkSpec::new("X")
        },
    );
    assert_eq!(marked, img);
}

#[test]
fn render_encoded_runs_full_pipeline() {
    let backend = RasterBackend::new();
    let png = pattern(64, 32).encode(MimeType::Png, 90).unwrap();
    let request = RenderRequest {
        adjust: AdjustmentParameters {
            sepia: 60.0,
            ..AdjustmentParameters::IDENTITY
        },
        transform: transform(|t| t.rotation = Rotation::Cw270),
        watermark: Some(WatermarkSpec {
            opacity_percent: 80,
            ..WatermarkSpec::new("TdAnimator")
        }),
        output_mime: Some(MimeType::Jpeg),
        jpeg_quality: 85,
    };

    let encoded = render_encoded(&backend, &png, MimeType::Png, &request).unwrap();
    assert_eq!(encoded.mime, MimeType::Jpeg);
    assert_eq!((encoded.width, encoded.height), (32, 64));
    let decoded = RasterImage::decode(&encoded.bytes, MimeType::Jpeg).unwrap();
    assert_eq!(decoded.dimensions(), (32, 64));
}

#[test]
fn render_encoded_rejects_garbage() {
    let backend = RasterBackend::new();
    let result = render_encoded(
        &backend,
        b"not an image",
        MimeType::Png,
        &RenderRequest::default(),
    );
    assert!(result.is_err());
}
