//! Watermark text styles.
//!
//! Each [`WatermarkEffect`] expands into one or more [`TextPass`]es. A pass
//! draws its shadow first, then its stroke, then its fill, all displaced by
//! the pass offset. Passes are drawn in order.
//!
//! | Effect | Fill | Stroke | Shadow |
//! |---|---|---|---|
//! | none | white 85% | | black 60%, blur 2, (1,1) |
//! | outline | white 85% | black 90%, max(2, f·0.08) | |
//! | shadow | white 85% | | black 80%, blur 4, (2,2) |
//! | glow | white 85% | | white 70%, blur max(8, f·0.2) |
//! | emboss | two passes, see [`text_passes`] | | |
//! | vintage | (200,180,150) 90% | | black 30%, blur 2, (1,1) |
//! | neon | cyan 90% | | cyan 100%, blur max(10, f·0.3) |

use super::params::WatermarkEffect;
use image::Rgba;

/// Drop shadow under a pass. `blur` follows the canvas convention: twice the
/// Gaussian standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub color: Rgba<u8>,
    pub blur: f32,
    pub offset: (f32, f32),
}

/// Outline around the glyphs, centered on the glyph edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Rgba<u8>,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPass {
    pub fill: Rgba<u8>,
    pub stroke: Option<Stroke>,
    pub shadow: Option<Shadow>,
    /// Displacement of the whole pass from the text origin.
    pub offset: (f32, f32),
}

impl TextPass {
    fn fill(fill: Rgba<u8>) -> Self {
        Self {
            fill,
            stroke: None,
            shadow: None,
            offset: (0.0, 0.0),
        }
    }

    fn with_shadow(mut self, color: Rgba<u8>, blur: f32, offset: (f32, f32)) -> Self {
        self.shadow = Some(Shadow {
            color,
            blur,
            offset,
        });
        self
    }

    fn with_stroke(mut self, color: Rgba<u8>, width: f32) -> Self {
        self.stroke = Some(Stroke { color, width });
        self
    }

    fn offset_by(mut self, dx: f32, dy: f32) -> Self {
        self.offset = (dx, dy);
        self
    }

    /// How far this pass can paint outside the plain glyph box, in pixels.
    pub fn bleed(&self) -> f32 {
        let own = self.offset.0.abs().max(self.offset.1.abs());
        let stroke = self.stroke.map_or(0.0, |s| s.width / 2.0);
        let shadow = self.shadow.map_or(0.0, |s| {
            // 3σ of the Gaussian plus the displacement
            1.5 * s.blur + s.offset.0.abs().max(s.offset.1.abs())
        });
        (own + stroke.max(shadow)).ceil()
    }
}

/// Straight-alpha color from 8-bit RGB and a 0–1 alpha.
pub fn rgba(r: u8, g: u8, b: u8, alpha: f32) -> Rgba<u8> {
    Rgba([r, g, b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8])
}

/// Passes for `effect` at font size `font_px`.
///
/// Emboss is a light pass shifted by `+(Δ, Δ)` followed by a dark pass
/// shifted by `−(Δ, Δ)`, with `Δ = max(1, f·0.05)`.
pub fn text_passes(effect: WatermarkEffect, font_px: f32) -> Vec<TextPass> {
    let white = |a| rgba(255, 255, 255, a);
    let black = |a| rgba(0, 0, 0, a);
    match effect {
        WatermarkEffect::None => {
            vec![TextPass::fill(white(0.85)).with_shadow(black(0.6), 2.0, (1.0, 1.0))]
        }
        WatermarkEffect::Outline => {
            vec![TextPass::fill(white(0.85)).with_stroke(black(0.9), (font_px * 0.08).max(2.0))]
        }
        WatermarkEffect::Shadow => {
            vec![TextPass::fill(white(0.85)).with_shadow(black(0.8), 4.0, (2.0, 2.0))]
        }
        WatermarkEffect::Glow => vec![TextPass::fill(white(0.85)).with_shadow(
            white(0.7),
            (font_px * 0.2).max(8.0),
            (0.0, 0.0),
        )],
        WatermarkEffect::Emboss => {
            let d = (font_px * 0.05).max(1.0);
            vec![
                TextPass::fill(white(0.8)).offset_by(d, d),
                TextPass::fill(rgba(100, 100, 100, 0.8)).offset_by(-d, -d),
            ]
        }
        WatermarkEffect::Vintage => {
            vec![TextPass::fill(rgba(200, 180, 150, 0.9)).with_shadow(black(0.3), 2.0, (1.0, 1.0))]
        }
        WatermarkEffect::Neon => vec![TextPass::fill(rgba(0, 255, 255, 0.9)).with_shadow(
            rgba(0, 255, 255, 1.0),
            (font_px * 0.3).max(10.0),
            (0.0, 0.0),
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_effect_has_a_pass() {
        for effect in [
            WatermarkEffect::None,
            WatermarkEffect::Outline,
            WatermarkEffect::Shadow,
            WatermarkEffect::Glow,
            WatermarkEffect::Emboss,
            WatermarkEffect::Vintage,
            WatermarkEffect::Neon,
        ] {
            assert!(!text_passes(effect, 30.0).is_empty(), "{effect}");
        }
    }

    #[test]
    fn outline_width_has_floor() {
        let small = text_passes(WatermarkEffect::Outline, 10.0);
        assert_eq!(small[0].stroke.unwrap().width, 2.0);
        let big = text_passes(WatermarkEffect::Outline, 100.0);
        assert!((big[0].stroke.unwrap().width - 8.0).abs() < 1e-4);
    }

    #[test]
    fn emboss_passes_offset_in_opposite_directions() {
        let passes = text_passes(WatermarkEffect::Emboss, 40.0);
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].offset, (2.0, 2.0));
        assert_eq!(passes[1].offset, (-2.0, -2.0));
        assert!(passes[0].fill[0] > passes[1].fill[0]);
    }

    #[test]
    fn glow_blur_scales_with_font() {
        let passes = text_passes(WatermarkEffect::Glow, 100.0);
        assert!((passes[0].shadow.unwrap().blur - 20.0).abs() < 1e-4);
    }

    #[test]
    fn alpha_is_quantized_to_u8() {
        assert_eq!(rgba(1, 2, 3, 0.85)[3], 217);
        assert_eq!(rgba(1, 2, 3, 2.0)[3], 255);
    }

    #[test]
    fn bleed_covers_shadow_reach() {
        let pass = text_passes(WatermarkEffect::Shadow, 30.0)[0];
        assert_eq!(pass.bleed(), 8.0);
    }
}
