//! Color filter chain.
//!
//! Adjustments are compiled into a short list of [`FilterStage`]s:
//!
//! | Adjustment | Stage |
//! |---|---|
//! | brightness, contrast, saturation, sepia | one [`ColorMatrix`] each |
//! | hue rotation | [`FilterStage::HueRotate`] in HSL space |
//! | blur | [`FilterStage::Blur`] (Gaussian, σ = radius) |
//!
//! Identity-valued adjustments contribute no stage at all, so a chain built
//! from identity parameters is empty and leaves pixels untouched. Matrix
//! coefficients follow the CSS Filter Effects definitions, operating on
//! channel values normalized to `0.0..=1.0`. Values are clamped after every
//! stage and only rounded back to 8 bits at the end.

use super::params::AdjustmentParameters;

/// 3×4 affine color transform: `out = M · [r, g, b] + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix {
    /// Rows are output channels; the fourth column is the constant offset.
    pub rows: [[f32; 4]; 3],
}

impl ColorMatrix {
    pub const IDENTITY: Self = Self {
        rows: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ],
    };

    /// Linear scale of every channel (`amount` 1.0 = identity).
    pub fn brightness(amount: f32) -> Self {
        Self {
            rows: [
                [amount, 0.0, 0.0, 0.0],
                [0.0, amount, 0.0, 0.0],
                [0.0, 0.0, amount, 0.0],
            ],
        }
    }

    /// Scale around mid-gray (`amount` 1.0 = identity).
    pub fn contrast(amount: f32) -> Self {
        let offset = 0.5 - 0.5 * amount;
        Self {
            rows: [
                [amount, 0.0, 0.0, offset],
                [0.0, amount, 0.0, offset],
                [0.0, 0.0, amount, offset],
            ],
        }
    }

    /// Luminance-preserving saturation (`amount` 1.0 = identity, 0.0 = gray).
    pub fn saturate(amount: f32) -> Self {
        let s = amount;
        Self {
            rows: [
                [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s, 0.0],
                [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s, 0.0],
                [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s, 0.0],
            ],
        }
    }

    /// Blend toward sepia tone (`amount` 0.0 = identity, 1.0 = full sepia).
    pub fn sepia(amount: f32) -> Self {
        let inv = 1.0 - amount.clamp(0.0, 1.0);
        Self {
            rows: [
                [0.393 + 0.607 * inv, 0.769 - 0.769 * inv, 0.189 - 0.189 * inv, 0.0],
                [0.349 - 0.349 * inv, 0.686 + 0.314 * inv, 0.168 - 0.168 * inv, 0.0],
                [0.272 - 0.272 * inv, 0.534 - 0.534 * inv, 0.131 + 0.869 * inv, 0.0],
            ],
        }
    }

    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let m = &self.rows;
        let [r, g, b] = rgb;
        [
            (m[0][0] * r + m[0][1] * g + m[0][2] * b + m[0][3]).clamp(0.0, 1.0),
            (m[1][0] * r + m[1][1] * g + m[1][2] * b + m[1][3]).clamp(0.0, 1.0),
            (m[2][0] * r + m[2][1] * g + m[2][2] * b + m[2][3]).clamp(0.0, 1.0),
        ]
    }

    pub fn is_identity(&self) -> bool {
        const EPSILON: f32 = 1e-6;
        self.rows
            .iter()
            .flatten()
            .zip(Self::IDENTITY.rows.iter().flatten())
            .all(|(a, b)| (a - b).abs() < EPSILON)
    }
}

/// One step of the filter chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterStage {
    Matrix(ColorMatrix),
    /// Hue rotation in degrees, applied in HSL space.
    HueRotate(f32),
    /// Gaussian blur with the given standard deviation in pixels.
    Blur(f32),
}

/// Ordered list of filter stages. Empty means identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    stages: Vec<FilterStage>,
}

impl FilterChain {
    pub fn identity() -> Self {
        Self::default()
    }

    /// Compile adjustments into stages in application order, skipping every
    /// identity value. Matrices stay separate so each result is clamped.
    pub fn from_adjustments(adjust: &AdjustmentParameters) -> Self {
        let a = adjust.clamped();
        let mut chain = Self::identity();
        if a.brightness != 100.0 {
            chain
                .stages
                .push(FilterStage::Matrix(ColorMatrix::brightness(a.brightness / 100.0)));
        }
        if a.contrast != 100.0 {
            chain
                .stages
                .push(FilterStage::Matrix(ColorMatrix::contrast(a.contrast / 100.0)));
        }
        if a.saturation != 100.0 {
            chain
                .stages
                .push(FilterStage::Matrix(ColorMatrix::saturate(a.saturation / 100.0)));
        }
        if a.hue_rotate_deg != 0.0 {
            chain.stages.push(FilterStage::HueRotate(a.hue_rotate_deg));
        }
        if a.sepia != 0.0 {
            chain
                .stages
                .push(FilterStage::Matrix(ColorMatrix::sepia(a.sepia / 100.0)));
        }
        if a.blur_radius_px > 0.0 {
            chain.stages.push(FilterStage::Blur(a.blur_radius_px));
        }
        chain
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn is_identity(&self) -> bool {
        self.stages.iter().all(|stage| match stage {
            FilterStage::Matrix(m) => m.is_identity(),
            FilterStage::HueRotate(deg) => deg.rem_euclid(360.0) == 0.0,
            FilterStage::Blur(sigma) => *sigma <= 0.0,
        })
    }

    /// Blur sigma, if the chain ends with a blur stage.
    pub fn blur_sigma(&self) -> Option<f32> {
        self.stages.iter().find_map(|stage| match stage {
            FilterStage::Blur(sigma) if *sigma > 0.0 => Some(*sigma),
            _ => None,
        })
    }

    /// Run every per-pixel (non-blur) stage on one RGB triple.
    pub fn apply_color(&self, rgb: [u8; 3]) -> [u8; 3] {
        let mut value = rgb.map(|c| f32::from(c) / 255.0);
        for stage in &self.stages {
            value = match stage {
                FilterStage::Matrix(m) => m.apply(value),
                FilterStage::HueRotate(deg) => rotate_hue(value, *deg),
                FilterStage::Blur(_) => value,
            };
        }
        value.map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8)
    }

    /// Whether any stage touches individual pixel colors.
    pub fn has_color_stages(&self) -> bool {
        self.stages
            .iter()
            .any(|s| !matches!(s, FilterStage::Blur(_)))
    }
}

/// Rotate the hue of a normalized RGB triple, keeping saturation and lightness.
pub fn rotate_hue(rgb: [f32; 3], degrees: f32) -> [f32; 3] {
    let (h, s, l) = rgb_to_hsl(rgb);
    if s == 0.0 {
        return rgb;
    }
    hsl_to_rgb(((h + degrees).rem_euclid(360.0), s, l))
}

/// Normalized RGB → (hue degrees, saturation, lightness).
pub fn rgb_to_hsl(rgb: [f32; 3]) -> (f32, f32, f32) {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let delta = max - min;
    if delta == 0.0 {
        return (0.0, 0.0, l);
    }
    let s = delta / (1.0 - (2.0 * l - 1.0).abs());
    let h = if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    (h, s.clamp(0.0, 1.0), l)
}

/// (hue degrees, saturation, lightness) → normalized RGB.
pub fn hsl_to_rgb(hsl: (f32, f32, f32)) -> [f32; 3] {
    let (h, s, l) = hsl;
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let h_prime = h.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (h_prime.rem_euclid(2.0) - 1.0).abs());
    let (r1, g1, b1) = match h_prime as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    [
        (r1 + m).clamp(0.0, 1.0),
        (g1 + m).clamp(0.0, 1.0),
        (b1 + m).clamp(0.0, 1.0),
    ]
}
