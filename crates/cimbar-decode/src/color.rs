//! Color classification strategies.
//!
//! Absolute matching weights the green channel heaviest (matching eye and
//! sensor sensitivity), relative matching stretches the observed channel
//! range before comparing channel differences, and LAB is the failover
//! when a decoded frame trips the quality gate.

use cimbar_core::PALETTE;
use std::sync::LazyLock;

/// Which color-distance space to classify in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    Absolute,
    Relative,
    Lab,
}

/// Index of the nearest palette color under the chosen mode.
pub fn classify_color(rgb: [u8; 3], mode: ColorMode) -> u8 {
    match mode {
        ColorMode::Absolute => classify_absolute(rgb),
        ColorMode::Relative => classify_relative(rgb),
        ColorMode::Lab => classify_lab(rgb),
    }
}

fn classify_absolute(rgb: [u8; 3]) -> u8 {
    let mut best = 0u8;
    let mut best_d = f32::MAX;
    for (i, p) in PALETTE.iter().enumerate() {
        let dr = rgb[0] as f32 - p[0] as f32;
        let dg = rgb[1] as f32 - p[1] as f32;
        let db = rgb[2] as f32 - p[2] as f32;
        let d = 2.0 * dr * dr + 4.0 * dg * dg + db * db;
        if d < best_d {
            best = i as u8;
            best_d = d;
        }
    }
    best
}

/// Stretch the pixel's channel range, then reduce to the three cyclic
/// channel differences. Lighting mostly cancels out of the differences.
fn relative_triple(rgb: [u8; 3]) -> [f32; 3] {
    let min_v = (rgb[0].min(rgb[1]).min(rgb[2])).min(48) as f32;
    let max_v = rgb[0].max(rgb[1]).max(rgb[2]) as f32;
    let scale = 255.0 / (max_v - min_v).max(1.0);
    let clamp_from = 245.0 - min_v;

    let stretch = |c: u8| -> f32 {
        let c = c as f32;
        if c >= clamp_from {
            255.0
        } else {
            ((c - min_v) * scale).clamp(0.0, 255.0)
        }
    };

    let r = stretch(rgb[0]);
    let g = stretch(rgb[1]);
    let b = stretch(rgb[2]);
    [r - g, g - b, b - r]
}

static RELATIVE_PALETTE: LazyLock<[[f32; 3]; 8]> =
    LazyLock::new(|| PALETTE.map(relative_triple));

fn classify_relative(rgb: [u8; 3]) -> u8 {
    let t = relative_triple(rgb);
    nearest_triple(&t, &*RELATIVE_PALETTE)
}

/// sRGB -> linear -> XYZ (D65) -> CIE LAB.
pub fn rgb_to_lab(rgb: [u8; 3]) -> [f32; 3] {
    fn linearize(c: u8) -> f32 {
        let c = c as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }

    let r = linearize(rgb[0]);
    let g = linearize(rgb[1]);
    let b = linearize(rgb[2]);

    let x = 0.4124564 * r + 0.3575761 * g + 0.1804375 * b;
    let y = 0.2126729 * r + 0.7151522 * g + 0.0721750 * b;
    let z = 0.0193339 * r + 0.1191920 * g + 0.9503041 * b;

    // D65 reference white
    let xn = x / 0.95047;
    let yn = y / 1.0;
    let zn = z / 1.08883;

    fn f(t: f32) -> f32 {
        const EPSILON: f32 = 0.008856;
        const KAPPA: f32 = 903.3;
        if t > EPSILON {
            t.cbrt()
        } else {
            (KAPPA * t + 16.0) / 116.0
        }
    }

    let fx = f(xn);
    let fy = f(yn);
    let fz = f(zn);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

static LAB_PALETTE: LazyLock<[[f32; 3]; 8]> = LazyLock::new(|| PALETTE.map(rgb_to_lab));

fn classify_lab(rgb: [u8; 3]) -> u8 {
    let t = rgb_to_lab(rgb);
    nearest_triple(&t, &*LAB_PALETTE)
}

fn nearest_triple(t: &[f32; 3], palette: &[[f32; 3]; 8]) -> u8 {
    let mut best = 0u8;
    let mut best_d = f32::MAX;
    for (i, p) in palette.iter().enumerate() {
        let d = (t[0] - p[0]).powi(2) + (t[1] - p[1]).powi(2) + (t[2] - p[2]).powi(2);
        if d < best_d {
            best = i as u8;
            best_d = d;
        }
    }
    best
}
