//! Von Kries chromatic adaptation anchored on the finder corner cells.
//!
//! The outermost corner cells of the TL and BR finders are white on the
//! wire, so whatever the camera reports there is the scene illuminant. The
//! per-channel max of the two observations tolerates one partially occluded
//! corner.

use cimbar_core::{get_rgb, grid_cells, luma, RgbImageView, CELL_SIZE};
use nalgebra::{Matrix3, Vector3};

fn von_kries() -> Matrix3<f64> {
    Matrix3::new(
        0.4002400, 0.7076000, -0.0808100, //
        -0.2263000, 1.1653200, 0.0457000, //
        0.0, 0.0, 0.9182200,
    )
}

/// Precomputed chromatic adaptation matrix for one rectified frame.
#[derive(Clone, Copy, Debug)]
pub struct WhiteBalance {
    adapt: Matrix3<f64>,
}

impl WhiteBalance {
    /// Estimate the illuminant from the white finder-corner cells of a
    /// rectified frame. `None` when the observation is too dark to trust.
    pub fn from_frame(img: &RgbImageView<'_>, frame_size: u32) -> Option<Self> {
        let cells = grid_cells(frame_size);
        let last = (cells - 1) * CELL_SIZE;

        let a = patch_mean(img, 2, 2);
        let b = patch_mean(img, last as i32 + 2, last as i32 + 2);
        let white = [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])];

        Self::from_observed_white([
            white[0].round() as u8,
            white[1].round() as u8,
            white[2].round() as u8,
        ])
    }

    /// Build the adaptation mapping `observed_white` to full white.
    pub fn from_observed_white(observed_white: [u8; 3]) -> Option<Self> {
        if luma(observed_white) < 30 {
            return None;
        }

        let vk = von_kries();
        let w = Vector3::new(
            observed_white[0] as f64,
            observed_white[1] as f64,
            observed_white[2] as f64,
        );
        let cone_w = vk * w;
        let cone_full = vk * Vector3::new(255.0, 255.0, 255.0);
        if cone_w.iter().any(|&c| c.abs() < 1e-6) {
            return None;
        }

        let gain = Matrix3::from_diagonal(&Vector3::new(
            cone_full[0] / cone_w[0],
            cone_full[1] / cone_w[1],
            cone_full[2] / cone_w[2],
        ));
        let inv = vk.try_inverse()?;
        Some(Self {
            adapt: inv * gain * vk,
        })
    }

    /// Adapt one pixel, clamping back into displayable range.
    #[inline]
    pub fn apply(&self, rgb: [u8; 3]) -> [u8; 3] {
        let v = self.adapt * Vector3::new(rgb[0] as f64, rgb[1] as f64, rgb[2] as f64);
        [
            v[0].round().clamp(0.0, 255.0) as u8,
            v[1].round().clamp(0.0, 255.0) as u8,
            v[2].round().clamp(0.0, 255.0) as u8,
        ]
    }
}

/// Mean RGB of the 4x4 patch with its top-left at `(x, y)`.
fn patch_mean(img: &RgbImageView<'_>, x: i32, y: i32) -> [f64; 3] {
    let mut sum = [0f64; 3];
    for dy in 0..4 {
        for dx in 0..4 {
            let p = get_rgb(img, x + dx, y + dy);
            for c in 0..3 {
                sum[c] += p[c] as f64;
            }
        }
    }
    sum.map(|s| s / 16.0)
}
