//! Assign TL/TR/BL/BR roles to merged finder candidates.
//!
//! The TL finder omits the white dot inside its dark center, so a 5x5
//! full-resolution patch at its centroid reads darker than the other three.
//! When that brightness gap is too small (or only two candidates survive),
//! a coordinate-extremes fallback takes over.

use crate::candidates::Candidate;
use cimbar_core::{get_rgb, luma, RgbImageView};

/// Candidate indices per role. `tl` and `br` are always set when
/// classification succeeds at all.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Roles {
    pub tl: Option<usize>,
    pub tr: Option<usize>,
    pub bl: Option<usize>,
    pub br: Option<usize>,
}

/// Mean luma of the 5x5 patch around `(x, y)` in the full-resolution image.
fn patch_mean_luma(src: &RgbImageView<'_>, x: f32, y: f32) -> f32 {
    let cx = x.round() as i32;
    let cy = y.round() as i32;
    let mut sum = 0u32;
    for dy in -2..=2 {
        for dx in -2..=2 {
            sum += luma(get_rgb(src, cx + dx, cy + dy)) as u32;
        }
    }
    sum as f32 / 25.0
}

/// Classify 2..=4 candidates into corner roles, preferring the brightness
/// strategy while the asymmetric TL finder is distinguishable.
pub(crate) fn classify_roles(
    full: &RgbImageView<'_>,
    cands: &[Candidate],
    tl_brightness_gap: f32,
) -> Option<Roles> {
    if cands.len() < 2 {
        return None;
    }

    let lumas: Vec<f32> = cands
        .iter()
        .map(|c| patch_mean_luma(full, c.x, c.y))
        .collect();

    let mut order: Vec<usize> = (0..cands.len()).collect();
    order.sort_by(|&a, &b| lumas[a].total_cmp(&lumas[b]));

    if cands.len() > 2 && lumas[order[1]] - lumas[order[0]] >= tl_brightness_gap {
        classify_from_tl(cands, order[0])
    } else {
        classify_by_extremes(cands)
    }
}

/// TL known: BR is the farthest candidate; the leftovers split by the sign
/// of the 2-D cross product against the TL->BR diagonal (screen
/// coordinates, y down: negative is TR, positive is BL).
fn classify_from_tl(cands: &[Candidate], tl: usize) -> Option<Roles> {
    let mut roles = Roles {
        tl: Some(tl),
        ..Roles::default()
    };

    let tx = cands[tl].x;
    let ty = cands[tl].y;
    let br = (0..cands.len()).filter(|&i| i != tl).max_by(|&a, &b| {
        let da = (cands[a].x - tx).hypot(cands[a].y - ty);
        let db = (cands[b].x - tx).hypot(cands[b].y - ty);
        da.total_cmp(&db)
    })?;
    roles.br = Some(br);

    let dx = cands[br].x - tx;
    let dy = cands[br].y - ty;
    for i in 0..cands.len() {
        if i == tl || i == br {
            continue;
        }
        let cross = dx * (cands[i].y - ty) - dy * (cands[i].x - tx);
        if cross < 0.0 {
            roles.tr.get_or_insert(i);
        } else {
            roles.bl.get_or_insert(i);
        }
    }
    Some(roles)
}

/// Coordinate-extremes fallback: TL minimizes x+y, BR maximizes it, and the
/// leftovers split by the sign of `x - y` relative to the TL/BR midpoint.
/// If two candidates land on the same side, the one farther from the
/// midline wins and the other is discarded.
fn classify_by_extremes(cands: &[Candidate]) -> Option<Roles> {
    let tl = (0..cands.len()).min_by(|&a, &b| {
        (cands[a].x + cands[a].y).total_cmp(&(cands[b].x + cands[b].y))
    })?;
    let br = (0..cands.len()).max_by(|&a, &b| {
        (cands[a].x + cands[a].y).total_cmp(&(cands[b].x + cands[b].y))
    })?;
    if tl == br {
        return None;
    }

    let mut roles = Roles {
        tl: Some(tl),
        br: Some(br),
        ..Roles::default()
    };

    let mid = (cands[tl].x - cands[tl].y + cands[br].x - cands[br].y) / 2.0;
    let mut best_tr: Option<(usize, f32)> = None;
    let mut best_bl: Option<(usize, f32)> = None;
    for i in 0..cands.len() {
        if i == tl || i == br {
            continue;
        }
        let d = cands[i].x - cands[i].y - mid;
        if d > 0.0 {
            if best_tr.map(|(_, bd)| d > bd).unwrap_or(true) {
                best_tr = Some((i, d));
            }
        } else if best_bl.map(|(_, bd)| d < bd).unwrap_or(true) {
            best_bl = Some((i, d));
        }
    }
    roles.tr = best_tr.map(|(i, _)| i);
    roles.bl = best_bl.map(|(i, _)| i);
    Some(roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimbar_core::RgbImage;

    fn cand(x: f32, y: f32) -> Candidate {
        Candidate {
            x,
            y,
            h_size: 24.0,
            v_size: 24.0,
            contrast: 200.0,
            hits: 4,
        }
    }

    /// Dark centers everywhere, with a white dot at every candidate except
    /// the first.
    fn test_image(cands: &[Candidate], dotless: usize) -> RgbImage {
        let mut img = RgbImage::new(512, 512);
        for (i, c) in cands.iter().enumerate() {
            if i != dotless {
                img.fill_rect(c.x as usize - 1, c.y as usize - 1, 3, 3, [255, 255, 255]);
            }
        }
        img
    }

    #[test]
    fn brightness_classification_finds_rotated_roles() {
        // barcode rotated ~90 degrees: physical TL sits top-right
        let cands = [
            cand(400.0, 100.0), // TL (dotless)
            cand(400.0, 400.0), // its TR neighbor, down the right edge
            cand(100.0, 100.0), // its BL neighbor
            cand(100.0, 400.0), // BR
        ];
        let img = test_image(&cands, 0);
        let roles = classify_roles(&img.view(), &cands, 20.0).expect("classified");
        assert_eq!(roles.tl, Some(0));
        assert_eq!(roles.br, Some(3));
        assert_eq!(roles.tr, Some(1));
        assert_eq!(roles.bl, Some(2));
    }

    #[test]
    fn extremes_fallback_orders_axis_aligned_grid() {
        // no brightness gap anywhere: all centers identical and dark
        let cands = [
            cand(100.0, 400.0),
            cand(400.0, 400.0),
            cand(100.0, 100.0),
            cand(400.0, 100.0),
        ];
        let img = RgbImage::new(512, 512);
        let roles = classify_roles(&img.view(), &cands, 20.0).expect("classified");
        assert_eq!(roles.tl, Some(2));
        assert_eq!(roles.br, Some(1));
        assert_eq!(roles.tr, Some(3));
        assert_eq!(roles.bl, Some(0));
    }

    #[test]
    fn two_candidates_use_extremes() {
        let cands = [cand(350.0, 360.0), cand(80.0, 90.0)];
        let img = RgbImage::new(512, 512);
        let roles = classify_roles(&img.view(), &cands, 20.0).expect("classified");
        assert_eq!(roles.tl, Some(1));
        assert_eq!(roles.br, Some(0));
        assert_eq!(roles.tr, None);
        assert_eq!(roles.bl, None);
    }

    #[test]
    fn single_candidate_is_rejected() {
        let cands = [cand(100.0, 100.0)];
        let img = RgbImage::new(512, 512);
        assert!(classify_roles(&img.view(), &cands, 20.0).is_none());
    }
}
