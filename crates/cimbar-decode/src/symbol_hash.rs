//! Perceptual average hashes for the 16 corner-dot symbols.
//!
//! The references are built once at first use by rendering each symbol onto
//! a mid-brightness cell and hashing it. The symbol alphabet guarantees a
//! minimum pairwise Hamming distance of 4 (one dot covers four pixels),
//! which is asserted at initialization.

use cimbar_core::{draw_symbol_luma, get_rgb, luma, RgbImageView, CELL_SIZE, SYMBOL_COUNT};
use std::sync::LazyLock;

const PATCH_PIXELS: usize = (CELL_SIZE * CELL_SIZE) as usize;
const REFERENCE_BACKGROUND: u8 = 180;

static REFERENCES: LazyLock<[u64; SYMBOL_COUNT]> = LazyLock::new(|| {
    let mut refs = [0u64; SYMBOL_COUNT];
    for (symbol, r) in refs.iter_mut().enumerate() {
        let mut cell = [REFERENCE_BACKGROUND; PATCH_PIXELS];
        draw_symbol_luma(&mut cell, CELL_SIZE, symbol as u8);
        *r = average_hash(&cell);
    }
    for i in 0..SYMBOL_COUNT {
        for j in (i + 1)..SYMBOL_COUNT {
            let d = (refs[i] ^ refs[j]).count_ones();
            assert!(d >= 4, "symbols {i} and {j} only {d} bits apart");
        }
    }
    refs
});

/// The 16 reference hashes, computed once per process.
#[inline]
pub fn reference_hashes() -> &'static [u64; SYMBOL_COUNT] {
    &REFERENCES
}

/// 64-bit average hash of an 8x8 luma patch: bit `k` is set when pixel `k`
/// is brighter than the patch mean.
pub fn average_hash(patch: &[u8; PATCH_PIXELS]) -> u64 {
    let mean = patch.iter().map(|&v| v as u32).sum::<u32>() as f32 / PATCH_PIXELS as f32;
    let mut hash = 0u64;
    for (k, &v) in patch.iter().enumerate() {
        if v as f32 > mean {
            hash |= 1 << k;
        }
    }
    hash
}

fn luma_patch(img: &RgbImageView<'_>, ox: i32, oy: i32) -> [u8; PATCH_PIXELS] {
    let mut patch = [0u8; PATCH_PIXELS];
    for y in 0..CELL_SIZE as i32 {
        for x in 0..CELL_SIZE as i32 {
            patch[(y * CELL_SIZE as i32 + x) as usize] = luma(get_rgb(img, ox + x, oy + y));
        }
    }
    patch
}

/// Best-matching symbol for the 8x8 cell at `(ox, oy)`.
pub fn detect_symbol(img: &RgbImageView<'_>, ox: i32, oy: i32) -> u8 {
    let hash = average_hash(&luma_patch(img, ox, oy));
    let refs = reference_hashes();
    let mut best = 0usize;
    let mut best_d = u32::MAX;
    for (s, &r) in refs.iter().enumerate() {
        let d = (hash ^ r).count_ones();
        if d < best_d {
            best = s;
            best_d = d;
        }
    }
    best as u8
}

/// A fuzzy symbol match and the sub-cell offset it was found at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FuzzyMatch {
    pub symbol: u8,
    /// Offset relative to the drift-adjusted cell origin.
    pub dx: i32,
    pub dy: i32,
    pub distance: u32,
}

// center first, then axes, then diagonals
const FUZZY_OFFSETS: [(i32, i32); 9] = [
    (0, 0),
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

/// Match the cell at `(ox, oy)` after applying the accumulated drift,
/// probing a 3x3 pixel neighborhood. Short-circuits on a perfect match.
/// `None` only when every probe position falls outside the image.
pub fn detect_symbol_fuzzy(
    img: &RgbImageView<'_>,
    ox: u32,
    oy: u32,
    drift_x: i32,
    drift_y: i32,
) -> Option<FuzzyMatch> {
    let base_x = ox as i32 + drift_x;
    let base_y = oy as i32 + drift_y;
    let refs = reference_hashes();

    let mut best: Option<FuzzyMatch> = None;
    for (dx, dy) in FUZZY_OFFSETS {
        let x = base_x + dx;
        let y = base_y + dy;
        if x < 0
            || y < 0
            || x + CELL_SIZE as i32 > img.width as i32
            || y + CELL_SIZE as i32 > img.height as i32
        {
            continue;
        }

        let hash = average_hash(&luma_patch(img, x, y));
        for (s, &r) in refs.iter().enumerate() {
            let d = (hash ^ r).count_ones();
            if best.map(|b| d < b.distance).unwrap_or(true) {
                best = Some(FuzzyMatch {
                    symbol: s as u8,
                    dx,
                    dy,
                    distance: d,
                });
            }
        }
        if let Some(b) = best {
            if b.distance == 0 {
                return Some(b);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimbar_core::{draw_symbol_rgb, RgbImage};

    #[test]
    fn references_are_mutually_distant() {
        let refs = reference_hashes();
        for i in 0..SYMBOL_COUNT {
            for j in (i + 1)..SYMBOL_COUNT {
                assert!((refs[i] ^ refs[j]).count_ones() >= 4);
            }
        }
    }

    #[test]
    fn undotted_symbol_hashes_to_zero() {
        // symbol 15 paints no dots, so every pixel equals the mean
        assert_eq!(reference_hashes()[15], 0);
    }

    fn cell_image(symbol: u8, background: [u8; 3]) -> RgbImage {
        let mut img = RgbImage::new(8, 8);
        img.fill_rect(0, 0, 8, 8, background);
        draw_symbol_rgb(&mut img, 0, 0, symbol);
        img
    }

    #[test]
    fn every_symbol_round_trips_on_colored_cells() {
        for symbol in 0..SYMBOL_COUNT as u8 {
            for bg in [[0u8, 200, 200], [230, 220, 40], [100, 20, 200]] {
                let img = cell_image(symbol, bg);
                assert_eq!(
                    detect_symbol(&img.view(), 0, 0),
                    symbol,
                    "symbol {symbol} on {bg:?}"
                );
            }
        }
    }

    #[test]
    fn fuzzy_match_reports_shifted_position() {
        // paint the symbol one pixel right and down of the cell origin
        let mut img = RgbImage::new(16, 16);
        img.fill_rect(0, 0, 16, 16, [0, 200, 200]);
        draw_symbol_rgb(&mut img, 1, 1, 6);

        let m = detect_symbol_fuzzy(&img.view(), 0, 0, 0, 0).expect("in bounds");
        assert_eq!(m.symbol, 6);
        assert_eq!((m.dx, m.dy), (1, 1));
        assert_eq!(m.distance, 0);
    }

    #[test]
    fn fuzzy_match_respects_existing_drift() {
        let mut img = RgbImage::new(24, 24);
        img.fill_rect(0, 0, 24, 24, [40, 200, 60]);
        draw_symbol_rgb(&mut img, 10, 9, 3);

        let m = detect_symbol_fuzzy(&img.view(), 8, 8, 2, 1).expect("in bounds");
        assert_eq!(m.symbol, 3);
        assert_eq!((m.dx, m.dy), (0, 0));
    }

    #[test]
    fn fully_out_of_bounds_is_none() {
        let img = RgbImage::new(4, 4);
        assert!(detect_symbol_fuzzy(&img.view(), 0, 0, 0, 0).is_none());
    }
}
