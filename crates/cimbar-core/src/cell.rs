//! Canonical symbol-cell geometry and drawing.
//!
//! A symbol index is a 4-bit mask over the cell's corners in TL, TR, BL, BR
//! order (TL is the most significant bit). A zero bit means a black dot is
//! painted at that corner; the cell center always stays clear so it can
//! carry the tile color.

use crate::consts::CELL_SIZE;
use crate::image::RgbImage;

/// Number of distinct corner-dot symbols.
pub const SYMBOL_COUNT: usize = 16;

/// Corner inset of the dot centers (and of the quadrant sample points).
#[inline]
pub fn dot_offset(cell_size: u32, quadrant_offset: f32) -> u32 {
    ((cell_size as f32 * quadrant_offset).floor() as u32).max(1)
}

/// Half-extent of a painted dot.
#[inline]
pub fn dot_half(offset: u32) -> u32 {
    ((offset as f32 * 0.75).floor() as u32).max(1)
}

/// The four corner sample positions of a cell, in mask-bit order
/// (TL, TR, BL, BR), relative to the cell origin.
#[inline]
pub fn corner_sample_points(cell_size: u32, q: u32) -> [(u32, u32); 4] {
    [
        (q, q),
        (cell_size - q, q),
        (q, cell_size - q),
        (cell_size - q, cell_size - q),
    ]
}

/// Paint `symbol`'s dots into an 8x8 luma patch (row-major, `cell_size^2`
/// bytes). Used both by the reference-hash construction and by tests.
pub fn draw_symbol_luma(cell: &mut [u8], cell_size: u32, symbol: u8) {
    let q = dot_offset(cell_size, 0.28);
    let h = dot_half(q);
    let corners = corner_sample_points(cell_size, q);
    for (bit, &(cx, cy)) in corners.iter().enumerate() {
        if symbol >> (3 - bit) & 1 == 1 {
            continue;
        }
        for y in cy.saturating_sub(h)..(cy + h).min(cell_size) {
            for x in cx.saturating_sub(h)..(cx + h).min(cell_size) {
                cell[(y * cell_size + x) as usize] = 0;
            }
        }
    }
}

/// Paint `symbol`'s dots in black over an already-colored cell at
/// `(ox, oy)` of `img`.
pub fn draw_symbol_rgb(img: &mut RgbImage, ox: u32, oy: u32, symbol: u8) {
    let q = dot_offset(CELL_SIZE, 0.28);
    let h = dot_half(q);
    let corners = corner_sample_points(CELL_SIZE, q);
    for (bit, &(cx, cy)) in corners.iter().enumerate() {
        if symbol >> (3 - bit) & 1 == 1 {
            continue;
        }
        let x0 = (ox + cx).saturating_sub(h) as usize;
        let y0 = (oy + cy).saturating_sub(h) as usize;
        img.fill_rect(x0, y0, 2 * h as usize, 2 * h as usize, [0, 0, 0]);
    }
}
