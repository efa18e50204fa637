//! Cell sampling: walk the grid row-major, classify each data cell's color
//! and symbol, and pack `(color << 4) | symbol` as 7 bits per cell into an
//! MSB-first byte stream.

use crate::color::{classify_color, ColorMode};
use crate::config::TuningConfig;
use crate::symbol_hash::{detect_symbol, detect_symbol_fuzzy};
use crate::white_balance::WhiteBalance;
use cimbar_core::{
    corner_sample_points, dot_offset, get_rgb, grid_cells, is_finder_cell, luma,
    raw_bytes_per_frame, BitWriter, RgbImageView, CELL_SIZE,
};

const MAX_DRIFT: i32 = 7;

/// Decode every data cell of a rectified frame into raw (interleaved,
/// RS-coded) frame bytes.
pub fn sample_frame(
    img: &RgbImageView<'_>,
    frame_size: u32,
    cfg: &TuningConfig,
    mode: ColorMode,
) -> Vec<u8> {
    let wb = if cfg.enable_white_balance {
        WhiteBalance::from_frame(img, frame_size)
    } else {
        None
    };

    let mut writer = BitWriter::new();
    if cfg.use_hash_detection {
        sample_hash_two_pass(img, frame_size, mode, wb, &mut writer);
    } else {
        sample_quadrant(img, frame_size, cfg, mode, wb, &mut writer);
    }

    let mut bytes = writer.into_bytes();
    bytes.truncate(raw_bytes_per_frame(frame_size));
    bytes
}

/// Single pass: threshold the four quadrant points against the cell center.
fn sample_quadrant(
    img: &RgbImageView<'_>,
    frame_size: u32,
    cfg: &TuningConfig,
    mode: ColorMode,
    wb: Option<WhiteBalance>,
    writer: &mut BitWriter,
) {
    let cells = grid_cells(frame_size);
    let q = dot_offset(CELL_SIZE, cfg.quadrant_offset);
    let corners = corner_sample_points(CELL_SIZE, q);
    let half = (CELL_SIZE / 2) as i32;

    for row in 0..cells {
        for col in 0..cells {
            if is_finder_cell(row, col, cells) {
                continue;
            }
            let ox = (col * CELL_SIZE) as i32;
            let oy = (row * CELL_SIZE) as i32;

            let center_luma = luma(get_rgb(img, ox + half, oy + half)) as f32;
            let threshold = match cfg.symbol_threshold {
                // multiplicative: scales with exposure on the camera path
                Some(t) => t * center_luma,
                // additive: exact source-side pixel colors
                None => 0.5 * center_luma + 20.0,
            };

            let mut symbol = 0u8;
            for &(cx, cy) in &corners {
                let l = luma(get_rgb(img, ox + cx as i32, oy + cy as i32)) as f32;
                symbol = (symbol << 1) | (l > threshold) as u8;
            }

            let mut rgb = get_rgb(img, ox + half, oy + half);
            if let Some(wb) = &wb {
                rgb = wb.apply(rgb);
            }
            let color = classify_color(rgb, mode);

            writer.write_bits(((color as u32) << 4) | symbol as u32, 7);
        }
    }
}

struct CellRecord {
    symbol: u8,
    drift_x: i32,
    drift_y: i32,
    ox: u32,
    oy: u32,
}

/// Two passes: symbols first via fuzzy hash matching with drift tracking,
/// then colors at the drift-corrected centers. Per-cell drift is only known
/// after hash matching, so a single pass would sample colors off-center on
/// any perspective-distorted image.
fn sample_hash_two_pass(
    img: &RgbImageView<'_>,
    frame_size: u32,
    mode: ColorMode,
    wb: Option<WhiteBalance>,
    writer: &mut BitWriter,
) {
    let cells = grid_cells(frame_size);

    let mut drift_x = 0i32;
    let mut drift_y = 0i32;
    let mut records = Vec::with_capacity((cells * cells) as usize);

    for row in 0..cells {
        for col in 0..cells {
            if is_finder_cell(row, col, cells) {
                continue;
            }
            let ox = col * CELL_SIZE;
            let oy = row * CELL_SIZE;

            let symbol = match detect_symbol_fuzzy(img, ox, oy, drift_x, drift_y) {
                Some(m) => {
                    drift_x = (drift_x + m.dx).clamp(-MAX_DRIFT, MAX_DRIFT);
                    drift_y = (drift_y + m.dy).clamp(-MAX_DRIFT, MAX_DRIFT);
                    m.symbol
                }
                None => detect_symbol(img, ox as i32, oy as i32),
            };
            records.push(CellRecord {
                symbol,
                drift_x,
                drift_y,
                ox,
                oy,
            });
        }
    }

    let half = (CELL_SIZE / 2) as i32;
    for rec in records {
        let x = (rec.ox as i32 + rec.drift_x + half).clamp(0, img.width as i32 - 1);
        let y = (rec.oy as i32 + rec.drift_y + half).clamp(0, img.height as i32 - 1);
        let mut rgb = get_rgb(img, x, y);
        if let Some(wb) = &wb {
            rgb = wb.apply(rgb);
        }
        let color = classify_color(rgb, mode);
        writer.write_bits(((color as u32) << 4) | rec.symbol as u32, 7);
    }
}
