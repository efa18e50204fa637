//! Render one frame's raw bytes as an RGB tile image.

use cimbar_core::{
    draw_symbol_rgb, grid_cells, is_finder_cell, raw_bytes_per_frame, BitReader, RgbImage,
    CELL_SIZE, FINDER_CELLS, PALETTE,
};
use cimbar_crypto::CryptoError;
use cimbar_ecc::InterleaveError;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("raw frame of {got} bytes does not match the {expected}-byte capacity of a {frame_size}px frame")]
    RawLengthMismatch {
        got: usize,
        expected: usize,
        frame_size: u32,
    },
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Interleave(#[from] InterleaveError),
}

const WHITE: [u8; 3] = [255, 255, 255];
const BLACK: [u8; 3] = [0, 0, 0];

/// Paint a finder at cell origin `(cx, cy)`: a white 3x3-cell square with a
/// dark center cell. All finders except TL carry a small white dot inside
/// the center; the asymmetry breaks 90/180 degree ambiguity for decoders.
fn draw_finder(img: &mut RgbImage, cx: u32, cy: u32, with_dot: bool) {
    let ox = (cx * CELL_SIZE) as usize;
    let oy = (cy * CELL_SIZE) as usize;
    let span = (FINDER_CELLS * CELL_SIZE) as usize;
    img.fill_rect(ox, oy, span, span, WHITE);

    let c = CELL_SIZE as usize;
    img.fill_rect(ox + c, oy + c, c, c, BLACK);
    if with_dot {
        img.fill_rect(ox + c + 3, oy + c + 3, 2, 2, WHITE);
    }
}

/// Render `raw` (interleaved RS-coded frame bytes) into a square frame
/// image with finders in the corners and one colored, dotted tile per data
/// cell.
pub fn render_frame(raw: &[u8], frame_size: u32) -> Result<RgbImage, RenderError> {
    let expected = raw_bytes_per_frame(frame_size);
    if raw.len() != expected {
        return Err(RenderError::RawLengthMismatch {
            got: raw.len(),
            expected,
            frame_size,
        });
    }

    let cells = grid_cells(frame_size);
    let mut img = RgbImage::new(frame_size as usize, frame_size as usize);

    draw_finder(&mut img, 0, 0, false);
    draw_finder(&mut img, cells - FINDER_CELLS, 0, true);
    draw_finder(&mut img, 0, cells - FINDER_CELLS, true);
    draw_finder(&mut img, cells - FINDER_CELLS, cells - FINDER_CELLS, true);

    let mut reader = BitReader::new(raw);
    for row in 0..cells {
        for col in 0..cells {
            if is_finder_cell(row, col, cells) {
                continue;
            }
            let v = reader.read_bits(7);
            let color = ((v >> 4) & 0x7) as usize;
            let symbol = (v & 0xf) as u8;

            let ox = col * CELL_SIZE;
            let oy = row * CELL_SIZE;
            img.fill_rect(
                ox as usize,
                oy as usize,
                CELL_SIZE as usize,
                CELL_SIZE as usize,
                PALETTE[color],
            );
            draw_symbol_rgb(&mut img, ox, oy, symbol);
        }
    }
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimbar_core::{get_rgb, luma};

    #[test]
    fn rejects_wrong_raw_length() {
        assert!(matches!(
            render_frame(&[0u8; 10], 128),
            Err(RenderError::RawLengthMismatch { expected: 192, .. })
        ));
    }

    #[test]
    fn finder_geometry_is_asymmetric() {
        let raw = vec![0u8; raw_bytes_per_frame(128)];
        let img = render_frame(&raw, 128).unwrap();
        let v = img.view();

        // white rings, dark centers
        assert_eq!(get_rgb(&v, 4, 4), WHITE);
        assert_eq!(get_rgb(&v, 12, 12), BLACK);
        assert_eq!(get_rgb(&v, 127 - 4, 4), WHITE);

        // TL center has no dot; the other three do
        assert_eq!(get_rgb(&v, 12, 12), BLACK);
        let tr_dot = get_rgb(&v, 128 - 24 + 8 + 3, 8 + 3);
        assert_eq!(tr_dot, WHITE);
        let bl_dot = get_rgb(&v, 8 + 3, 128 - 24 + 8 + 3);
        assert_eq!(bl_dot, WHITE);
    }

    #[test]
    fn first_data_cell_carries_the_first_seven_bits() {
        let mut raw = vec![0u8; raw_bytes_per_frame(128)];
        // 1101 011 0... -> color 0b110 = 6, symbol 0b1011 = 11
        raw[0] = 0b1101_0110;
        let img = render_frame(&raw, 128).unwrap();
        let v = img.view();

        // first data cell is at row 0, col 3; its center holds the color
        let center = get_rgb(&v, 3 * 8 + 4, 4);
        assert_eq!(center, PALETTE[6]);
        // symbol 11 = 0b1011: only the TR corner (bit 2) is dotted
        assert!(luma(get_rgb(&v, 3 * 8 + 6, 2)) < 100);
        assert!(luma(get_rgb(&v, 3 * 8 + 2, 2)) > 100);
    }
}
