//! Wire-level constants. These must be identical on every conforming
//! encoder and decoder; none of them are tunable.

/// Pixels per grid cell.
pub const CELL_SIZE: u32 = 8;

/// Supported square frame edge lengths, in pixels, in probe order.
pub const FRAME_SIZES: [u32; 4] = [128, 192, 256, 384];

/// Finder patterns span this many cells along each edge.
pub const FINDER_CELLS: u32 = 3;

/// Parity bytes per Reed-Solomon block.
pub const ECC_BYTES: usize = 32;

/// Total bytes per full Reed-Solomon block.
pub const BLOCK_TOTAL: usize = 255;

/// Data bytes per full Reed-Solomon block.
pub const BLOCK_DATA: usize = BLOCK_TOTAL - ECC_BYTES;

/// The fixed tile palette, indexed by the 3-bit color field of a cell.
pub const PALETTE: [[u8; 3]; 8] = [
    [0, 200, 200],
    [220, 40, 40],
    [30, 100, 220],
    [255, 130, 20],
    [200, 40, 200],
    [40, 200, 60],
    [230, 220, 40],
    [100, 20, 200],
];

/// Number of cells along one edge of the grid.
#[inline]
pub fn grid_cells(frame_size: u32) -> u32 {
    frame_size / CELL_SIZE
}

/// Data-carrying cells in a frame: the full grid minus the four 3x3 finders.
#[inline]
pub fn usable_cells(frame_size: u32) -> u32 {
    let n = grid_cells(frame_size);
    n * n - 4 * FINDER_CELLS * FINDER_CELLS
}

/// Bytes of interleaved RS-coded payload one frame carries (7 bits per cell,
/// truncated to whole bytes).
#[inline]
pub fn raw_bytes_per_frame(frame_size: u32) -> usize {
    usable_cells(frame_size) as usize * 7 / 8
}

/// Number of RS blocks the frame's raw bytes are interleaved across.
#[inline]
pub fn rs_blocks_per_frame(frame_size: u32) -> usize {
    raw_bytes_per_frame(frame_size).div_ceil(BLOCK_TOTAL)
}

/// Plain data bytes per frame once per-block parity is stripped.
#[inline]
pub fn data_bytes_per_frame(frame_size: u32) -> usize {
    raw_bytes_per_frame(frame_size) - rs_blocks_per_frame(frame_size) * ECC_BYTES
}

/// Whether grid position `(row, col)` falls inside one of the four finder
/// patterns and therefore carries no data.
#[inline]
pub fn is_finder_cell(row: u32, col: u32, cells: u32) -> bool {
    let f = FINDER_CELLS;
    let near_top = row < f;
    let near_bottom = row >= cells - f;
    let near_left = col < f;
    let near_right = col >= cells - f;
    (near_top || near_bottom) && (near_left || near_right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_geometry_matches_wire_tables() {
        // (frame size, usable cells, raw bytes, blocks, data bytes)
        let expected = [
            (128u32, 220u32, 192usize, 1usize, 160usize),
            (192, 540, 472, 2, 408),
            (256, 988, 864, 4, 736),
            (384, 2268, 1984, 8, 1728),
        ];
        for (size, cells, raw, blocks, data) in expected {
            assert_eq!(usable_cells(size), cells, "usable cells for {size}");
            assert_eq!(raw_bytes_per_frame(size), raw, "raw bytes for {size}");
            assert_eq!(rs_blocks_per_frame(size), blocks, "blocks for {size}");
            assert_eq!(data_bytes_per_frame(size), data, "data bytes for {size}");
        }
    }

    #[test]
    fn finder_cells_are_exactly_36() {
        for size in FRAME_SIZES {
            let n = grid_cells(size);
            let count = (0..n)
                .flat_map(|r| (0..n).map(move |c| (r, c)))
                .filter(|&(r, c)| is_finder_cell(r, c, n))
                .count();
            assert_eq!(count, 36);
        }
    }

    #[test]
    fn palette_has_eight_distinct_entries() {
        for i in 0..PALETTE.len() {
            for j in (i + 1)..PALETTE.len() {
                assert_ne!(PALETTE[i], PALETTE[j]);
            }
        }
    }
}
