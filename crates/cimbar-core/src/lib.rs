//! Core types and utilities for cimbar barcode decoding.
//!
//! This crate is intentionally small and self-contained: wire-level
//! constants, the RGB buffer/view types the pipeline passes around,
//! bit-stream packing, and the projective geometry used to rectify a
//! photographed barcode. It does *not* depend on any concrete finder
//! locator or cell classifier.

mod bits;
mod cell;
mod consts;
mod homography;
mod image;
pub mod logger;
mod warp;

pub use bits::{read_be32, write_be32, BitReader, BitWriter};
pub use cell::{
    corner_sample_points, dot_half, dot_offset, draw_symbol_luma, draw_symbol_rgb, SYMBOL_COUNT,
};
pub use consts::{
    data_bytes_per_frame, grid_cells, is_finder_cell, raw_bytes_per_frame, rs_blocks_per_frame,
    usable_cells, BLOCK_DATA, BLOCK_TOTAL, CELL_SIZE, ECC_BYTES, FINDER_CELLS, FRAME_SIZES,
    PALETTE,
};
pub use homography::{
    corners_from_anchors, corners_from_diagonal, dest_quad, homography_from_quad, Homography,
    HomographyError, Quad,
};
pub use image::{crop, get_rgb, luma, resize_nearest, RgbImage, RgbImageView};
pub use warp::{warp_quad, warp_perspective};
