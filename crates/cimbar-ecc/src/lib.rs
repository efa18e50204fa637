//! Error-correction coding for cimbar frames.
//!
//! - [`gf256`]: GF(2^8) field tables and polynomial arithmetic,
//! - [`ReedSolomon`]: systematic RS(255, 255-e) codec,
//! - [`encode_frame`]/[`decode_frame`]: byte-stride interleaving of a
//!   frame's raw bytes across multiple RS blocks.

pub mod gf256;
mod interleave;
mod rs;

pub use interleave::{decode_frame, encode_frame, frame_block_lens, InterleaveError};
pub use rs::{ReedSolomon, RsError};
