//! Byte-stride interleaving of a frame's raw bytes across RS blocks.
//!
//! Localized damage (an occluded corner, a smudge) that would blow past one
//! block's 16-symbol correction capacity gets spread across all N blocks,
//! each staying within capacity.

use crate::rs::{ReedSolomon, RsError};
use cimbar_core::BLOCK_TOTAL;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InterleaveError {
    #[error("raw frame of {got} bytes has a block shorter than its {ecc} parity bytes")]
    BlockTooShort { got: usize, ecc: usize },
    #[error("data of {got} bytes does not fill the frame capacity of {expected}")]
    DataLengthMismatch { got: usize, expected: usize },
    #[error(transparent)]
    Rs(#[from] RsError),
}

/// Total (data + parity) lengths of the RS blocks backing a frame of
/// `raw_len` interleaved bytes. All blocks are 255 bytes except a possibly
/// shorter final one.
pub fn frame_block_lens(raw_len: usize) -> Vec<usize> {
    let n = raw_len.div_ceil(BLOCK_TOTAL);
    (0..n)
        .map(|i| {
            if i + 1 < n {
                BLOCK_TOTAL
            } else {
                raw_len - BLOCK_TOTAL * (n - 1)
            }
        })
        .collect()
}

/// RS-encode `data` into `raw_len` interleaved frame bytes.
///
/// `data` must be exactly the frame's data capacity:
/// `raw_len - num_blocks * ecc_len`.
pub fn encode_frame(
    data: &[u8],
    raw_len: usize,
    rs: &ReedSolomon,
) -> Result<Vec<u8>, InterleaveError> {
    let lens = frame_block_lens(raw_len);
    let capacity: usize = lens
        .iter()
        .map(|&l| l.saturating_sub(rs.ecc_len()))
        .sum();
    if data.len() != capacity {
        return Err(InterleaveError::DataLengthMismatch {
            got: data.len(),
            expected: capacity,
        });
    }

    let mut blocks = Vec::with_capacity(lens.len());
    let mut offset = 0;
    for &len in &lens {
        if len < rs.ecc_len() {
            return Err(InterleaveError::BlockTooShort {
                got: len,
                ecc: rs.ecc_len(),
            });
        }
        let data_len = len - rs.ecc_len();
        blocks.push(rs.encode(&data[offset..offset + data_len])?);
        offset += data_len;
    }

    // Byte j of block i lands at stride position j*N + i; slots past a
    // short final block are skipped.
    let mut out = Vec::with_capacity(raw_len);
    for j in 0..BLOCK_TOTAL {
        for block in &blocks {
            if let Some(&b) = block.get(j) {
                out.push(b);
            }
        }
    }
    Ok(out)
}

/// De-interleave and RS-decode `raw` frame bytes back into plain data.
pub fn decode_frame(raw: &[u8], rs: &ReedSolomon) -> Result<Vec<u8>, InterleaveError> {
    let lens = frame_block_lens(raw.len());
    for &len in &lens {
        if len < rs.ecc_len() {
            return Err(InterleaveError::BlockTooShort {
                got: len,
                ecc: rs.ecc_len(),
            });
        }
    }

    let mut blocks: Vec<Vec<u8>> = lens.iter().map(|&l| Vec::with_capacity(l)).collect();
    let mut it = raw.iter();
    for j in 0..BLOCK_TOTAL {
        for (i, block) in blocks.iter_mut().enumerate() {
            if j < lens[i] {
                if let Some(&b) = it.next() {
                    block.push(b);
                }
            }
        }
    }

    let mut out = Vec::with_capacity(raw.len());
    for block in &blocks {
        out.extend(rs.decode(block)?);
    }
    Ok(out)
}
