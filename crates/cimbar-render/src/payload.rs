//! File -> encrypted payload -> per-frame byte chunks -> images.

use crate::frame::{render_frame, RenderError};
use cimbar_core::{data_bytes_per_frame, raw_bytes_per_frame, write_be32, RgbImage};
use cimbar_crypto::{encrypt, CryptoError};
use cimbar_ecc::{encode_frame, InterleaveError, ReedSolomon};

/// Build the framed payload: `lengthBE32 || envelope`, where the envelope
/// seals `nameLenBE32 || name || fileBytes` under the passphrase.
pub fn encode_payload(
    filename: &str,
    file_data: &[u8],
    passphrase: &str,
) -> Result<Vec<u8>, CryptoError> {
    let name = filename.as_bytes();
    let mut plaintext = Vec::with_capacity(4 + name.len() + file_data.len());
    plaintext.extend_from_slice(&write_be32(name.len() as u32));
    plaintext.extend_from_slice(name);
    plaintext.extend_from_slice(file_data);

    let envelope = encrypt(&plaintext, passphrase)?;
    let mut payload = Vec::with_capacity(4 + envelope.len());
    payload.extend_from_slice(&write_be32(envelope.len() as u32));
    payload.extend_from_slice(&envelope);
    Ok(payload)
}

/// Chunk a framed payload into per-frame data slices, zero-padding the
/// final frame up to the frame capacity.
pub fn split_frames(payload: &[u8], frame_size: u32) -> Vec<Vec<u8>> {
    let capacity = data_bytes_per_frame(frame_size);
    let mut frames: Vec<Vec<u8>> = payload
        .chunks(capacity)
        .map(|chunk| {
            let mut frame = chunk.to_vec();
            frame.resize(capacity, 0);
            frame
        })
        .collect();
    if frames.is_empty() {
        frames.push(vec![0; capacity]);
    }
    frames
}

/// RS-encode and interleave each frame chunk into raw frame bytes.
pub fn encode_frames(payload: &[u8], frame_size: u32) -> Result<Vec<Vec<u8>>, InterleaveError> {
    let rs = ReedSolomon::with_default_ecc();
    let raw_len = raw_bytes_per_frame(frame_size);
    split_frames(payload, frame_size)
        .iter()
        .map(|frame| encode_frame(frame, raw_len, &rs))
        .collect()
}

/// Full encode chain: file -> sealed payload -> rendered frame images.
pub fn render_payload(
    filename: &str,
    file_data: &[u8],
    passphrase: &str,
    frame_size: u32,
) -> Result<Vec<RgbImage>, RenderError> {
    let payload = encode_payload(filename, file_data, passphrase)?;
    let frames = encode_frames(&payload, frame_size)?;
    frames
        .iter()
        .map(|raw| render_frame(raw, frame_size))
        .collect()
}
