//! Adapters between the `image` crate and the workspace's buffer types,
//! plus GIF-source decoding.

use crate::{decode_frames, DecodeError, DecodeResult, TuningConfig};
use cimbar_core::RgbImage;
use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use std::io::Cursor;

/// Convert an `image::RgbImage` into the workspace's own buffer type.
pub fn from_rgb8(img: &image::RgbImage) -> RgbImage {
    RgbImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

/// Convert an RGBA buffer, dropping alpha.
pub fn from_rgba8(img: &image::RgbaImage) -> RgbImage {
    let mut out = RgbImage::new(img.width() as usize, img.height() as usize);
    for (x, y, px) in img.enumerate_pixels() {
        out.set_pixel(x as usize, y as usize, [px[0], px[1], px[2]]);
    }
    out
}

/// Convert a workspace buffer back into an `image::RgbImage` (encode/demo
/// output path).
pub fn to_rgb8(img: &RgbImage) -> Option<image::RgbImage> {
    image::RgbImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
}

/// Decode every frame of a GIF byte stream independently; frame disposal
/// modes are irrelevant because each frame is a complete barcode.
pub fn gif_frames(bytes: &[u8]) -> Result<Vec<RgbImage>, DecodeError> {
    let decoder =
        GifDecoder::new(Cursor::new(bytes)).map_err(|e| DecodeError::BadImage(e.to_string()))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| DecodeError::BadImage(e.to_string()))?;
    Ok(frames
        .iter()
        .map(|frame| from_rgba8(frame.buffer()))
        .collect())
}

/// Decode an animated (or single-frame) GIF barcode into the original
/// file.
pub fn decode_gif(
    bytes: &[u8],
    passphrase: &str,
    cfg: &TuningConfig,
) -> Result<DecodeResult, DecodeError> {
    let frames = gif_frames(bytes)?;
    decode_frames(frames.iter().map(|f| f.view()), passphrase, cfg)
}
