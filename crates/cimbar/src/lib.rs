//! High-level facade crate for the `cimbar-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the underlying decoder crates
//! - a public [`DecodeError`] covering every exit code of the decode
//!   boundary
//! - (feature-gated) end-to-end helpers that decode a single photo or an
//!   animated GIF straight to a file

pub use cimbar_core as core;
pub use cimbar_crypto as crypto;
pub use cimbar_decode as decode;
pub use cimbar_ecc as ecc;
pub use cimbar_locate as locate;
pub use cimbar_render as render;
pub use cimbar_scan as scan;

pub use cimbar_decode::TuningConfig;
pub use cimbar_scan::{DecodeResult, ScanProgress, Scanner};

mod error;
pub use error::DecodeError;

#[cfg(feature = "image")]
pub mod io;

use cimbar_core::RgbImageView;
use cimbar_decode::decode_photo_frame;
use cimbar_locate::FrameLocator;
use cimbar_scan::decode_payload;

/// Decode a single-shot photo of a complete (single-frame) barcode into
/// the original file.
pub fn decode_photo(
    img: &RgbImageView<'_>,
    passphrase: &str,
    cfg: &TuningConfig,
) -> Result<DecodeResult, DecodeError> {
    let located = FrameLocator::default().locate(img)?;
    let decoded = decode_photo_frame(img, &located, cfg, None, true)?;
    Ok(decode_payload(&decoded.bytes, passphrase)?)
}

/// Decode a sequence of frame images (for example from an animated GIF)
/// into the original file.
pub fn decode_frames<'a>(
    frames: impl IntoIterator<Item = RgbImageView<'a>>,
    passphrase: &str,
    cfg: &TuningConfig,
) -> Result<DecodeResult, DecodeError> {
    let mut scanner = Scanner::new(cfg.clone());
    let mut any_frame = false;
    for frame in frames {
        if scanner.process_image(&frame).is_some() {
            any_frame = true;
        }
        if scanner.is_complete() {
            break;
        }
    }
    if !any_frame {
        return Err(DecodeError::BarcodeNotFound);
    }
    let stream = scanner.assemble()?;
    Ok(decode_payload(&stream, passphrase)?)
}
