//! The per-image strategy ladder: frame sizes x warp strategies -> bytes.

use crate::color::ColorMode;
use crate::config::TuningConfig;
use crate::sampler::sample_frame;
use cimbar_core::{
    corners_from_anchors, corners_from_diagonal, read_be32, resize_nearest, warp_quad, RgbImage,
    RgbImageView, FRAME_SIZES,
};
use cimbar_ecc::{decode_frame as decode_rs_frame, ReedSolomon};
use cimbar_locate::LocateResult;
use log::debug;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One successfully decoded frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Plain frame data, parity stripped.
    pub bytes: Vec<u8>,
    pub frame_size: u32,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError {
    #[error("no frame size or warp strategy produced a decodable frame")]
    FrameSizeMismatch,
}

enum Attempt {
    Decoded(Vec<u8>),
    RsFailed,
    GateFailed,
}

/// Decode one photo into one frame's bytes.
///
/// Tries the locked frame size (or all sizes in order), and per size the
/// 4-anchor warp, the 2-anchor warp, then crop+resize. A decode that trips
/// the quality gate is retried once through the LAB color path.
///
/// `expect_complete_payload` additionally requires the frame to start with
/// a self-consistent length prefix; single-shot decodes set it, live
/// multi-frame scans cannot (non-initial frames start with arbitrary
/// bytes).
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(photo, located, cfg), fields(width = photo.width, height = photo.height))
)]
pub fn decode_photo_frame(
    photo: &RgbImageView<'_>,
    located: &LocateResult,
    cfg: &TuningConfig,
    locked_frame_size: Option<u32>,
    expect_complete_payload: bool,
) -> Result<DecodedFrame, PipelineError> {
    let rs = ReedSolomon::with_default_ecc();
    let sizes: Vec<u32> = match locked_frame_size {
        Some(s) => vec![s],
        None => FRAME_SIZES.to_vec(),
    };
    let primary = if cfg.use_relative_color {
        ColorMode::Relative
    } else {
        ColorMode::Absolute
    };

    for &frame_size in &sizes {
        for rectified in strategies(photo, located, frame_size) {
            let view = rectified.view();
            let first = attempt(&view, frame_size, cfg, primary, &rs, expect_complete_payload);
            let outcome = match first {
                Attempt::GateFailed => {
                    debug!("pipeline: gate failed at {frame_size}, retrying with LAB");
                    attempt(
                        &view,
                        frame_size,
                        cfg,
                        ColorMode::Lab,
                        &rs,
                        expect_complete_payload,
                    )
                }
                other => other,
            };
            if let Attempt::Decoded(bytes) = outcome {
                return Ok(DecodedFrame { bytes, frame_size });
            }
        }
    }
    Err(PipelineError::FrameSizeMismatch)
}

/// The rectification strategies available for this locate result, best
/// first. Strategies whose anchors are missing or degenerate simply drop
/// out.
fn strategies(
    photo: &RgbImageView<'_>,
    located: &LocateResult,
    frame_size: u32,
) -> Vec<RgbImage> {
    let mut out = Vec::with_capacity(3);

    if let Some([tl, tr, bl, br]) = located.four_anchors() {
        if let Some(quad) = corners_from_anchors(tl, tr, bl, br, frame_size) {
            if let Ok(img) = warp_quad(photo, &quad, frame_size) {
                out.push(img);
            }
        }
    }

    if let Some((tl, br)) = located.diagonal() {
        if let Some(quad) = corners_from_diagonal(tl, br, frame_size) {
            if let Ok(img) = warp_quad(photo, &quad, frame_size) {
                out.push(img);
            }
        }
    }

    out.push(resize_nearest(
        &located.cropped.view(),
        frame_size as usize,
        frame_size as usize,
    ));
    out
}

fn attempt(
    rectified: &RgbImageView<'_>,
    frame_size: u32,
    cfg: &TuningConfig,
    mode: ColorMode,
    rs: &ReedSolomon,
    expect_complete_payload: bool,
) -> Attempt {
    let raw = sample_frame(rectified, frame_size, cfg, mode);
    let Ok(bytes) = decode_rs_frame(&raw, rs) else {
        return Attempt::RsFailed;
    };
    if bytes.is_empty() || !passes_gates(&bytes, expect_complete_payload) {
        return Attempt::GateFailed;
    }
    Attempt::Decoded(bytes)
}

/// Plausibility gates: an all-zero prefix means every block "decoded" to
/// nothing; a self-contained payload must carry a sane length prefix.
fn passes_gates(bytes: &[u8], expect_complete_payload: bool) -> bool {
    let probe = bytes.len().min(64);
    if bytes[..probe].iter().all(|&b| b == 0) {
        return false;
    }
    if expect_complete_payload {
        let Some(payload_len) = read_be32(bytes) else {
            return false;
        };
        let payload_len = payload_len as usize;
        if payload_len < 32 || payload_len > bytes.len().saturating_sub(4) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimbar_core::{data_bytes_per_frame, raw_bytes_per_frame};
    use cimbar_ecc::encode_frame;
    use cimbar_locate::{FrameLocator, Rect};
    use cimbar_render::render_frame;

    fn locate_result_for(img: &RgbImage) -> LocateResult {
        LocateResult {
            cropped: img.clone(),
            rect: Rect {
                x: 0,
                y: 0,
                size: img.width,
            },
            tl: None,
            tr: None,
            bl: None,
            br: None,
        }
    }

    fn encoded_frame(frame_size: u32, first_bytes: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut data = vec![0u8; data_bytes_per_frame(frame_size)];
        data[..first_bytes.len()].copy_from_slice(first_bytes);
        for (i, b) in data.iter_mut().enumerate().skip(first_bytes.len()) {
            *b = ((i * 67 + 13) & 0xff) as u8;
        }
        let rs = ReedSolomon::with_default_ecc();
        let raw = encode_frame(&data, raw_bytes_per_frame(frame_size), &rs).unwrap();
        (data, raw)
    }

    #[test]
    fn crop_resize_strategy_decodes_a_clean_frame() {
        let frame_size = 256u32;
        let (data, raw) = encoded_frame(frame_size, &[0, 0, 2, 0]);
        let img = render_frame(&raw, frame_size).unwrap();

        let located = locate_result_for(&img);
        let decoded = decode_photo_frame(
            &img.view(),
            &located,
            &TuningConfig::default(),
            None,
            false,
        )
        .expect("decodes");
        assert_eq!(decoded.frame_size, frame_size);
        assert_eq!(decoded.bytes, data);
    }

    #[test]
    fn locked_size_skips_probing() {
        let frame_size = 128u32;
        let (data, raw) = encoded_frame(frame_size, &[0, 0, 0, 100]);
        let img = render_frame(&raw, frame_size).unwrap();

        let located = locate_result_for(&img);
        let decoded = decode_photo_frame(
            &img.view(),
            &located,
            &TuningConfig::default(),
            Some(frame_size),
            false,
        )
        .expect("decodes");
        assert_eq!(decoded.bytes, data);

        // wrong lock cannot decode
        assert_eq!(
            decode_photo_frame(
                &img.view(),
                &located,
                &TuningConfig::default(),
                Some(384),
                false,
            )
            .err(),
            Some(PipelineError::FrameSizeMismatch)
        );
    }

    #[test]
    fn full_photo_decode_via_located_anchors() {
        let frame_size = 256u32;
        let (data, raw) = encoded_frame(frame_size, &[0, 0, 1, 42]);
        let frame = render_frame(&raw, frame_size).unwrap();

        // embed the frame into a larger dark photo
        let mut photo = RgbImage::new(480, 480);
        let off = 100usize;
        for y in 0..frame.height {
            for x in 0..frame.width {
                photo.set_pixel(
                    x + off,
                    y + off,
                    cimbar_core::get_rgb(&frame.view(), x as i32, y as i32),
                );
            }
        }

        let located = FrameLocator::default()
            .locate(&photo.view())
            .expect("locates");
        assert!(located.tl.is_some() && located.br.is_some());

        // the camera profile's drift-tracking hash matcher absorbs the
        // couple-of-pixel anchor error a located warp carries
        let decoded = decode_photo_frame(
            &photo.view(),
            &located,
            &TuningConfig::camera(),
            None,
            false,
        )
        .expect("decodes");
        assert_eq!(decoded.frame_size, frame_size);
        assert_eq!(decoded.bytes, data);
    }

    #[test]
    fn complete_payload_gate_rejects_bad_length_prefix() {
        let frame_size = 128u32;
        // length prefix far larger than one frame
        let (_, raw) = encoded_frame(frame_size, &[0xde, 0xad, 0xbe, 0xef]);
        let img = render_frame(&raw, frame_size).unwrap();
        let located = locate_result_for(&img);

        assert!(decode_photo_frame(
            &img.view(),
            &located,
            &TuningConfig::default(),
            Some(frame_size),
            true,
        )
        .is_err());

        // the same frame decodes fine in live mode
        assert!(decode_photo_frame(
            &img.view(),
            &located,
            &TuningConfig::default(),
            Some(frame_size),
            false,
        )
        .is_ok());
    }
}
