//! Stateful multi-frame scanner.
//!
//! Frames carry no identifiers; ordering falls out of two observations:
//! frame 0 is the only frame whose first four bytes read as a plausible
//! payload length, and a live feed shows frames in capture order, so the
//! first observed transition out of a frame names its successor. The
//! adjacency map is keyed by a 32-bit content fingerprint, and traversal is
//! a bounded walk with a visited set, never recursion.

use cimbar_core::{data_bytes_per_frame, read_be32, RgbImageView};
use cimbar_decode::{decode_photo_frame, TuningConfig};
use cimbar_locate::FrameLocator;
use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// FNV-1a over the first 64 bytes of a frame's decoded bytes.
pub type Fingerprint = u32;

/// Stable opaque key for deduplicating decoded frames.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut h: u32 = 0x811c_9dc5;
    for &b in bytes.iter().take(64) {
        h = (h ^ b as u32).wrapping_mul(0x0100_0193);
    }
    h
}

/// Progress snapshot after ingesting a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    pub unique_frames: usize,
    /// Known once frame 0 has been identified.
    pub total_frames: Option<usize>,
    pub complete: bool,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssembleError {
    #[error("frame chain is incomplete ({have}/{need} frames ordered)")]
    IncompleteChain { have: usize, need: usize },
    #[error("frame chain loops back on itself")]
    CycleDetected,
}

/// Multi-frame scan state. Single-owner; all mutation goes through
/// `process_*` and `reset`.
#[derive(Debug)]
pub struct Scanner {
    locator: FrameLocator,
    cfg: TuningConfig,
    frames: HashMap<Fingerprint, Vec<u8>>,
    adjacency: HashMap<Fingerprint, Fingerprint>,
    last: Option<Fingerprint>,
    frame0: Option<Fingerprint>,
    total_frames: usize,
    locked_frame_size: Option<u32>,
}

impl Scanner {
    pub fn new(cfg: TuningConfig) -> Self {
        Self {
            locator: FrameLocator::default(),
            cfg,
            frames: HashMap::new(),
            adjacency: HashMap::new(),
            last: None,
            frame0: None,
            total_frames: 0,
            locked_frame_size: None,
        }
    }

    /// Frame size locked in by the first successful decode.
    #[inline]
    pub fn locked_frame_size(&self) -> Option<u32> {
        self.locked_frame_size
    }

    /// Run the full locate + decode pipeline on one image and ingest the
    /// result. `None` means "no frame this tick": nothing located or
    /// nothing decodable, both unremarkable on a live feed.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img), fields(width = img.width, height = img.height))
    )]
    pub fn process_image(&mut self, img: &RgbImageView<'_>) -> Option<ScanProgress> {
        let located = self.locator.locate(img).ok()?;
        let decoded =
            decode_photo_frame(img, &located, &self.cfg, self.locked_frame_size, false).ok()?;
        self.locked_frame_size = Some(decoded.frame_size);
        Some(self.process_decoded(decoded.bytes, decoded.frame_size))
    }

    /// Ingest one already-decoded frame.
    pub fn process_decoded(&mut self, bytes: Vec<u8>, frame_size: u32) -> ScanProgress {
        let fp = fingerprint(&bytes);

        if let Some(prev) = self.last {
            if prev != fp {
                // first transition out of a frame wins; later cycles of the
                // feed cannot rewrite it
                self.adjacency.entry(prev).or_insert(fp);
            }
        }
        self.last = Some(fp);

        if !self.frames.contains_key(&fp) {
            if self.frame0.is_none() {
                self.probe_frame0(fp, &bytes, frame_size);
            }
            self.frames.insert(fp, bytes);
        }
        self.progress()
    }

    /// Accept `fp` as frame 0 if its first four bytes read as a plausible
    /// payload length for this frame size.
    fn probe_frame0(&mut self, fp: Fingerprint, bytes: &[u8], frame_size: u32) {
        let Some(payload_len) = read_be32(bytes) else {
            return;
        };
        let payload_len = payload_len as usize;
        let framed_len = payload_len + 4;
        let per_frame = data_bytes_per_frame(frame_size);
        let num_frames = framed_len.div_ceil(per_frame);
        if payload_len >= 32 && (1..=255).contains(&num_frames) {
            debug!("scanner: frame 0 found, expecting {num_frames} frames");
            self.frame0 = Some(fp);
            self.total_frames = num_frames;
        }
    }

    pub fn progress(&self) -> ScanProgress {
        ScanProgress {
            unique_frames: self.frames.len(),
            total_frames: (self.total_frames > 0).then_some(self.total_frames),
            complete: self.is_complete(),
        }
    }

    /// Whether the chain from frame 0 visits exactly `total_frames`
    /// distinct frames that have all been captured.
    pub fn is_complete(&self) -> bool {
        let Some(start) = self.frame0 else {
            return false;
        };
        self.frames.len() >= self.total_frames && self.walk_chain(start).is_ok()
    }

    fn walk_chain(&self, start: Fingerprint) -> Result<Vec<Fingerprint>, AssembleError> {
        let need = self.total_frames;
        let mut order = Vec::with_capacity(need);
        let mut seen = HashSet::with_capacity(need);
        let mut current = start;

        for i in 0..need {
            if !seen.insert(current) {
                return Err(AssembleError::CycleDetected);
            }
            if !self.frames.contains_key(&current) {
                return Err(AssembleError::IncompleteChain { have: i, need });
            }
            order.push(current);

            if i + 1 < need {
                match self.adjacency.get(&current) {
                    Some(&next) => current = next,
                    None => {
                        return Err(AssembleError::IncompleteChain { have: i + 1, need });
                    }
                }
            }
        }
        Ok(order)
    }

    /// Concatenate all frames in chain order.
    pub fn assemble(&self) -> Result<Vec<u8>, AssembleError> {
        let start = self.frame0.ok_or(AssembleError::IncompleteChain {
            have: 0,
            need: self.total_frames.max(1),
        })?;
        let order = self.walk_chain(start)?;

        let mut out = Vec::new();
        for fp in order {
            out.extend_from_slice(&self.frames[&fp]);
        }
        Ok(out)
    }

    /// Drop all scan state, keeping the configuration.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.adjacency.clear();
        self.last = None;
        self.frame0 = None;
        self.total_frames = 0;
        self.locked_frame_size = None;
    }
}
