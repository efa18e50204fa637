//! Multi-frame scanning: per-frame decode results accumulate into an
//! ordered payload without any per-frame identifiers on the wire, then the
//! payload is opened and split back into a file.
//!
//! The [`worker`] module hosts the background worker and session-side
//! throttle for live camera feeds.

mod payload;
mod scanner;
pub mod worker;
mod yuv;

pub use payload::{decode_payload, DecodeResult, PayloadError};
pub use scanner::{fingerprint, AssembleError, Fingerprint, ScanProgress, Scanner};
pub use yuv::{rgb_to_yuv, yuv_to_rgb, YuvPlanes};
