//! The encode side of the wire format: file -> encrypted payload -> frames
//! -> RGB images.
//!
//! The decoder tests drive everything through this crate instead of
//! shipping binary fixtures; it also backs the CLI encode path. Emits plain
//! RGB frames; animating them into a GIF is someone else's job.

mod frame;
mod payload;

pub use frame::{render_frame, RenderError};
pub use payload::{encode_frames, encode_payload, render_payload, split_frames};
