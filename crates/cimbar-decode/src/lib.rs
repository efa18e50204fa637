//! Rectified-frame decoding: symbol hashing, color classification, cell
//! sampling, and the strategy ladder that turns one photo into one frame's
//! bytes.

mod color;
mod config;
mod pipeline;
mod sampler;
mod symbol_hash;
mod white_balance;

pub use color::{classify_color, rgb_to_lab, ColorMode};
pub use config::TuningConfig;
pub use pipeline::{decode_photo_frame, DecodedFrame, PipelineError};
pub use sampler::sample_frame;
pub use symbol_hash::{
    average_hash, detect_symbol, detect_symbol_fuzzy, reference_hashes, FuzzyMatch,
};
pub use white_balance::WhiteBalance;
