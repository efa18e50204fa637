//! Finder-pattern location.
//!
//! Given a camera photo, find the 3x3-cell finder patterns, classify them
//! into TL/TR/BL/BR roles, and crop a square region enclosing the barcode.
//! The locator works on a half-resolution luma buffer and only returns to
//! the full-resolution image for the brightness-based role classification.

mod candidates;
mod classify;
mod locator;

pub use candidates::Candidate;
pub use locator::{FrameLocator, LocateError, LocateResult, LocatorParams, Rect};
