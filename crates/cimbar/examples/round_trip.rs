//! In-memory encode/decode round trip: file -> frames -> scan -> file.
//!
//! ```sh
//! cargo run --example round_trip
//! ```

use cimbar::{decode_frames, TuningConfig};
use cimbar_render::render_payload;

fn main() {
    let file: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
    let frames = render_payload("example.bin", &file, "hunter2", 256).expect("encode");
    println!("encoded into {} frames", frames.len());

    let result = decode_frames(
        frames.iter().map(|f| f.view()),
        "hunter2",
        &TuningConfig::default(),
    )
    .expect("decode");

    assert_eq!(result.data, file);
    println!("recovered {} ({} bytes)", result.filename, result.data.len());
}
