//! Shared test utilities for the framecache test suite.
//!
//! Builds synthetic frames and encoded fixtures in memory, so no test depends
//! on binary files checked into the repository.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let frame = gradient_frame(64, 48);
//! let png = encode_png(&frame);
//! let gif = animated_gif_bytes(&[frame.clone(), frame], 50);
//! ```

use crate::imaging::Frame;
use image::codecs::gif::GifEncoder;
use image::codecs::png::PngEncoder;
use image::{Delay, ExtendedColorType, ImageEncoder, RgbaImage};
use std::time::Duration;

// =========================================================================
// Frames
// =========================================================================

/// A frame filled with one RGBA color.
pub fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> Frame {
    let pixels = rgba
        .iter()
        .copied()
        .cycle()
        .take((width * height * 4) as usize)
        .collect();
    Frame::new(width, height, pixels).unwrap()
}

/// A frame whose red channel follows x and green channel follows y.
///
/// Every pixel differs from its neighbours, so crops and resizes are
/// observable in the output.
pub fn gradient_frame(width: u32, height: u32) -> Frame {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    Frame::new(width, height, img.into_raw()).unwrap()
}

// =========================================================================
// Encoded fixtures
// =========================================================================

/// Encode a frame as PNG.
pub fn encode_png(frame: &Frame) -> Vec<u8> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            frame.pixels(),
            frame.width(),
            frame.height(),
            ExtendedColorType::Rgba8,
        )
        .unwrap();
    bytes
}

/// Encode frames as an animated GIF with the `image` crate's own encoder.
///
/// Independent of [`crate::imaging::palette`] so decode tests do not rely on
/// the code under test to produce their input.
pub fn animated_gif_bytes(frames: &[Frame], delay_centis: u64) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        let delay = Delay::from_saturating_duration(Duration::from_millis(delay_centis * 10));
        let frames = frames.iter().map(|f| {
            let buffer = RgbaImage::from_raw(f.width(), f.height(), f.pixels().to_vec()).unwrap();
            image::Frame::from_parts(buffer, 0, 0, delay)
        });
        encoder.encode_frames(frames).unwrap();
    }
    bytes
}
