//! Palette quantization and GIF stream assembly.
//!
//! GIF stores at most 256 colors per frame, so every RGBA frame is reduced to
//! an indexed palette with NeuQuant (`color_quant`) before being written with
//! the `gif` encoder. These are the same two crates the `image` crate uses
//! for its own GIF path; calling them directly keeps quantization and frame
//! timing explicit.
//!
//! The first frame's palette becomes the global color table; later frames
//! carry local tables.

use super::backend::{BackendError, Frame};
use color_quant::NeuQuant;
use std::borrow::Cow;

/// NeuQuant sampling factor: 1 is slowest/best, 30 fastest/worst.
pub const QUANTIZER_SAMPLE_FACTOR: i32 = 10;

/// Maximum palette entries in a GIF color table.
pub const MAX_PALETTE_COLORS: usize = 256;

/// Alpha below which a pixel is written as transparent.
const ALPHA_THRESHOLD: u8 = 128;

/// A frame reduced to palette indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFrame {
    pub width: u16,
    pub height: u16,
    /// Packed RGB triples, at most [`MAX_PALETTE_COLORS`] entries.
    pub palette: Vec<u8>,
    /// One palette index per pixel, row-major.
    pub indices: Vec<u8>,
    pub transparent: Option<u8>,
}

impl IndexedFrame {
    pub fn color_count(&self) -> usize {
        self.palette.len() / 3
    }
}

fn gif_dimension(value: u32) -> Result<u16, BackendError> {
    u16::try_from(value)
        .map_err(|_| BackendError::Encode(format!("{value}px exceeds the GIF limit of 65535")))
}

/// Reduce `frame` to at most 256 colors and map every pixel to an index.
pub fn quantize(frame: &Frame) -> Result<IndexedFrame, BackendError> {
    let width = gif_dimension(frame.width())?;
    let height = gif_dimension(frame.height())?;

    let quant = NeuQuant::new(QUANTIZER_SAMPLE_FACTOR, MAX_PALETTE_COLORS, frame.pixels());
    let rgba_map = quant.color_map_rgba();

    let has_transparency = frame
        .pixels()
        .chunks_exact(4)
        .any(|px| px[3] < ALPHA_THRESHOLD);
    let transparent = if has_transparency {
        rgba_map
            .chunks_exact(4)
            .enumerate()
            .min_by_key(|(_, entry)| entry[3])
            .map(|(idx, _)| idx as u8)
    } else {
        None
    };

    let indices = frame
        .pixels()
        .chunks_exact(4)
        .map(|px| match transparent {
            Some(t) if px[3] < ALPHA_THRESHOLD => t,
            _ => quant.index_of(px) as u8,
        })
        .collect();

    Ok(IndexedFrame {
        width,
        height,
        palette: quant.color_map_rgb(),
        indices,
        transparent,
    })
}

/// Write indexed frames, in order, as a looping animated GIF.
///
/// All frames must share the first frame's dimensions. `delays_centis` holds
/// one delay per frame.
pub fn write_animation(frames: &[IndexedFrame], delays_centis: &[u16]) -> Result<Vec<u8>, BackendError> {
    let first = frames
        .first()
        .ok_or_else(|| BackendError::Encode("no frames to encode".into()))?;
    if delays_centis.len() != frames.len() {
        return Err(BackendError::Encode(format!(
            "{} delays given for {} frames",
            delays_centis.len(),
            frames.len()
        )));
    }

    let encode_err = |e: gif::EncodingError| BackendError::Encode(format!("GIF write failed: {e}"));

    let mut bytes = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut bytes, first.width, first.height, &first.palette)
            .map_err(encode_err)?;
        encoder
            .set_repeat(gif::Repeat::Infinite)
            .map_err(encode_err)?;

        for (position, (indexed, &delay)) in frames.iter().zip(delays_centis).enumerate() {
            if (indexed.width, indexed.height) != (first.width, first.height) {
                return Err(BackendError::Encode(format!(
                    "frame {position} is {}x{}, expected {}x{}",
                    indexed.width, indexed.height, first.width, first.height
                )));
            }
            let frame = gif::Frame {
                width: indexed.width,
                height: indexed.height,
                delay,
                dispose: gif::DisposalMethod::Background,
                transparent: indexed.transparent,
                palette: (position > 0).then(|| indexed.palette.clone()),
                buffer: Cow::Borrowed(&indexed.indices),
                ..gif::Frame::default()
            };
            encoder.write_frame(&frame).map_err(encode_err)?;
        }
        // Dropping the encoder writes the trailer.
    }
    Ok(bytes)
}

/// Whether `bytes` starts with a `GIF87a`/`GIF89a` signature.
pub fn has_gif_signature(bytes: &[u8]) -> bool {
    bytes.len() >= 6 && (&bytes[..6] == b"GIF89a" || &bytes[..6] == b"GIF87a")
}
