//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations every backend must
//! support: decode, resize, crop, and encode. Everything else in the crate
//! (thumbnail operations, the GIF composer, the coordinators) is written
//! against the trait, so tests can swap in a recording mock.
//!
//! The production implementation,
//! [`RustBackend`](super::rust_backend::RustBackend), is pure Rust, built on
//! the `image` crate.

use super::params::{EncodeParams, OutputFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A single decoded RGBA frame.
///
/// `pixels.len()` is always `width * height * 4`; the constructor enforces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "degenerate frame {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(BackendError::ProcessingFailed(format!(
                "frame {width}x{height} needs {expected} RGBA bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// Output of a decode: frames in animation order plus the detected container.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub frames: Vec<Frame>,
    /// Per-frame delays in milliseconds. Empty for static sources.
    pub delays_ms: Vec<u32>,
    /// `None` for containers that decode but cannot be re-encoded (e.g. TIFF).
    pub format: Option<OutputFormat>,
}

impl DecodedImage {
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }
}

/// Encoded bytes plus the matching `Content-Type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Trait for image processing backends.
///
/// Every backend must implement all four operations so the rest of the
/// codebase is backend-agnostic. Implementations are shared across request
/// tasks, hence `Send + Sync`.
pub trait ImageBackend: Send + Sync {
    /// Decode a supported container into one frame per animation frame.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError>;

    /// Cover-fit `frame` into exactly `width`×`height`.
    fn resize(&self, frame: &Frame, width: u32, height: u32) -> Result<Frame, BackendError>;

    /// Cut a `width`×`height` window at (`x`, `y`) without resampling.
    fn crop(
        &self,
        frame: &Frame,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Frame, BackendError>;

    /// Encode frames into a single container.
    fn encode(&self, frames: &[Frame], params: &EncodeParams)
    -> Result<EncodedImage, BackendError>;
}
