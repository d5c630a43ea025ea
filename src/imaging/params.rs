//! Parameter types for image operations.
//!
//! These types describe *what* to produce, not *how*. They are the interface
//! between the request layer (which validates user input into them) and the
//! [`backend`](super::backend) (which does the pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 80). Clamped on construction.
//! - [`OutputFormat`]: The four encodable containers, with content types and
//!   extension-based auto-detection.
//! - [`EncodeParams`]: Everything an encode needs: format, quality, frame delay.

use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    /// Strict constructor for request boundaries: out-of-range values are
    /// rejected instead of clamped.
    pub fn try_new(value: u32) -> Option<Self> {
        (1..=100).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Encodable output containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Gif => "gif",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Gif => "image/gif",
        }
    }

    /// Pick a format from the extension of a URL or file name.
    ///
    /// Query strings and fragments are ignored. Anything that is not
    /// `.gif`, `.png` or `.webp` falls back to JPEG.
    pub fn detect(source: &str) -> Self {
        let path = source.split(['?', '#']).next().unwrap_or(source);
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "gif" => OutputFormat::Gif,
            "png" => OutputFormat::Png,
            "webp" => OutputFormat::Webp,
            _ => OutputFormat::Jpeg,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            "gif" => Ok(OutputFormat::Gif),
            other => Err(format!(
                "unsupported format '{other}' (expected jpeg, png, webp or gif)"
            )),
        }
    }
}

/// Delay used for animated output when the source carries none.
pub const DEFAULT_ANIMATION_DELAY_MS: u32 = 100;

/// Parameters for an encode operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeParams {
    pub format: OutputFormat,
    pub quality: Quality,
    /// Delay of each frame of animated output, in order. Ignored for single
    /// frames. Frames past the end reuse the last delay.
    pub frame_delays_ms: Vec<u32>,
}

impl EncodeParams {
    /// Delay for the frame at `index`.
    pub fn delay_ms(&self, index: usize) -> u32 {
        self.frame_delays_ms
            .get(index)
            .or(self.frame_delays_ms.last())
            .copied()
            .unwrap_or(DEFAULT_ANIMATION_DELAY_MS)
    }
}
