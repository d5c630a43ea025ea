//! Typed requests, validated once at the HTTP boundary.
//!
//! Handlers receive raw strings; everything past this module sees only
//! [`TransformRequest`] and [`GifAssemblyRequest`], whose fields are already
//! range-checked.
//!
//! ## Cache keys
//!
//! A [`CacheKey`] is derived from every field that affects the output, in a
//! fixed order:
//!
//! ```text
//! <url>|<width>x<height>|<format>|q<quality>
//! ```
//!
//! The format is always the resolved one, so a request that relied on
//! auto-detection and one that named the same format explicitly share a key.

use crate::config::{GifConfig, ThumbnailConfig};
use crate::error::PipelineError;
use crate::imaging::{Frame, OutputFormat, Quality};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Inclusive bounds for a caller-supplied frame delay, in milliseconds.
pub const FRAME_DELAY_RANGE_MS: std::ops::RangeInclusive<u32> = 10..=10_000;

/// Deterministic fingerprint of a [`TransformRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SHA-256 of the key string, quoted for use as an `ETag`.
    pub fn etag(&self) -> String {
        format!("\"{:x}\"", Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated, immutable thumbnail/transcode request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    source_url: String,
    width: u32,
    height: u32,
    format: OutputFormat,
    quality: Quality,
}

impl TransformRequest {
    /// Build a request. `format: None` auto-detects from the URL extension.
    pub fn new(
        source_url: impl Into<String>,
        width: u32,
        height: u32,
        format: Option<OutputFormat>,
        quality: Quality,
    ) -> Result<Self, PipelineError> {
        let source_url = source_url.into();
        validate_url(&source_url)?;
        if width == 0 || height == 0 {
            return Err(PipelineError::validation(format!(
                "width and height must be positive (got {width}x{height})"
            )));
        }
        let format = format.unwrap_or_else(|| OutputFormat::detect(&source_url));
        Ok(Self {
            source_url,
            width,
            height,
            format,
            quality,
        })
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey(format!(
            "{}|{}x{}|{}|q{}",
            self.source_url,
            self.width,
            self.height,
            self.format,
            self.quality.value()
        ))
    }
}

fn validate_url(url: &str) -> Result<(), PipelineError> {
    if url.trim().is_empty() {
        return Err(PipelineError::validation("Missing required parameter: url"));
    }
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| PipelineError::validation(format!("Invalid url '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(PipelineError::validation(format!(
            "Invalid url '{url}': unsupported scheme '{other}'"
        ))),
    }
}

/// Raw `/thumbnail` query string. Every field stays a string so malformed
/// numbers produce our JSON error instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ThumbnailQuery {
    pub url: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub format: Option<String>,
    pub quality: Option<String>,
}

fn parse_number(name: &str, raw: Option<&str>, default: u32) -> Result<u32, PipelineError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(s) => s.parse().map_err(|_| {
            PipelineError::validation(format!("Invalid {name} '{s}': expected a positive integer"))
        }),
    }
}

impl ThumbnailQuery {
    pub fn validate(&self, defaults: &ThumbnailConfig) -> Result<TransformRequest, PipelineError> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| PipelineError::validation("Missing required parameter: url"))?;

        let width = parse_number("width", self.width.as_deref(), defaults.default_width)?;
        let height = parse_number("height", self.height.as_deref(), defaults.default_height)?;
        for (name, value) in [("width", width), ("height", height)] {
            if value == 0 || value > defaults.max_dimension {
                return Err(PipelineError::validation(format!(
                    "Invalid {name} {value}: must be between 1 and {}",
                    defaults.max_dimension
                )));
            }
        }

        let quality = parse_number("quality", self.quality.as_deref(), defaults.default_quality)?;
        let quality = Quality::try_new(quality).ok_or_else(|| {
            PipelineError::validation(format!("Invalid quality {quality}: must be between 1 and 100"))
        })?;

        let format = match self.format.as_deref().map(str::trim) {
            None | Some("") | Some("auto") => None,
            Some(name) => Some(
                name.parse::<OutputFormat>()
                    .map_err(|e| PipelineError::validation(format!("Invalid format: {e}")))?,
            ),
        };

        TransformRequest::new(url, width, height, format, quality)
    }
}

/// Parse the `frameDelay` form field. Absent or blank means the default.
pub fn parse_frame_delay(raw: Option<&str>, default_ms: u32) -> Result<u32, PipelineError> {
    let delay = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => return Ok(default_ms),
        Some(s) => s.parse::<u32>().map_err(|_| {
            PipelineError::validation(format!("Invalid frameDelay '{s}': expected milliseconds"))
        })?,
    };
    if !FRAME_DELAY_RANGE_MS.contains(&delay) {
        return Err(PipelineError::validation(format!(
            "Invalid frameDelay {delay}ms: must be between {} and {} ms",
            FRAME_DELAY_RANGE_MS.start(),
            FRAME_DELAY_RANGE_MS.end()
        )));
    }
    Ok(delay)
}

/// Size of one uploaded file, in upload order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSize {
    pub index: usize,
    pub bytes: u64,
}

/// Check upload count and per-file size limits before anything is decoded.
pub fn validate_uploads(sizes: &[UploadSize], limits: &GifConfig) -> Result<(), PipelineError> {
    if sizes.is_empty() {
        return Err(PipelineError::validation(
            "No images uploaded: send 1 or more files in the 'images' field",
        ));
    }
    if sizes.len() > limits.max_frames {
        return Err(PipelineError::validation(format!(
            "Too many images: {} uploaded, at most {} allowed",
            sizes.len(),
            limits.max_frames
        )));
    }
    if let Some(over) = sizes.iter().find(|s| s.bytes > limits.max_frame_bytes) {
        return Err(PipelineError::validation(format!(
            "Image {} is {} bytes, which exceeds the {} byte limit",
            over.index, over.bytes, limits.max_frame_bytes
        )));
    }
    Ok(())
}

/// Decoded frames plus the validated delay, ready for the composer.
#[derive(Debug, Clone)]
pub struct GifAssemblyRequest {
    pub frames: Vec<Frame>,
    pub frame_delay_ms: u32,
}

impl GifAssemblyRequest {
    pub fn new(frames: Vec<Frame>, frame_delay_ms: u32) -> Result<Self, PipelineError> {
        if frames.is_empty() {
            return Err(PipelineError::validation("At least one frame is required"));
        }
        if !FRAME_DELAY_RANGE_MS.contains(&frame_delay_ms) {
            return Err(PipelineError::validation(format!(
                "Invalid frameDelay {frame_delay_ms}ms: must be between {} and {} ms",
                FRAME_DELAY_RANGE_MS.start(),
                FRAME_DELAY_RANGE_MS.end()
            )));
        }
        Ok(Self {
            frames,
            frame_delay_ms,
        })
    }
}
