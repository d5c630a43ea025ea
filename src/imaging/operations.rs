//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take a validated request, compute parameters, and call the backend.

use super::backend::{BackendError, DecodedImage, EncodedImage, ImageBackend};
use super::params::{DEFAULT_ANIMATION_DELAY_MS, EncodeParams, OutputFormat};
use crate::request::TransformRequest;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Plan the encode step for a decoded source.
///
/// Animated sources keep each frame's own delay when the output is GIF.
/// Frames without a delay get [`DEFAULT_ANIMATION_DELAY_MS`].
pub fn plan_encode(decoded: &DecodedImage, request: &TransformRequest) -> EncodeParams {
    let frame_delays_ms = decoded
        .delays_ms
        .iter()
        .map(|&d| if d > 0 { d } else { DEFAULT_ANIMATION_DELAY_MS })
        .collect();

    EncodeParams {
        format: request.format(),
        quality: request.quality(),
        frame_delays_ms,
    }
}

/// Decode `source`, cover-fit it to the request box, and re-encode.
///
/// For GIF output every source frame is resized so animations survive;
/// other formats only process the first frame.
pub fn create_thumbnail(
    backend: &dyn ImageBackend,
    source: &[u8],
    request: &TransformRequest,
) -> Result<EncodedImage> {
    let decoded = backend.decode(source)?;
    let params = plan_encode(&decoded, request);

    let keep = if params.format == OutputFormat::Gif {
        decoded.frames.len()
    } else {
        1
    };

    let resized = decoded
        .frames
        .iter()
        .take(keep)
        .map(|frame| backend.resize(frame, request.width(), request.height()))
        .collect::<Result<Vec<_>>>()?;

    backend.encode(&resized, &params)
}
