//! Animated GIF assembly from independently sized, pre-filtered frames.
//!
//! ```text
//! audit sizes → tolerance check → crop to smallest → quantize → delay floor → write → sanity check
//! ```
//!
//! Frames are only ever cropped here, never rescaled or color-adjusted.
//! Client-side filtering may leave frames a pixel or two apart, so sizes
//! within the tolerance of the smallest frame are trimmed flush left and
//! centered vertically; anything further apart is rejected.

use crate::config::{GIF_DELAY_FLOOR_MS, GifConfig};
use crate::error::PipelineError;
use crate::imaging::calculations::{CropAnchor, crop_origin, encoded_delay_centis, exceeds_tolerance};
use crate::imaging::palette::{self, IndexedFrame};
use crate::imaging::{EncodedImage, Frame, ImageBackend, OutputFormat};
use crate::request::GifAssemblyRequest;
use rayon::prelude::*;

/// Header (6) plus logical screen descriptor (7).
const GIF_PREAMBLE_BYTES: usize = 13;
/// Image descriptor (10), LZW code size (1), block terminator (1).
const GIF_MIN_FRAME_BYTES: usize = 12;
/// Even a single-color frame compresses no better than this many pixels per byte.
const MAX_PLAUSIBLE_PIXELS_PER_BYTE: usize = 20_000;

#[derive(Debug, Clone, Copy)]
pub struct GifComposer {
    pub tolerance: f64,
    pub min_encoded_delay_ms: u32,
}

impl Default for GifComposer {
    fn default() -> Self {
        Self::from_config(&GifConfig::default())
    }
}

impl GifComposer {
    pub fn from_config(config: &GifConfig) -> Self {
        Self {
            tolerance: config.tolerance,
            min_encoded_delay_ms: config.min_encoded_delay_ms,
        }
    }

    /// Smallest width and height across `frames`, checked against the tolerance.
    pub fn audit(&self, frames: &[Frame]) -> Result<(u32, u32), PipelineError> {
        let min_width = frames.iter().map(Frame::width).min().unwrap_or(0);
        let min_height = frames.iter().map(Frame::height).min().unwrap_or(0);

        for (index, frame) in frames.iter().enumerate() {
            if exceeds_tolerance(frame.width(), min_width, self.tolerance)
                || exceeds_tolerance(frame.height(), min_height, self.tolerance)
            {
                return Err(PipelineError::DimensionMismatch {
                    index,
                    width: frame.width(),
                    height: frame.height(),
                    min_width,
                    min_height,
                    tolerance_pct: (self.tolerance * 100.0).round() as u32,
                });
            }
        }
        Ok((min_width, min_height))
    }

    /// Crop every frame that is larger than `target`, anchored left-middle.
    pub fn normalize(
        &self,
        backend: &dyn ImageBackend,
        frames: Vec<Frame>,
        target: (u32, u32),
    ) -> Result<Vec<Frame>, PipelineError> {
        frames
            .into_iter()
            .enumerate()
            .map(|(index, frame)| -> Result<Frame, PipelineError> {
                let size = (frame.width(), frame.height());
                if size == target {
                    return Ok(frame);
                }
                let (x, y) = crop_origin(size, target, CropAnchor::LeftMiddle);
                tracing::debug!(
                    index,
                    from = ?size,
                    to = ?target,
                    "cropping frame to common size"
                );
                Ok(backend.crop(&frame, x, y, target.0, target.1)?)
            })
            .collect()
    }

    /// Run the full pipeline and return an `image/gif` payload.
    pub fn compose(
        &self,
        backend: &dyn ImageBackend,
        request: GifAssemblyRequest,
    ) -> Result<EncodedImage, PipelineError> {
        let frame_count = request.frames.len();
        let target = self.audit(&request.frames)?;
        let frames = self.normalize(backend, request.frames, target)?;

        let indexed: Vec<IndexedFrame> = frames
            .par_iter()
            .map(palette::quantize)
            .collect::<Result<_, _>>()?;

        let floor = self.min_encoded_delay_ms.max(GIF_DELAY_FLOOR_MS);
        let delay = encoded_delay_centis(request.frame_delay_ms, floor);
        let bytes = palette::write_animation(&indexed, &vec![delay; indexed.len()])?;
        check_plausible(&bytes, frame_count, target)?;

        tracing::debug!(
            frames = frame_count,
            width = target.0,
            height = target.1,
            delay_ms = u32::from(delay) * 10,
            bytes = bytes.len(),
            "composed GIF"
        );
        Ok(EncodedImage {
            bytes,
            content_type: OutputFormat::Gif.content_type(),
        })
    }
}

fn check_plausible(bytes: &[u8], frames: usize, size: (u32, u32)) -> Result<(), PipelineError> {
    if !palette::has_gif_signature(bytes) {
        return Err(PipelineError::Encoding(
            "encoder output does not start with a GIF signature".into(),
        ));
    }
    let pixels = size.0 as usize * size.1 as usize * frames;
    let floor = (GIF_PREAMBLE_BYTES + frames * GIF_MIN_FRAME_BYTES + 1)
        .max(pixels / MAX_PLAUSIBLE_PIXELS_PER_BYTE);
    if bytes.len() < floor {
        return Err(PipelineError::Encoding(format!(
            "encoded GIF is {} bytes, implausibly small for {frames} frames of {}x{}",
            bytes.len(),
            size.0,
            size.1
        )));
    }
    Ok(())
}
