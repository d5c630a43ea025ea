//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff container | `image::guess_format` |
//! | Decode (JPEG, PNG, TIFF, static WebP) | `image` crate (pure Rust decoders) |
//! | Decode (GIF, animated WebP) | `image::AnimationDecoder::into_frames` |
//! | Resize | center crop of the cover window, then `image::imageops::resize` with `Lanczos3` |
//! | Crop | `image::imageops::crop_imm` |
//! | Encode → JPEG / PNG | `image::codecs::*` encoders |
//! | Encode → WebP | `webp` (libwebp, lossy at the requested quality) |
//! | Encode → GIF | [`palette`](super::palette) (NeuQuant + `gif`) |

use super::backend::{BackendError, DecodedImage, EncodedImage, Frame, ImageBackend};
use super::calculations::{CropAnchor, cover_crop_window, crop_origin, encoded_delay_centis};
use super::palette;
use super::params::{EncodeParams, OutputFormat};
use image::codecs::gif::GifDecoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};
use rayon::prelude::*;
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn output_format_of(format: ImageFormat) -> Option<OutputFormat> {
    match format {
        ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
        ImageFormat::Png => Some(OutputFormat::Png),
        ImageFormat::WebP => Some(OutputFormat::Webp),
        ImageFormat::Gif => Some(OutputFormat::Gif),
        _ => None,
    }
}

fn to_rgba(frame: &Frame) -> Result<RgbaImage, BackendError> {
    RgbaImage::from_raw(frame.width(), frame.height(), frame.pixels().to_vec())
        .ok_or_else(|| BackendError::ProcessingFailed("frame buffer does not match its dimensions".into()))
}

fn from_rgba(img: RgbaImage) -> Result<Frame, BackendError> {
    let (width, height) = img.dimensions();
    Frame::new(width, height, img.into_raw())
}

fn decode_error(e: image::ImageError) -> BackendError {
    BackendError::Decode(e.to_string())
}

/// Collect every frame of an animated container with its delay.
fn decode_animation<'a>(decoder: impl AnimationDecoder<'a>) -> Result<(Vec<Frame>, Vec<u32>), BackendError> {
    let raw = decoder.into_frames().collect_frames().map_err(decode_error)?;
    let mut frames = Vec::with_capacity(raw.len());
    let mut delays = Vec::with_capacity(raw.len());
    for frame in raw {
        let (numer, denom) = frame.delay().numer_denom_ms();
        delays.push(if denom == 0 { 0 } else { numer / denom });
        frames.push(from_rgba(frame.into_buffer())?);
    }
    if frames.is_empty() {
        return Err(BackendError::Decode("animation contains no frames".into()));
    }
    Ok((frames, delays))
}

fn decode_static(bytes: &[u8], format: ImageFormat) -> Result<Frame, BackendError> {
    let img = image::load_from_memory_with_format(bytes, format).map_err(decode_error)?;
    from_rgba(img.into_rgba8())
}

fn encode_single(frame: &Frame, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
    let mut bytes = Vec::new();
    let (w, h) = (frame.width(), frame.height());
    let encode_err = |e: image::ImageError| {
        BackendError::Encode(format!("{} encode failed: {e}", params.format))
    };

    match params.format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgba8(to_rgba(frame)?).to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, params.quality.value() as u8)
                .write_image(rgb.as_raw(), w, h, ExtendedColorType::Rgb8)
                .map_err(encode_err)?;
        }
        OutputFormat::Png => {
            PngEncoder::new(&mut bytes)
                .write_image(frame.pixels(), w, h, ExtendedColorType::Rgba8)
                .map_err(encode_err)?;
        }
        OutputFormat::Webp => {
            let encoded = webp::Encoder::from_rgba(frame.pixels(), w, h)
                .encode_simple(false, params.quality.value() as f32)
                .map_err(|e| BackendError::Encode(format!("webp encode failed: {e:?}")))?;
            bytes = encoded.to_vec();
        }
        OutputFormat::Gif => {
            let indexed = palette::quantize(frame)?;
            bytes = palette::write_animation(&[indexed], &[0])?;
        }
    }
    Ok(bytes)
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
        let format = image::guess_format(bytes)
            .map_err(|e| BackendError::Decode(format!("unrecognized image container: {e}")))?;

        let (frames, delays_ms) = match format {
            ImageFormat::Gif => {
                decode_animation(GifDecoder::new(Cursor::new(bytes)).map_err(decode_error)?)?
            }
            ImageFormat::WebP => {
                let decoder = WebPDecoder::new(Cursor::new(bytes)).map_err(decode_error)?;
                if decoder.has_animation() {
                    decode_animation(decoder)?
                } else {
                    (vec![decode_static(bytes, format)?], Vec::new())
                }
            }
            other => (vec![decode_static(bytes, other)?], Vec::new()),
        };

        Ok(DecodedImage {
            frames,
            delays_ms,
            format: output_format_of(format),
        })
    }

    fn resize(&self, frame: &Frame, width: u32, height: u32) -> Result<Frame, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "cannot resize to {width}x{height}"
            )));
        }
        // Crop first so the working buffer never exceeds source + target.
        let source = (frame.width(), frame.height());
        let window = cover_crop_window(source, (width, height));
        let (x, y) = crop_origin(source, window, CropAnchor::Center);

        let img = to_rgba(frame)?;
        let cropped = image::imageops::crop_imm(&img, x, y, window.0, window.1).to_image();
        if window == (width, height) {
            return from_rgba(cropped);
        }
        from_rgba(image::imageops::resize(&cropped, width, height, FilterType::Lanczos3))
    }

    fn crop(
        &self,
        frame: &Frame,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Frame, BackendError> {
        let fits_x = x.checked_add(width).is_some_and(|end| end <= frame.width());
        let fits_y = y.checked_add(height).is_some_and(|end| end <= frame.height());
        if !fits_x || !fits_y || width == 0 || height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "crop {width}x{height}+{x}+{y} outside {}x{} frame",
                frame.width(),
                frame.height()
            )));
        }
        let img = to_rgba(frame)?;
        from_rgba(image::imageops::crop_imm(&img, x, y, width, height).to_image())
    }

    fn encode(&self, frames: &[Frame], params: &EncodeParams) -> Result<EncodedImage, BackendError> {
        let first = frames
            .first()
            .ok_or_else(|| BackendError::Encode("no frames to encode".into()))?;

        let bytes = if params.format == OutputFormat::Gif && frames.len() > 1 {
            let indexed = frames
                .par_iter()
                .map(palette::quantize)
                .collect::<Result<Vec<_>, _>>()?;
            // Source animations keep their own timing; no floor applies here.
            let delays: Vec<u16> = (0..indexed.len())
                .map(|i| encoded_delay_centis(params.delay_ms(i), 0))
                .collect();
            palette::write_animation(&indexed, &delays)?
        } else {
            // Static containers keep the first frame only.
            encode_single(first, params)?
        };

        Ok(EncodedImage {
            bytes,
            content_type: params.format.content_type(),
        })
    }
}
