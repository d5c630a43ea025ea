//! Pure calculation functions for image dimensions and timing.
//!
//! All functions here are pure and testable without any I/O or images.

/// Size of the source region a cover fit keeps.
///
/// Returns the largest window inside `source` with the aspect ratio of
/// `target`. Cropping that window (centered) and scaling it to `target` gives
/// the same result as filling the box and cropping the overflow, without
/// materializing the filled image. Both sides are at least 1.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
pub fn cover_crop_window(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = (source.0 as u64, source.1 as u64);
    let (tgt_w, tgt_h) = (target.0.max(1) as u64, target.1.max(1) as u64);

    if src_w * tgt_h > src_h * tgt_w {
        // Source is wider: keep full height, trim the sides
        let w = (src_h * tgt_w + tgt_h / 2) / tgt_h;
        (w.clamp(1, src_w) as u32, source.1)
    } else {
        // Source is taller (or same aspect): keep full width, trim top and bottom
        let h = (src_w * tgt_h + tgt_w / 2) / tgt_w;
        (source.0, h.clamp(1, src_h) as u32)
    }
}

/// Where the crop window sits inside an oversized image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropAnchor {
    /// Centered on both axes (thumbnails).
    Center,
    /// Flush left, centered vertically (GIF frame normalization).
    LeftMiddle,
}

/// Top-left corner of a `target`-sized window inside `fill`.
///
/// `fill` must be at least as large as `target` on both axes. Smaller values
/// saturate to a zero offset.
pub fn crop_origin(fill: (u32, u32), target: (u32, u32), anchor: CropAnchor) -> (u32, u32) {
    let spare_x = fill.0.saturating_sub(target.0);
    let spare_y = fill.1.saturating_sub(target.1);
    match anchor {
        CropAnchor::Center => (spare_x / 2, spare_y / 2),
        CropAnchor::LeftMiddle => (0, spare_y / 2),
    }
}

/// Whether `value` is more than `tolerance` (a fraction) above `min`.
///
/// `exceeds_tolerance(110, 100, 0.10)` is `false`: exactly 10% is allowed.
pub fn exceeds_tolerance(value: u32, min: u32, tolerance: f64) -> bool {
    if min == 0 {
        return value > 0;
    }
    (value - min.min(value)) as f64 / min as f64 > tolerance
}

/// Delay written into the GIF stream, in centiseconds.
///
/// The requested delay is raised to `floor_ms` first, then rounded to the
/// nearest 10 ms unit GIF can express.
pub fn encoded_delay_centis(requested_ms: u32, floor_ms: u32) -> u16 {
    let ms = requested_ms.max(floor_ms);
    let centis = (ms + 5) / 10;
    centis.min(u16::MAX as u32) as u16
}
