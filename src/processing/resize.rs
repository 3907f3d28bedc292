//! Thumbnail dimension math and resampling

use image::DynamicImage;
use tracing::debug;

/// Resampling filter used for all downscales. Lanczos3 is the
/// high-quality, anti-aliased choice for photographic content.
pub const THUMBNAIL_FILTER: image::imageops::FilterType = image::imageops::FilterType::Lanczos3;

/// Calculate thumbnail dimensions for a width cap.
///
/// Width is never upscaled: sources narrower than `max_width` keep their
/// original dimensions. Otherwise height scales to preserve aspect ratio,
/// `new_height = round(max_width * height / width)`, floored at 1 pixel.
pub fn thumbnail_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }

    let new_height = (max_width as f64 * height as f64 / width as f64).round() as u32;
    (max_width, new_height.max(1))
}

/// Check whether a resample is needed at all for a width cap
pub fn needs_resample(width: u32, max_width: u32) -> bool {
    width > max_width
}

/// Resample an image to exact target dimensions
pub fn resample(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    debug!(
        "Resampling {}x{} -> {}x{} using {:?}",
        image.width(),
        image.height(),
        width,
        height,
        THUMBNAIL_FILTER
    );

    image.resize_exact(width, height, THUMBNAIL_FILTER)
}
