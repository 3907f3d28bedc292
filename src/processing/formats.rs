//! Image format detection and handling

use std::path::Path;

use once_cell::sync::Lazy;

use crate::error::{Result, ThumbError};

/// Output formats ThumbMill can encode.
///
/// GIF is deliberately absent: the container may be animated and frame
/// counts are not probed, so GIF sources never enter a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbFormat {
    Jpeg,
    Png,
    WebP,
    Tiff,
    Bmp,
}

impl ThumbFormat {
    /// Get file extension for this format
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Tiff => "tiff",
            Self::Bmp => "bmp",
        }
    }

    /// Get MIME type for this format
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
        }
    }
}

/// Convert our format enum to the image crate's format
impl From<ThumbFormat> for image::ImageFormat {
    fn from(format: ThumbFormat) -> Self {
        match format {
            ThumbFormat::Jpeg => image::ImageFormat::Jpeg,
            ThumbFormat::Png => image::ImageFormat::Png,
            ThumbFormat::WebP => image::ImageFormat::WebP,
            ThumbFormat::Tiff => image::ImageFormat::Tiff,
            ThumbFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

/// Detect image format from file extension
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<ThumbFormat> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| {
            ThumbError::unsupported("unknown".to_string(), Some(path.to_path_buf()))
        })?;

    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => Ok(ThumbFormat::Jpeg),
        "png" => Ok(ThumbFormat::Png),
        "webp" => Ok(ThumbFormat::WebP),
        "tiff" | "tif" => Ok(ThumbFormat::Tiff),
        "bmp" => Ok(ThumbFormat::Bmp),
        _ => Err(ThumbError::unsupported(
            extension.to_string(),
            Some(path.to_path_buf()),
        )),
    }
}

/// Extensions accepted as batch input
pub static SUPPORTED_EXTENSIONS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["jpg", "jpeg", "png", "webp", "tiff", "tif", "bmp"]);

/// MIME types accepted by magic-byte sniffing as static raster input
pub static SUPPORTED_MIME_TYPES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "image/jpeg",
        "image/png",
        "image/webp",
        "image/tiff",
        "image/bmp",
    ]
});

/// Check if a file extension is supported for input
pub fn is_supported_input_format(extension: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|&fmt| fmt.eq_ignore_ascii_case(extension))
}

/// Check if a sniffed MIME type is a supported static raster image
pub fn is_supported_mime_type(mime: &str) -> bool {
    SUPPORTED_MIME_TYPES.iter().any(|&m| m == mime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_format_detection_from_path() {
        assert_eq!(
            detect_format_from_path(Path::new("test.jpg")).unwrap(),
            ThumbFormat::Jpeg
        );
        assert_eq!(
            detect_format_from_path(Path::new("test.PNG")).unwrap(),
            ThumbFormat::Png
        );
        assert_eq!(
            detect_format_from_path(Path::new("test.webp")).unwrap(),
            ThumbFormat::WebP
        );
    }

    #[test]
    fn test_format_detection_rejects_unknown() {
        assert!(detect_format_from_path(Path::new("test.xyz")).is_err());
        assert!(detect_format_from_path(Path::new("no_extension")).is_err());
        // Animated container, never accepted
        assert!(detect_format_from_path(Path::new("test.gif")).is_err());
    }

    #[test]
    fn test_supported_formats() {
        assert!(is_supported_input_format("jpg"));
        assert!(is_supported_input_format("PNG"));
        assert!(!is_supported_input_format("gif"));
        assert!(!is_supported_input_format("xyz"));

        assert!(is_supported_mime_type("image/png"));
        assert!(!is_supported_mime_type("image/gif"));
    }

    #[test]
    fn test_format_properties() {
        assert_eq!(ThumbFormat::Jpeg.extension(), "jpg");
        assert_eq!(ThumbFormat::WebP.mime_type(), "image/webp");

        let fmt: image::ImageFormat = ThumbFormat::Png.into();
        assert_eq!(fmt, image::ImageFormat::Png);
    }
}
