//! Core thumbnail generation: decode, resample, encode

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::fs;
use tracing::debug;

use crate::error::{Result, ThumbError};

pub mod formats;
pub mod resize;

pub use formats::*;
pub use resize::*;

/// Refuse sources above this size outright
const MAX_FILE_SIZE: u64 = 500 * 1024 * 1024; // 500MB

/// Memory-map sources above this size instead of reading them onto the heap
const MMAP_THRESHOLD: u64 = 100 * 1024 * 1024; // 100MB

/// Engine for converting one source image into a width-bounded thumbnail
pub struct ThumbnailEngine {
    jpeg_quality: u8,
}

impl ThumbnailEngine {
    /// Create an engine with the default JPEG quality
    pub fn new() -> Self {
        Self { jpeg_quality: 90 }
    }

    /// Create an engine with a specific JPEG quality (1-100)
    pub fn with_quality(jpeg_quality: u8) -> Self {
        Self { jpeg_quality }
    }

    /// Generate a thumbnail for one source image.
    ///
    /// Decodes the source, caps its width at `max_width` (height scales to
    /// preserve aspect ratio; narrower sources are re-encoded unchanged),
    /// and writes the result to `dest`. The output format follows the
    /// destination filename extension.
    pub async fn process_file(
        &self,
        source: &Path,
        dest: &Path,
        max_width: u32,
    ) -> Result<ThumbnailReport> {
        let start_time = Instant::now();

        debug!("Processing file: {:?} -> {:?}", source, dest);

        let (image, source_dims) = self.load_image(source).await?;

        let (target_width, target_height) =
            thumbnail_dimensions(image.width(), image.height(), max_width);

        // The decoded buffer moves into the blocking task and is consumed
        // there; nothing retains the full-size image after this point.
        let thumbnail = if needs_resample(image.width(), max_width) {
            tokio::task::spawn_blocking(move || resample(&image, target_width, target_height))
                .await
                .map_err(|e| ThumbError::resource(format!("task join error: {}", e)))?
        } else {
            debug!("Source already within width cap, copying as-is");
            image
        };

        let file_size = self.save_image(thumbnail, dest).await?;

        let elapsed = start_time.elapsed();
        debug!(
            "Thumbnail written: {:?} {}x{} ({:.2}s)",
            dest,
            target_width,
            target_height,
            elapsed.as_secs_f64()
        );

        Ok(ThumbnailReport {
            source_path: source.to_path_buf(),
            dest_path: dest.to_path_buf(),
            source_dims,
            output_dims: (target_width, target_height),
            file_size,
            elapsed,
        })
    }

    /// Load and decode a source image
    async fn load_image(&self, path: &Path) -> Result<(image::DynamicImage, (u32, u32))> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| ThumbError::decode(format!("cannot access file: {}", e), path.to_path_buf()))?;
        let file_size = metadata.len();

        if file_size == 0 {
            return Err(ThumbError::decode("file is empty", path.to_path_buf()));
        }

        if file_size > MAX_FILE_SIZE {
            return Err(ThumbError::file_too_large(
                file_size,
                MAX_FILE_SIZE,
                path.to_path_buf(),
            ));
        }

        let image = if file_size > MMAP_THRESHOLD {
            self.decode_mmap(path).await?
        } else {
            self.decode_standard(path).await?
        };

        let dims = (image.width(), image.height());
        debug!(
            "Decoded image: {}x{} ({:.2}MB)",
            dims.0,
            dims.1,
            file_size as f64 / 1024.0 / 1024.0
        );

        Ok((image, dims))
    }

    /// Decode via a heap read
    async fn decode_standard(&self, path: &Path) -> Result<image::DynamicImage> {
        let data = fs::read(path)
            .await
            .map_err(|e| ThumbError::decode(format!("cannot read file: {}", e), path.to_path_buf()))?;

        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            image::load_from_memory(&data)
                .map_err(|e| ThumbError::decode(format!("{}", e), path))
        })
        .await
        .map_err(|e| ThumbError::resource(format!("task join error: {}", e)))?
    }

    /// Decode via a memory map (large sources)
    async fn decode_mmap(&self, path: &Path) -> Result<image::DynamicImage> {
        use memmap2::MmapOptions;
        use std::fs::File;

        debug!("Using memory mapping for large file: {:?}", path);

        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let file = File::open(&path)
                .map_err(|e| ThumbError::decode(format!("cannot open file: {}", e), path.clone()))?;

            let mmap = unsafe {
                MmapOptions::new()
                    .map(&file)
                    .map_err(|e| ThumbError::decode(format!("cannot map file: {}", e), path.clone()))?
            };

            image::load_from_memory(&mmap)
                .map_err(|e| ThumbError::decode(format!("{}", e), path))
        })
        .await
        .map_err(|e| ThumbError::resource(format!("task join error: {}", e)))?
    }

    /// Encode and write the thumbnail, returning the output file size
    async fn save_image(&self, image: image::DynamicImage, dest: &Path) -> Result<u64> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ThumbError::encode(format!("cannot create output directory: {}", e), dest.to_path_buf()))?;
        }

        let format = detect_format_from_path(dest)?;
        let quality = self.jpeg_quality;
        let dest = dest.to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<u64> {
            match format {
                ThumbFormat::Jpeg => {
                    let mut output = std::fs::File::create(&dest).map_err(|e| {
                        ThumbError::encode(format!("cannot create file: {}", e), dest.clone())
                    })?;

                    let encoder =
                        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);

                    image
                        .write_with_encoder(encoder)
                        .map_err(|e| ThumbError::encode(format!("{}", e), dest.clone()))?;
                }
                _ => {
                    image
                        .save(&dest)
                        .map_err(|e| ThumbError::encode(format!("{}", e), dest.clone()))?;
                }
            }

            let metadata = std::fs::metadata(&dest)
                .map_err(|e| ThumbError::encode(format!("cannot stat output: {}", e), dest.clone()))?;

            Ok(metadata.len())
        })
        .await
        .map_err(|e| ThumbError::resource(format!("task join error: {}", e)))?
    }
}

impl Default for ThumbnailEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one successful thumbnail generation
#[derive(Debug, Clone)]
pub struct ThumbnailReport {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub source_dims: (u32, u32),
    pub output_dims: (u32, u32),
    pub file_size: u64,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    fn write_test_image(path: &Path, width: u32, height: u32) {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let intensity = ((x * 7 + y * 13) % 255) as u8;
            Rgb([intensity, 255 - intensity, intensity / 2])
        });
        img.save(path).unwrap();
    }

    #[tokio::test]
    async fn test_wide_image_is_downscaled() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("wide.png");
        let dest = tmp.path().join("out/wide.png");
        write_test_image(&source, 400, 300);

        let engine = ThumbnailEngine::new();
        let report = engine.process_file(&source, &dest, 100).await.unwrap();

        assert_eq!(report.source_dims, (400, 300));
        assert_eq!(report.output_dims, (100, 75));
        assert!(report.file_size > 0);

        let written = image::open(&dest).unwrap();
        assert_eq!((written.width(), written.height()), (100, 75));
    }

    #[tokio::test]
    async fn test_narrow_image_is_copied_without_upscaling() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("narrow.png");
        let dest = tmp.path().join("narrow_thumb.png");
        write_test_image(&source, 80, 50);

        let engine = ThumbnailEngine::new();
        let report = engine.process_file(&source, &dest, 120).await.unwrap();

        assert_eq!(report.output_dims, (80, 50));
        let written = image::open(&dest).unwrap();
        assert_eq!(written.width(), 80);
    }

    #[tokio::test]
    async fn test_jpeg_output_roundtrips_with_quality_encoder() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg");
        let dest = tmp.path().join("photo_thumb.jpg");
        write_test_image(&source, 300, 200);

        let engine = ThumbnailEngine::with_quality(75);
        let report = engine.process_file(&source, &dest, 150).await.unwrap();

        assert_eq!(report.output_dims, (150, 100));
        let written = image::open(&dest).unwrap();
        assert_eq!((written.width(), written.height()), (150, 100));
    }

    #[tokio::test]
    async fn test_corrupt_source_is_a_decode_error() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("corrupt.png");
        let dest = tmp.path().join("corrupt_thumb.png");
        std::fs::write(&source, b"definitely not a png").unwrap();

        let engine = ThumbnailEngine::new();
        let err = engine.process_file(&source, &dest, 100).await.unwrap_err();

        assert!(matches!(err, ThumbError::Decode { .. }));
        assert!(err.is_recoverable());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_empty_source_is_a_decode_error() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("empty.png");
        let dest = tmp.path().join("empty_thumb.png");
        std::fs::write(&source, b"").unwrap();

        let engine = ThumbnailEngine::new();
        let err = engine.process_file(&source, &dest, 100).await.unwrap_err();

        assert!(matches!(err, ThumbError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_missing_source_is_a_decode_error() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("nope.png");
        let dest = tmp.path().join("nope_thumb.png");

        let engine = ThumbnailEngine::new();
        let err = engine.process_file(&source, &dest, 100).await.unwrap_err();
        assert!(matches!(err, ThumbError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_reprocessing_gives_identical_dimensions() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("photo.png");
        write_test_image(&source, 1000, 400);

        let engine = ThumbnailEngine::new();
        let first = engine
            .process_file(&source, &tmp.path().join("one.png"), 250)
            .await
            .unwrap();
        let second = engine
            .process_file(&source, &tmp.path().join("two.png"), 250)
            .await
            .unwrap();

        // Dimensions are deterministic across repeated runs
        assert_eq!(first.output_dims, second.output_dims);
        assert_eq!(first.output_dims, (250, 100));
    }
}
