//! Chanda Media - Screenshot Compression
//!
//! Payment screenshots are downscaled to a maximum width and re-encoded as
//! JPEG before they are stored inline as a data URI. Decoding and encoding
//! are CPU bound, so the async entry points run them on the blocking pool.

use base64::Engine;
use chanda_core::{ChandaResult, MediaError, MediaSettings};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;
use std::path::Path;
use std::time::Instant;

const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// A re-encoded JPEG ready to be attached to a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    pub width: u32,
    pub height: u32,
    jpeg: Vec<u8>,
}

impl CompressedImage {
    pub fn bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn byte_len(&self) -> usize {
        self.jpeg.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.jpeg
    }

    /// `data:image/jpeg;base64,...`
    pub fn data_uri(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.jpeg);
        let mut uri = String::with_capacity(DATA_URI_PREFIX.len() + encoded.len());
        uri.push_str(DATA_URI_PREFIX);
        uri.push_str(&encoded);
        uri
    }
}

/// Downscales and re-encodes screenshots.
#[derive(Debug, Clone, Default)]
pub struct ImageCompressor {
    settings: MediaSettings,
}

impl ImageCompressor {
    pub fn new(settings: MediaSettings) -> Result<Self, MediaError> {
        settings
            .validate()
            .map_err(|e| MediaError::InvalidSettings {
                reason: e.to_string(),
            })?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &MediaSettings {
        &self.settings
    }

    /// Output size for an input of `width` x `height`.
    ///
    /// Images no wider than the maximum keep their size. Wider ones are
    /// scaled to exactly the maximum width, height rounded and at least 1.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let max_width = self.settings.max_width;
        if width <= max_width {
            return (width, height);
        }
        let scaled = (height as f64 * max_width as f64 / width as f64).round() as u32;
        (max_width, scaled.max(1))
    }

    /// Compress encoded image bytes on the current thread.
    pub fn compress_bytes(&self, input: &[u8]) -> Result<CompressedImage, MediaError> {
        let started = Instant::now();
        let decoded = image::load_from_memory(input).map_err(|e| MediaError::DecodeFailed {
            reason: e.to_string(),
        })?;

        let (width, height) = decoded.dimensions();
        let (target_width, target_height) = self.target_dimensions(width, height);
        let resized = if (target_width, target_height) == (width, height) {
            decoded
        } else {
            decoded.resize_exact(target_width, target_height, FilterType::Triangle)
        };
        let rgb = resized.to_rgb8();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.settings.jpeg_quality)
            .encode_image(&rgb)
            .map_err(|e| MediaError::EncodeFailed {
                reason: e.to_string(),
            })?;

        tracing::debug!(
            input_bytes = input.len(),
            output_bytes = jpeg.len(),
            from = %format!("{}x{}", width, height),
            to = %format!("{}x{}", target_width, target_height),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Screenshot compressed"
        );

        Ok(CompressedImage {
            width: rgb.width(),
            height: rgb.height(),
            jpeg,
        })
    }

    /// Compress on the blocking pool.
    pub async fn compress(&self, input: Vec<u8>) -> ChandaResult<CompressedImage> {
        let compressor = self.clone();
        let result = tokio::task::spawn_blocking(move || compressor.compress_bytes(&input))
            .await
            .map_err(|e| MediaError::EncodeFailed {
                reason: format!("compression task failed: {}", e),
            })?;
        Ok(result?)
    }

    /// Read an image file and compress it.
    pub async fn compress_file(&self, path: impl AsRef<Path>) -> ChandaResult<CompressedImage> {
        let path = path.as_ref();
        let input = tokio::fs::read(path)
            .await
            .map_err(|e| MediaError::ReadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        self.compress(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chanda_core::ChandaError;
    use image::{ImageFormat, Rgb, RgbImage};
    use proptest::prelude::*;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_wide_image_scaled_to_max_width() {
        let compressor = ImageCompressor::default();
        let out = compressor.compress_bytes(&png(1600, 1200)).unwrap();
        assert_eq!((out.width, out.height), (800, 600));

        let decoded = image::load_from_memory(out.bytes()).unwrap();
        assert_eq!(decoded.dimensions(), (800, 600));
        assert_eq!(image::guess_format(out.bytes()).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_narrow_image_keeps_size() {
        let compressor = ImageCompressor::default();
        let out = compressor.compress_bytes(&png(640, 480)).unwrap();
        assert_eq!((out.width, out.height), (640, 480));
    }

    #[test]
    fn test_data_uri_prefix_and_payload() {
        let compressor = ImageCompressor::default();
        let out = compressor.compress_bytes(&png(32, 16)).unwrap();
        let uri = out.data_uri();
        assert!(uri.starts_with("data:image/jpeg;base64,"));

        let payload = &uri[DATA_URI_PREFIX.len()..];
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .unwrap();
        assert_eq!(decoded, out.bytes());
        assert_eq!(decoded.len(), out.byte_len());
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let compressor = ImageCompressor::default();
        let err = compressor.compress_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, MediaError::DecodeFailed { .. }));
    }

    #[test]
    fn test_extreme_aspect_ratio_keeps_one_pixel() {
        let compressor = ImageCompressor::default();
        assert_eq!(compressor.target_dimensions(4000, 1), (800, 1));
        let out = compressor.compress_bytes(&png(4000, 1)).unwrap();
        assert_eq!((out.width, out.height), (800, 1));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let err = ImageCompressor::new(MediaSettings {
            max_width: 800,
            jpeg_quality: 0,
        })
        .unwrap_err();
        assert!(matches!(err, MediaError::InvalidSettings { .. }));

        assert!(ImageCompressor::new(MediaSettings {
            max_width: 0,
            jpeg_quality: 60,
        })
        .is_err());
    }

    #[test]
    fn test_lower_quality_gives_smaller_output() {
        let input = png(400, 300);
        let high = ImageCompressor::new(MediaSettings {
            max_width: 800,
            jpeg_quality: 95,
        })
        .unwrap()
        .compress_bytes(&input)
        .unwrap();
        let low = ImageCompressor::new(MediaSettings {
            max_width: 800,
            jpeg_quality: 10,
        })
        .unwrap()
        .compress_bytes(&input)
        .unwrap();
        assert!(low.byte_len() < high.byte_len());
    }

    #[tokio::test]
    async fn test_compress_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proof.png");
        tokio::fs::write(&path, png(1000, 500)).await.unwrap();

        let out = ImageCompressor::default().compress_file(&path).await.unwrap();
        assert_eq!((out.width, out.height), (800, 400));
    }

    #[tokio::test]
    async fn test_missing_file_is_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageCompressor::default()
            .compress_file(dir.path().join("missing.png"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChandaError::Media(MediaError::ReadFailed { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Output never exceeds the maximum width and keeps the aspect ratio
        /// within rounding.
        #[test]
        fn prop_target_dimensions_bounded(
            width in 1u32..10_000,
            height in 1u32..10_000,
            max_width in 1u32..2_000,
        ) {
            let compressor =
                ImageCompressor::new(MediaSettings { max_width, jpeg_quality: 60 }).unwrap();
            let (w, h) = compressor.target_dimensions(width, height);

            prop_assert!(w <= max_width);
            prop_assert!(h >= 1);
            if width <= max_width {
                prop_assert_eq!((w, h), (width, height));
            } else {
                prop_assert_eq!(w, max_width);
                let exact = height as f64 * max_width as f64 / width as f64;
                prop_assert!((h as f64 - exact).abs() <= 0.5 || h == 1);
            }
        }
    }
}
