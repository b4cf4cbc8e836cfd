/*!
 * Image normalization before remote submission.
 *
 * Remote describers get a bounded, RGB, baseline JPEG version of the image so
 * request sizes stay predictable whatever the source encoding was.
 */

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;

use crate::errors::DescribeError;

/// A JPEG ready to be sent to a remote describer
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// JPEG bytes
    pub data: Vec<u8>,
    /// Width after resizing
    pub width: u32,
    /// Height after resizing
    pub height: u32,
}

impl NormalizedImage {
    /// MIME type of the normalized payload
    pub fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }
}

/// Bounds, converts and re-encodes images
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    // @field: Longest allowed side in pixels
    max_dimension: u32,
    // @field: JPEG quality (1-100)
    jpeg_quality: u8,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(1024, 90)
    }
}

impl ImageNormalizer {
    /// Create a normalizer
    pub fn new(max_dimension: u32, jpeg_quality: u8) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Decode, bound, convert to RGB and re-encode an image as JPEG
    pub fn normalize(&self, image_bytes: &[u8]) -> Result<NormalizedImage, DescribeError> {
        let decoded = image::load_from_memory(image_bytes)
            .map_err(|e| DescribeError::Image(format!("failed to decode image: {}", e)))?;

        let (width, height) = decoded.dimensions();
        let bounded = if width.max(height) > self.max_dimension {
            decoded.resize(self.max_dimension, self.max_dimension, FilterType::Lanczos3)
        } else {
            decoded
        };

        let rgb = bounded.to_rgb8();
        let mut data = Vec::new();
        JpegEncoder::new_with_quality(&mut data, self.jpeg_quality)
            .encode_image(&rgb)
            .map_err(|e| DescribeError::Image(format!("failed to encode JPEG: {}", e)))?;

        Ok(NormalizedImage {
            data,
            width: rgb.width(),
            height: rgb.height(),
        })
    }

    /// Run [`normalize`](Self::normalize) on the blocking pool
    ///
    /// Decoding, resizing and encoding are CPU-bound and must not stall the
    /// executor while several images are described concurrently.
    pub async fn normalize_blocking(&self, image_bytes: &[u8]) -> Result<NormalizedImage, DescribeError> {
        let normalizer = *self;
        let owned = image_bytes.to_vec();
        tokio::task::spawn_blocking(move || normalizer.normalize(&owned))
            .await
            .map_err(|e| DescribeError::Image(format!("normalization task failed: {}", e)))?
    }
}
