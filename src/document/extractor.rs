/*!
 * Page extraction.
 *
 * `DocumentExtractor` decodes plain text directly and parses PDFs with
 * `lopdf`, collecting per-page text and every embedded raster image.
 * PDF parsing is CPU bound, so it runs on the blocking pool under a timeout.
 */

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use log::{debug, info, warn};
use lopdf::xobject::PdfImage;

use crate::document::model::{DocumentCategory, Extraction, ImageAsset, Page};
use crate::errors::ExtractionError;

/// Turns raw document bytes into text and pages
#[async_trait]
pub trait PageExtractor: Send + Sync {
    /// Extract the text and pages of a document
    ///
    /// Plain text yields a single unpaginated blob and no pages. Paginated
    /// documents yield ordered pages with their embedded images. Malformed
    /// bytes are a fatal `ExtractionError`.
    async fn extract(
        &self,
        data: &[u8],
        category: DocumentCategory,
    ) -> Result<Extraction, ExtractionError>;
}

/// Default extractor for plain text and PDF documents
#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    // @field: Upper bound for parsing one PDF
    timeout: Duration,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl DocumentExtractor {
    /// Create an extractor with the given parsing timeout
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn decode_text(data: &[u8]) -> Result<Extraction, ExtractionError> {
        let text = String::from_utf8(data.to_vec())
            .map_err(|e| ExtractionError::InvalidEncoding(e.to_string()))?;
        Ok(Extraction::unpaginated(text))
    }

    /// Parse a PDF held in memory into ordered pages
    pub fn extract_pdf(data: &[u8]) -> Result<Extraction, ExtractionError> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| ExtractionError::Parse(format!("failed to parse PDF: {}", e)))?;

        let page_ids = doc.get_pages();
        let mut pages = Vec::with_capacity(page_ids.len());

        for (&number, &page_id) in page_ids.iter() {
            let text = match doc.extract_text(&[number]) {
                Ok(text) => text,
                Err(e) => {
                    debug!("Page {} has no extractable text layer: {}", number, e);
                    String::new()
                }
            };

            let images = match doc.get_page_images(page_id) {
                Ok(found) => found
                    .iter()
                    .map(|img| Self::image_asset(&doc, number, img))
                    .collect(),
                Err(e) => {
                    warn!("Could not enumerate images on page {}: {}", number, e);
                    Vec::new()
                }
            };

            pages.push(Page { number, text, images });
        }

        Ok(Extraction::from_pages(pages))
    }

    fn image_asset(doc: &lopdf::Document, page_number: u32, img: &PdfImage) -> ImageAsset {
        let filters = img.filters.clone().unwrap_or_default();
        let has = |name: &str| filters.iter().any(|f| f == name);

        let (data, extension) = if has("DCTDecode") {
            (img.content.to_vec(), "jpg")
        } else if has("JPXDecode") {
            (img.content.to_vec(), "jp2")
        } else {
            let raw = if filters.is_empty() {
                Some(img.content.to_vec())
            } else if filters.iter().all(|f| f == "FlateDecode") {
                doc.get_object(img.id)
                    .and_then(|obj| obj.as_stream())
                    .and_then(|stream| stream.decompressed_content())
                    .ok()
            } else {
                None
            };

            match raw.and_then(|pixels| Self::encode_raw_pixels(img, pixels)) {
                Some(png) => (png, "png"),
                None => (img.content.to_vec(), "bin"),
            }
        };

        ImageAsset {
            page_number,
            data: Bytes::from(data),
            extension: extension.to_string(),
        }
    }

    /// Re-encode 8-bit RGB or Gray pixel data as PNG
    fn encode_raw_pixels(img: &PdfImage, pixels: Vec<u8>) -> Option<Vec<u8>> {
        if img.bits_per_component.unwrap_or(8) != 8 || img.width <= 0 || img.height <= 0 {
            return None;
        }
        let width = u32::try_from(img.width).ok()?;
        let height = u32::try_from(img.height).ok()?;

        let dynamic = match img.color_space.as_deref() {
            Some("DeviceRGB") => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, pixels)?),
            Some("DeviceGray") => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, pixels)?),
            _ => return None,
        };

        let mut buffer = Cursor::new(Vec::new());
        dynamic.write_to(&mut buffer, ImageFormat::Png).ok()?;
        Some(buffer.into_inner())
    }
}

#[async_trait]
impl PageExtractor for DocumentExtractor {
    async fn extract(
        &self,
        data: &[u8],
        category: DocumentCategory,
    ) -> Result<Extraction, ExtractionError> {
        match category {
            DocumentCategory::PlainText => Self::decode_text(data),
            DocumentCategory::Paginated => {
                let owned = data.to_vec();
                let extraction = tokio::time::timeout(
                    self.timeout,
                    tokio::task::spawn_blocking(move || Self::extract_pdf(&owned)),
                )
                .await
                .map_err(|_| ExtractionError::Timeout(self.timeout.as_secs()))?
                .map_err(|e| ExtractionError::Parse(format!("task join error: {}", e)))??;

                info!(
                    "PDF extraction complete: {} page(s), {} image(s)",
                    extraction.pages.len(),
                    extraction.image_count()
                );
                Ok(extraction)
            }
            DocumentCategory::Image => Err(ExtractionError::UnsupportedCategory(category.to_string())),
        }
    }
}
