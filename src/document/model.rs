/*!
 * Document data model.
 *
 * A `Document` is the immutable upload handed to the pipeline. The extractor
 * turns it into an `Extraction`: the full text plus ordered `Page`s, each
 * owning the raster images embedded on it.
 */

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Declared content category of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    /// UTF-8 text
    PlainText,
    /// Paginated document (PDF)
    Paginated,
    /// Standalone PNG or JPEG image
    Image,
}

impl DocumentCategory {
    /// Map a MIME type onto a category
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "text/plain" => Some(Self::PlainText),
            "application/pdf" => Some(Self::Paginated),
            "image/png" | "image/jpeg" | "image/jpg" => Some(Self::Image),
            _ => None,
        }
    }

    /// Map a file extension (without the dot) onto a category
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "txt" | "text" => Some(Self::PlainText),
            "pdf" => Some(Self::Paginated),
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PlainText => "plain text",
            Self::Paginated => "paginated document",
            Self::Image => "image",
        };
        write!(f, "{}", name)
    }
}

/// An uploaded document awaiting conversion
#[derive(Debug, Clone)]
pub struct Document {
    /// Raw payload
    pub data: Bytes,
    /// Declared category
    pub category: DocumentCategory,
    /// Original file name, if known
    pub file_name: Option<String>,
}

impl Document {
    /// Create a new document from its bytes and category
    pub fn new(data: impl Into<Bytes>, category: DocumentCategory) -> Self {
        Self {
            data: data.into(),
            category,
            file_name: None,
        }
    }

    /// Attach the original file name
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Name used in log lines
    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("<upload>")
    }
}

/// A raster image embedded in a page
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// 1-based number of the page holding the image
    pub page_number: u32,
    /// Encoded image bytes
    pub data: Bytes,
    /// Source encoding extension (`jpg`, `png`, `jp2`, `bin`)
    pub extension: String,
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("page_number", &self.page_number)
            .field("bytes", &self.data.len())
            .field("extension", &self.extension)
            .finish()
    }
}

/// One page of a paginated document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// 1-based page position
    pub number: u32,
    /// Machine-readable text, empty when the page has no text layer
    pub text: String,
    /// Images embedded on this page, in resource order
    pub images: Vec<ImageAsset>,
}

/// Result of running the page extractor on a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// All page text concatenated in page order
    pub full_text: String,
    /// Pages in order; empty for plain text
    pub pages: Vec<Page>,
}

impl Extraction {
    /// Extraction of an unpaginated text blob
    pub fn unpaginated(text: String) -> Self {
        Self {
            full_text: text,
            pages: Vec::new(),
        }
    }

    /// Build an extraction from ordered pages
    pub fn from_pages(pages: Vec<Page>) -> Self {
        let full_text = pages.iter().map(|p| p.text.as_str()).collect::<String>();
        Self { full_text, pages }
    }

    /// Total number of embedded images across all pages
    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|p| p.images.len()).sum()
    }
}
