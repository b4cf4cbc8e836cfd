/*!
 * Document model and text extraction.
 *
 * - `model`: uploaded documents, pages and embedded images
 * - `extractor`: plain text decoding and PDF page/image extraction
 */

pub mod extractor;
pub mod model;

pub use extractor::{DocumentExtractor, PageExtractor};
pub use model::{Document, DocumentCategory, Extraction, ImageAsset, Page};
