use anyhow::{Result, Context};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::document::DocumentCategory;

// @module: File and directory utilities

/// Suffix of transcript files written next to the audio
pub const TRANSCRIPT_SUFFIX: &str = "transcript";

const PDF_MAGIC: &[u8] = b"%PDF-";
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: Output path `<stem>.<tag>.<extension>` in output_dir
    // @params: input_file, output_dir, tag (language code or "transcript"), extension
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        tag: &str,
        extension: &str,
    ) -> PathBuf {
        let input_file = input_file.as_ref();
        let output_dir = output_dir.as_ref();

        let stem = input_file.file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push('.');
        output_filename.push_str(tag);
        output_filename.push('.');
        output_filename.push_str(extension);

        output_dir.join(output_filename)
    }

    // @generates: Transcript path for an input file
    pub fn transcript_path<P1: AsRef<Path>, P2: AsRef<Path>>(input_file: P1, output_dir: P2) -> PathBuf {
        Self::generate_output_path(input_file, output_dir, TRANSCRIPT_SUFFIX, "txt")
    }

    // @checks: Whether a path is a transcript this tool wrote
    pub fn is_generated_transcript<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase().ends_with(&format!(".{}.txt", TRANSCRIPT_SUFFIX)))
            .unwrap_or(false)
    }

    /// Find every convertible document under a directory
    pub fn find_documents<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if !path.is_file() || Self::is_generated_transcript(path) {
                continue;
            }

            if matches!(Self::detect_category(path), Ok(Some(_))) {
                result.push(path.to_path_buf());
            }
        }

        Ok(result)
    }

    /// Read a whole file into memory
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        fs::read(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write bytes to a file, creating the parent directory
    pub fn write_bytes<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        Self::write_bytes(path, content.as_bytes())
    }

    /// Detect the document category of a file
    ///
    /// The extension decides first (`pdf`, `txt`, `png`, `jpg`, `jpeg`).
    /// Files with any other extension are sniffed for PDF, PNG and JPEG
    /// signatures; text is never guessed from content.
    pub fn detect_category<P: AsRef<Path>>(path: P) -> Result<Option<DocumentCategory>> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("File does not exist: {:?}", path));
        }

        if let Some(category) = path
            .extension()
            .and_then(|ext| DocumentCategory::from_extension(&ext.to_string_lossy()))
        {
            return Ok(Some(category));
        }

        let mut header = Vec::with_capacity(8);
        fs::File::open(path)
            .with_context(|| format!("Failed to open file: {:?}", path))?
            .take(8)
            .read_to_end(&mut header)
            .with_context(|| format!("Failed to read file: {:?}", path))?;

        Ok(Self::sniff_category(&header))
    }

    /// Category from the leading bytes of a payload
    pub fn sniff_category(header: &[u8]) -> Option<DocumentCategory> {
        if header.starts_with(PDF_MAGIC) {
            Some(DocumentCategory::Paginated)
        } else if header.starts_with(PNG_MAGIC) || header.starts_with(JPEG_MAGIC) {
            Some(DocumentCategory::Image)
        } else {
            None
        }
    }
}
