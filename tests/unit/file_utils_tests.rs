/*!
 * Tests for file utilities
 */

use std::path::Path;

use voxvision::document::DocumentCategory;
use voxvision::file_utils::FileManager;

use crate::common::{create_temp_dir, create_test_file, sample_png};

#[test]
fn test_generateOutputPath_shouldInsertTagBeforeExtension() {
    let path = FileManager::generate_output_path("/docs/report.pdf", "/out", "es", "mp3");
    assert_eq!(path, Path::new("/out/report.es.mp3"));

    let transcript = FileManager::transcript_path("/docs/report.pdf", "/out");
    assert_eq!(transcript, Path::new("/out/report.transcript.txt"));
    assert!(FileManager::is_generated_transcript(&transcript));
    assert!(!FileManager::is_generated_transcript("/docs/notes.txt"));
}

#[test]
fn test_detectCategory_byExtension_shouldMapKnownTypes() {
    let dir = create_temp_dir().unwrap();
    let txt = create_test_file(dir.path(), "notes.TXT", b"hola").unwrap();
    let pdf = create_test_file(dir.path(), "doc.pdf", b"whatever").unwrap();
    let jpg = create_test_file(dir.path(), "photo.jpeg", b"whatever").unwrap();

    assert_eq!(FileManager::detect_category(&txt).unwrap(), Some(DocumentCategory::PlainText));
    assert_eq!(FileManager::detect_category(&pdf).unwrap(), Some(DocumentCategory::Paginated));
    assert_eq!(FileManager::detect_category(&jpg).unwrap(), Some(DocumentCategory::Image));
}

#[test]
fn test_detectCategory_withUnknownExtension_shouldSniffMagicBytes() {
    let dir = create_temp_dir().unwrap();
    let pdf = create_test_file(dir.path(), "scan.bin", b"%PDF-1.7\n...").unwrap();
    let png = create_test_file(dir.path(), "upload", &sample_png(2, 2)).unwrap();
    let json = create_test_file(dir.path(), "conf.json", b"{}").unwrap();

    assert_eq!(FileManager::detect_category(&pdf).unwrap(), Some(DocumentCategory::Paginated));
    assert_eq!(FileManager::detect_category(&png).unwrap(), Some(DocumentCategory::Image));
    assert_eq!(FileManager::detect_category(&json).unwrap(), None);
}

#[test]
fn test_detectCategory_withMissingFile_shouldFail() {
    assert!(FileManager::detect_category("/definitely/not/here.pdf").is_err());
}

#[test]
fn test_sniffCategory_withJpegHeader_shouldBeImage() {
    assert_eq!(FileManager::sniff_category(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(DocumentCategory::Image));
    assert_eq!(FileManager::sniff_category(b"ID3\x04"), None);
}

#[test]
fn test_findDocuments_shouldSkipOutputsAndUnknownFiles() {
    let dir = create_temp_dir().unwrap();
    create_test_file(dir.path(), "a.txt", b"hola").unwrap();
    create_test_file(dir.path(), "a.transcript.txt", b"hola").unwrap();
    create_test_file(dir.path(), "a.es.mp3", b"ID3").unwrap();
    create_test_file(dir.path(), "conf.json", b"{}").unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    create_test_file(&dir.path().join("nested"), "b.pdf", b"%PDF-1.4").unwrap();

    let found = FileManager::find_documents(dir.path()).unwrap();
    let names: Vec<String> = found
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();

    assert_eq!(names, vec!["a.txt", "b.pdf"]);
}

#[test]
fn test_writeBytes_shouldCreateParentDirectories() {
    let dir = create_temp_dir().unwrap();
    let target = dir.path().join("deep").join("out").join("x.mp3");

    FileManager::write_bytes(&target, b"ID3data").unwrap();

    assert_eq!(FileManager::read_bytes(&target).unwrap(), b"ID3data");
    assert!(FileManager::file_exists(&target));
    assert!(FileManager::dir_exists(dir.path().join("deep")));
}
