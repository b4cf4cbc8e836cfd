/*!
 * Common test utilities for the voxvision test suite
 */

use std::path::{Path, PathBuf};
use std::fs;
use anyhow::Result;
use tempfile::TempDir;

use voxvision::app_config::{Config, RemoteStrategy};

pub mod mock_providers;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A small valid PNG image
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut buffer = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .expect("PNG encoding succeeds");
    buffer.into_inner()
}

/// A config that validates without touching the environment
pub fn offline_config() -> Config {
    let mut config = Config::default();
    for provider in config.detection.available_providers.iter_mut() {
        provider.api_key = "test-key".to_string();
    }
    config.description.remote = RemoteStrategy::None;
    config.description.ocr.enabled = false;
    config
}
