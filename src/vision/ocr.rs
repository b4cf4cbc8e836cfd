/*!
 * Local OCR fallback using the Tesseract command line tool.
 */

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::process::Command;

use super::{DescribeOutcome, ImageDescriber};
use crate::errors::DescribeError;

/// Runs `tesseract` against the unmodified image
#[derive(Debug, Clone)]
pub struct TesseractDescriber {
    // @field: Path or name of the tesseract binary
    binary: String,
    // @field: `+`-joined Tesseract language names (e.g. `spa+eng`)
    languages: String,
    // @field: Upper bound for one recognition run
    timeout: Duration,
}

impl TesseractDescriber {
    /// Create a describer for the given binary and language list
    pub fn new(binary: impl Into<String>, languages: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            languages: languages.into(),
            timeout,
        }
    }

    /// Language argument passed with `-l`
    pub fn languages(&self) -> &str {
        &self.languages
    }
}

#[async_trait]
impl ImageDescriber for TesseractDescriber {
    fn name(&self) -> &str {
        "ocr"
    }

    async fn describe(&self, image: &[u8]) -> Result<DescribeOutcome, DescribeError> {
        // The staged copy is removed when `staged` drops, on every return path.
        let mut staged = tempfile::Builder::new()
            .prefix("voxvision-ocr-")
            .tempfile()
            .map_err(|e| DescribeError::Ocr(format!("failed to create temp file: {}", e)))?;
        staged
            .write_all(image)
            .and_then(|_| staged.flush())
            .map_err(|e| DescribeError::Ocr(format!("failed to write temp file: {}", e)))?;

        let mut command = Command::new(&self.binary);
        command
            .arg(staged.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| DescribeError::Ocr(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| DescribeError::Ocr(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DescribeError::Ocr(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        debug!("OCR recognized {} characters", text.trim().chars().count());
        Ok(DescribeOutcome::from_text(text.trim()))
    }
}
