/*!
 * Image description strategies.
 *
 * An image is turned into text by one of several interchangeable describers:
 * - `vision_chat`: synchronous vision model behind an OpenAI-compatible API
 * - `job`: asynchronous upload/submit/poll description service
 * - `ocr`: local Tesseract recognition
 *
 * `DescriberChain` tries them in order until one produces a description.
 */

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use crate::errors::DescribeError;

pub mod job;
pub mod normalize;
pub mod ocr;
pub mod vision_chat;

pub use job::{JobDescriber, Sleeper, TokioSleeper};
pub use normalize::{ImageNormalizer, NormalizedImage};
pub use ocr::TesseractDescriber;
pub use vision_chat::VisionChatDescriber;

/// Successful outcome of a description attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescribeOutcome {
    /// The image was described
    Described(String),
    /// The strategy ran but found nothing to report
    NothingRecognized,
}

impl DescribeOutcome {
    /// Build an outcome from raw text, treating blank text as nothing recognized
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self::NothingRecognized
        } else {
            Self::Described(trimmed.to_string())
        }
    }

    /// The description text, if any
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Described(text) => Some(text),
            Self::NothingRecognized => None,
        }
    }
}

/// Common trait for every image description strategy
#[async_trait]
pub trait ImageDescriber: Send + Sync + Debug {
    /// Short name used in log lines
    fn name(&self) -> &str;

    /// Describe one encoded image
    async fn describe(&self, image: &[u8]) -> Result<DescribeOutcome, DescribeError>;
}

/// Ordered list of describers tried until one returns a description
#[derive(Debug, Default, Clone)]
pub struct DescriberChain {
    strategies: Vec<Arc<dyn ImageDescriber>>,
}

impl DescriberChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy at the end of the chain
    pub fn with(mut self, strategy: Arc<dyn ImageDescriber>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Number of configured strategies
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether no strategy is configured
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Names of the configured strategies, in order
    pub fn names(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.name().to_string()).collect()
    }
}

#[async_trait]
impl ImageDescriber for DescriberChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn describe(&self, image: &[u8]) -> Result<DescribeOutcome, DescribeError> {
        let mut last_error = None;
        let mut nothing_recognized = false;

        for strategy in &self.strategies {
            match strategy.describe(image).await {
                Ok(DescribeOutcome::Described(text)) => {
                    debug!("Image described by {}", strategy.name());
                    return Ok(DescribeOutcome::Described(text));
                }
                Ok(DescribeOutcome::NothingRecognized) => {
                    debug!("{} recognized nothing in image", strategy.name());
                    nothing_recognized = true;
                }
                Err(e) => {
                    warn!("{} failed to describe image: {}", strategy.name(), e);
                    last_error = Some(e);
                }
            }
        }

        if nothing_recognized {
            return Ok(DescribeOutcome::NothingRecognized);
        }

        Err(last_error.unwrap_or(DescribeError::NoStrategy))
    }
}
