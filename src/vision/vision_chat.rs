/*!
 * Synchronous remote describer backed by a vision chat model.
 */

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;

use super::normalize::ImageNormalizer;
use super::{DescribeOutcome, ImageDescriber};
use crate::errors::DescribeError;
use crate::providers::Provider;
use crate::providers::openai::{OpenAI, OpenAIRequest};

/// Sends a normalized image inline to an OpenAI-compatible vision model
#[derive(Debug)]
pub struct VisionChatDescriber {
    client: OpenAI,
    model: String,
    prompt: String,
    max_tokens: u32,
    normalizer: ImageNormalizer,
}

impl VisionChatDescriber {
    /// Create a describer for the given client and model
    pub fn new(
        client: OpenAI,
        model: impl Into<String>,
        prompt: impl Into<String>,
        max_tokens: u32,
        normalizer: ImageNormalizer,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            prompt: prompt.into(),
            max_tokens,
            normalizer,
        }
    }

    /// Build the chat request for already normalized JPEG bytes
    pub fn build_request(&self, jpeg: &[u8]) -> OpenAIRequest {
        let data_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg));
        OpenAIRequest::new(&self.model)
            .add_image_message(&self.prompt, data_url)
            .temperature(0.0)
            .max_tokens(self.max_tokens)
    }
}

#[async_trait]
impl ImageDescriber for VisionChatDescriber {
    fn name(&self) -> &str {
        "vision"
    }

    async fn describe(&self, image: &[u8]) -> Result<DescribeOutcome, DescribeError> {
        let normalized = self.normalizer.normalize_blocking(image).await?;
        debug!(
            "Sending {}x{} image ({} bytes) to {}",
            normalized.width,
            normalized.height,
            normalized.data.len(),
            self.model
        );

        let response = self.client.complete(self.build_request(&normalized.data)).await?;
        Ok(DescribeOutcome::from_text(OpenAI::extract_text(&response)))
    }
}
