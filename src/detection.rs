/*!
 * Language detection through a language-model completion.
 *
 * Only a bounded prefix of the transcript is sent, with a deterministic
 * instruction asking for the bare ISO 639-1 code. The answer is sanitized
 * but not checked against the speech engine's supported list; the pipeline
 * owns that check.
 */

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::errors::{DetectionError, ProviderError};
use crate::language_utils::sanitize_detected_code;
use crate::providers::Provider;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::openai::{OpenAI, OpenAIRequest};

/// Placeholder replaced by the text sample in the prompt template
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Detects the dominant language of a text
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    /// Return the best-guess language code for `text`
    async fn detect(&self, text: &str) -> Result<String, DetectionError>;
}

/// Sampling parameters for a completion call
#[derive(Debug, Clone)]
pub struct CompletionParams {
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling mass
    pub top_p: f32,
    /// Output token budget
    pub max_tokens: u32,
}

/// Single-prompt text completion, implemented by each provider client
#[async_trait]
pub trait CompletionBackend: Send + Sync + Debug {
    /// Backend name for log lines
    fn name(&self) -> &str;

    /// Complete one user prompt and return the generated text
    async fn complete_text(&self, prompt: &str, params: &CompletionParams) -> Result<String, ProviderError>;
}

#[async_trait]
impl CompletionBackend for OpenAI {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn complete_text(&self, prompt: &str, params: &CompletionParams) -> Result<String, ProviderError> {
        let request = OpenAIRequest::new(&params.model)
            .add_message("user", prompt)
            .temperature(params.temperature)
            .top_p(params.top_p)
            .max_tokens(params.max_tokens);
        let response = self.complete(request).await?;
        Ok(OpenAI::extract_text(&response))
    }
}

#[async_trait]
impl CompletionBackend for Anthropic {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete_text(&self, prompt: &str, params: &CompletionParams) -> Result<String, ProviderError> {
        let request = AnthropicRequest::new(&params.model, params.max_tokens)
            .add_message("user", prompt)
            .temperature(params.temperature)
            .top_p(params.top_p);
        let response = self.complete(request).await?;
        Ok(Anthropic::extract_text(&response))
    }
}

/// Take the first `max_chars` characters of the trimmed text
pub fn sample_text(text: &str, max_chars: usize) -> String {
    text.trim().chars().take(max_chars).collect()
}

/// Fill the prompt template with a text sample
pub fn build_prompt(template: &str, sample: &str) -> String {
    if template.contains(TEXT_PLACEHOLDER) {
        template.replace(TEXT_PLACEHOLDER, sample)
    } else {
        format!("{}\n{}", template, sample)
    }
}

/// Language detector that asks a completion backend for the code
#[derive(Debug)]
pub struct LlmLanguageDetector {
    backend: Arc<dyn CompletionBackend>,
    params: CompletionParams,
    prompt_template: String,
    sample_chars: usize,
}

impl LlmLanguageDetector {
    /// Create a detector
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        params: CompletionParams,
        prompt_template: impl Into<String>,
        sample_chars: usize,
    ) -> Self {
        Self {
            backend,
            params,
            prompt_template: prompt_template.into(),
            sample_chars,
        }
    }
}

#[async_trait]
impl LanguageDetector for LlmLanguageDetector {
    async fn detect(&self, text: &str) -> Result<String, DetectionError> {
        let sample = sample_text(text, self.sample_chars);
        let prompt = build_prompt(&self.prompt_template, &sample);

        let answer = self.backend.complete_text(&prompt, &self.params).await?;
        debug!("{} answered language detection with {:?}", self.backend.name(), answer);

        sanitize_detected_code(&answer).ok_or(DetectionError::EmptyAnswer)
    }
}
