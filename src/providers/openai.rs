use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::Provider;
use crate::errors::ProviderError;

/// Client for OpenAI-compatible chat completion APIs (OpenAI, Groq, LM Studio)
#[derive(Debug, Clone)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for bearer authentication
    api_key: String,
    /// Base URL up to and including the version segment (e.g. `.../v1`)
    endpoint: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<OpenAIMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Top probability mass to consider (nucleus sampling)
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,

    /// Streaming is never requested
    stream: bool,
}

/// Chat message with either plain text or multi-part content
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: OpenAIContent,
}

/// Message content; vision requests use the multi-part form
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenAIContent {
    /// Plain text content
    Text(String),
    /// Text and image parts
    Parts(Vec<ContentPart>),
}

/// One part of a multi-part message
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text part
    Text {
        /// The text
        text: String,
    },
    /// Image part referencing a URL or data URL
    ImageUrl {
        /// The image reference
        image_url: ImageUrl,
    },
}

/// Image reference inside a content part
#[derive(Debug, Serialize, Deserialize)]
pub struct ImageUrl {
    /// `https://` or `data:` URL
    pub url: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    /// Generated choices
    pub choices: Vec<OpenAIChoice>,
    /// Token usage information
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// One generated choice
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    /// The generated message
    pub message: OpenAIResponseMessage,
}

/// Message returned inside a choice
#[derive(Debug, Deserialize)]
pub struct OpenAIResponseMessage {
    /// Role of the author
    #[serde(default)]
    pub role: String,
    /// Generated text, absent for tool-only answers
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct TokenUsage {
    /// Number of prompt tokens
    pub prompt_tokens: u32,
    /// Number of completion tokens
    pub completion_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

impl OpenAIRequest {
    /// Create a new chat completion request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            top_p: None,
            max_tokens: None,
            stream: false,
        }
    }

    /// Add a plain text message
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: OpenAIContent::Text(content.into()),
        });
        self
    }

    /// Add a user message carrying a prompt and an inline image
    pub fn add_image_message(mut self, prompt: impl Into<String>, image_url: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: OpenAIContent::Parts(vec![
                ContentPart::Text { text: prompt.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: image_url.into() },
                },
            ]),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the top_p (nucleus sampling)
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set the output token budget
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl OpenAI {
    /// Create a new client with a request timeout
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }

    fn completions_url(&self) -> String {
        if self.endpoint.is_empty() {
            "https://api.openai.com/v1/chat/completions".to_string()
        } else {
            format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
        }
    }
}

#[async_trait]
impl Provider for OpenAI {
    type Request = OpenAIRequest;
    type Response = OpenAIResponse;

    async fn complete(&self, request: OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let mut builder = self.client.post(self.completions_url()).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("chat completion request", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("OpenAI-compatible API error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        response
            .json::<OpenAIResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/models", self.endpoint.trim_end_matches('/'));
        let mut builder = self.client.get(url);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("model listing", e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProviderError::from_status(status.as_u16(), status.to_string()))
        }
    }

    fn extract_text(response: &OpenAIResponse) -> String {
        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}
