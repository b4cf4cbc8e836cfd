/*!
 * Google Translate text-to-speech client.
 *
 * The endpoint only accepts short inputs, so the text is cut into chunks
 * that end at sentence punctuation where possible and at whitespace
 * otherwise. Each chunk comes back as a self-contained MP3 segment; the
 * segments are appended in order to form one playable stream.
 */

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use log::debug;
use reqwest::Client;
use url::Url;

use super::{AudioResult, SpeechSynthesizer};
use crate::errors::{ProviderError, SynthesisError};

/// Default translate TTS endpoint
pub const DEFAULT_ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// Default chunk size accepted by the endpoint
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 100;

const SENTENCE_ENDINGS: &[char] = &['.', '!', '?', ';', ':', '¡', '¿', '…', '\n'];

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Split text into chunks of at most `max_chars` characters.
///
/// Sentences are packed together while they fit. A sentence that does not
/// fit on its own is packed word by word, and a single word longer than the
/// limit is hard-split.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        if fits(&current, &sentence, max_chars) {
            append(&mut current, &sentence);
            continue;
        }

        for word in sentence.split_whitespace() {
            if fits(&current, word, max_chars) {
                append(&mut current, word);
                continue;
            }
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            if word.chars().count() <= max_chars {
                current.push_str(word);
            } else {
                let chars: Vec<char> = word.chars().collect();
                for piece in chars.chunks(max_chars) {
                    chunks.push(piece.iter().collect());
                }
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if SENTENCE_ENDINGS.contains(&c) {
            push_normalized(&mut sentences, &current);
            current.clear();
        }
    }
    push_normalized(&mut sentences, &current);
    sentences
}

fn push_normalized(sentences: &mut Vec<String>, raw: &str) {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !normalized.is_empty() {
        sentences.push(normalized);
    }
}

fn fits(current: &str, addition: &str, max_chars: usize) -> bool {
    let separator = usize::from(!current.is_empty());
    current.chars().count() + separator + addition.chars().count() <= max_chars
}

fn append(current: &mut String, addition: &str) {
    if !current.is_empty() {
        current.push(' ');
    }
    current.push_str(addition);
}

/// Synthesizer for the Google Translate TTS endpoint
#[derive(Debug, Clone)]
pub struct GoogleTts {
    client: Client,
    endpoint: String,
    max_chunk_chars: usize,
}

impl GoogleTts {
    /// Create a client for `endpoint`
    pub fn new(endpoint: impl Into<String>, timeout: Duration, max_chunk_chars: usize) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            max_chunk_chars,
        }
    }

    /// Build the request URL for one chunk
    pub fn chunk_url(&self, chunk: &str, language: &str, index: usize, total: usize) -> Result<Url, ProviderError> {
        let total = total.to_string();
        let index = index.to_string();
        let text_len = chunk.chars().count().to_string();
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", language),
                ("client", "tw-ob"),
                ("total", total.as_str()),
                ("idx", index.as_str()),
                ("textlen", text_len.as_str()),
            ],
        )
        .map_err(|e| ProviderError::RequestFailed(format!("invalid TTS endpoint '{}': {}", self.endpoint, e)))
    }

    async fn fetch(&self, url: Url) -> Result<Bytes, ProviderError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::REFERER, "https://translate.google.com/")
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("TTS request", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        response
            .bytes()
            .await
            .map_err(|e| ProviderError::from_transport("TTS response", e))
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioResult, SynthesisError> {
        let chunks = chunk_text(text, self.max_chunk_chars);
        if chunks.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let total = chunks.len();
        let mut audio = BytesMut::new();
        for (index, chunk) in chunks.iter().enumerate() {
            let url = self.chunk_url(chunk, language, index, total)?;
            let segment = self.fetch(url).await?;
            debug!("TTS chunk {}/{} returned {} bytes", index + 1, total, segment.len());
            audio.extend_from_slice(&segment);
        }

        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }

        Ok(AudioResult::new(audio.freeze(), language))
    }
}
