/*!
 * Text-to-speech synthesis.
 *
 * The synthesizer is only ever called with a language code that already
 * passed the supported-language gate in the pipeline.
 */

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::SynthesisError;

pub mod google_tts;

pub use google_tts::{GoogleTts, chunk_text};

/// Synthesized speech for one transcript
#[derive(Clone, PartialEq, Eq)]
pub struct AudioResult {
    /// MP3 byte stream
    pub audio: Bytes,
    /// Language the speech was synthesized in
    pub language: String,
    /// Suggested download name, derived from the language code
    pub file_name: String,
}

impl AudioResult {
    /// Wrap synthesized audio for the given language
    pub fn new(audio: Bytes, language: impl Into<String>) -> Self {
        let language = language.into();
        let file_name = format!("voz_{}.mp3", language);
        Self {
            audio,
            language,
            file_name,
        }
    }
}

impl std::fmt::Debug for AudioResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioResult")
            .field("audio", &format_args!("{} bytes", self.audio.len()))
            .field("language", &self.language)
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// Converts text into spoken audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` spoken in `language`
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioResult, SynthesisError>;
}
