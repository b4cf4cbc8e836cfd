/*!
 * Conversion pipeline orchestrator.
 *
 * A conversion walks through the stages
 * `Uploaded → Extracted → Transcribed → LanguageChecked → Synthesized`,
 * halting early on an empty transcript or an unsupported language, and
 * ending in `Failed` on any fatal error. Image description failures never
 * end a conversion; they only drop that image from the transcript.
 */

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

use super::transcript::{ImageNote, Transcript};
use crate::detection::LanguageDetector;
use crate::document::{Document, DocumentCategory, PageExtractor};
use crate::errors::PipelineError;
use crate::language_utils::{describe_language, is_supported};
use crate::speech::{AudioResult, SpeechSynthesizer};
use crate::vision::{DescribeOutcome, ImageDescriber};

/// Languages the default speech engine is configured for
pub const DEFAULT_SUPPORTED_LANGUAGES: &[&str] = &["en", "es", "de", "fr", "it", "pt"];

/// Stage a conversion has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Document received, nothing done yet
    Uploaded,
    /// Text and image descriptions assembled
    Extracted,
    /// Transcript is non-empty and ready for detection
    Transcribed,
    /// Detected language is supported
    LanguageChecked,
    /// Audio produced
    Synthesized,
    /// A fatal error ended the conversion
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uploaded => "uploaded",
            Self::Extracted => "extracted",
            Self::Transcribed => "transcribed",
            Self::LanguageChecked => "language checked",
            Self::Synthesized => "synthesized",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Terminal result of a conversion
#[derive(Debug)]
pub enum ConversionOutcome {
    /// Speech was produced
    Synthesized(AudioResult),
    /// Nothing to convert
    EmptyTranscript,
    /// The detected language cannot be spoken
    UnsupportedLanguage(String),
    /// A fatal error ended the conversion
    Failed(PipelineError),
}

/// Transcript assembled from a document, before any language work
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    /// Merged transcript
    pub transcript: Transcript,
    /// Non-fatal problems met while building it
    pub warnings: Vec<String>,
    /// Number of pages in the source document
    pub page_count: usize,
    /// Number of images sent to the describer
    pub image_count: usize,
}

/// Everything known about one conversion request
#[derive(Debug)]
pub struct ConversionReport {
    /// Last stage reached
    pub stage: PipelineStage,
    /// Rendered transcript, when extraction succeeded
    pub transcript: Option<String>,
    /// Detected language code, when detection ran
    pub language: Option<String>,
    /// Non-fatal problems, in the order they occurred
    pub warnings: Vec<String>,
    /// Terminal outcome
    pub outcome: ConversionOutcome,
}

impl ConversionReport {
    fn failed(stage_data: Partial, error: PipelineError) -> Self {
        Self {
            stage: PipelineStage::Failed,
            transcript: stage_data.transcript,
            language: stage_data.language,
            warnings: stage_data.warnings,
            outcome: ConversionOutcome::Failed(error),
        }
    }

    /// Audio, if the conversion reached synthesis
    pub fn audio(&self) -> Option<&AudioResult> {
        match &self.outcome {
            ConversionOutcome::Synthesized(audio) => Some(audio),
            _ => None,
        }
    }

    /// Whether audio was produced
    pub fn is_success(&self) -> bool {
        self.stage == PipelineStage::Synthesized
    }
}

// State accumulated before the terminal outcome is known
#[derive(Default)]
struct Partial {
    transcript: Option<String>,
    language: Option<String>,
    warnings: Vec<String>,
}

/// Tunables for the orchestrator
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Language codes the synthesizer accepts
    pub supported_languages: Vec<String>,
    /// Images described at the same time (1 = sequential)
    pub describe_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            supported_languages: DEFAULT_SUPPORTED_LANGUAGES.iter().map(|c| c.to_string()).collect(),
            describe_concurrency: 1,
        }
    }
}

/// End-to-end document to speech conversion
#[derive(Clone)]
pub struct Pipeline {
    extractor: Arc<dyn PageExtractor>,
    describer: Arc<dyn ImageDescriber>,
    detector: Arc<dyn LanguageDetector>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    settings: PipelineSettings,
}

impl Pipeline {
    /// Assemble a pipeline from its components
    pub fn new(
        extractor: Arc<dyn PageExtractor>,
        describer: Arc<dyn ImageDescriber>,
        detector: Arc<dyn LanguageDetector>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            extractor,
            describer,
            detector,
            synthesizer,
            settings,
        }
    }

    /// Active settings
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Build the transcript for a document without detecting or synthesizing
    pub async fn transcribe(&self, document: &Document) -> Result<TranscriptionResult, PipelineError> {
        debug!("Transcribing {} as {}", document.display_name(), document.category);

        match document.category {
            DocumentCategory::PlainText => {
                let extraction = self.extractor.extract(&document.data, document.category).await?;
                Ok(TranscriptionResult {
                    transcript: Transcript::from_body(extraction.full_text),
                    warnings: Vec::new(),
                    page_count: 0,
                    image_count: 0,
                })
            }
            DocumentCategory::Paginated => self.transcribe_paginated(document).await,
            DocumentCategory::Image => Ok(self.transcribe_image(document).await),
        }
    }

    async fn transcribe_paginated(&self, document: &Document) -> Result<TranscriptionResult, PipelineError> {
        let extraction = self.extractor.extract(&document.data, document.category).await?;
        let image_count = extraction.image_count();
        info!(
            "Extracted {} page(s) and {} image(s) from {}",
            extraction.pages.len(),
            image_count,
            document.display_name()
        );

        let jobs = extraction
            .pages
            .iter()
            .flat_map(|page| page.images.iter())
            .map(|image| {
                let describer = Arc::clone(&self.describer);
                async move { (image.page_number, describer.describe(&image.data).await) }
            });

        // `buffered` yields results in submission order, which is page order.
        let results: Vec<_> = stream::iter(jobs)
            .buffered(self.settings.describe_concurrency.max(1))
            .collect()
            .await;

        let mut transcript = Transcript::from_body(extraction.full_text.clone());
        let mut warnings = Vec::new();
        for (page_number, result) in results {
            match result {
                Ok(DescribeOutcome::Described(description)) => {
                    info!("Image on page {}: {}", page_number, description);
                    transcript.push_note(ImageNote::new(page_number, description));
                }
                Ok(DescribeOutcome::NothingRecognized) => {
                    let message = format!("Nothing recognized in image on page {}", page_number);
                    warn!("{}", message);
                    warnings.push(message);
                }
                Err(e) => {
                    let message = format!("Image on page {} omitted: {}", page_number, e);
                    warn!("{}", message);
                    warnings.push(message);
                }
            }
        }

        Ok(TranscriptionResult {
            transcript,
            warnings,
            page_count: extraction.pages.len(),
            image_count,
        })
    }

    async fn transcribe_image(&self, document: &Document) -> TranscriptionResult {
        let mut warnings = Vec::new();
        let body = match self.describer.describe(&document.data).await {
            Ok(DescribeOutcome::Described(description)) => {
                info!("Image described: {}", description);
                description
            }
            Ok(DescribeOutcome::NothingRecognized) => {
                let message = format!("Nothing recognized in image {}", document.display_name());
                warn!("{}", message);
                warnings.push(message);
                String::new()
            }
            Err(e) => {
                let message = format!("Image {} could not be described: {}", document.display_name(), e);
                warn!("{}", message);
                warnings.push(message);
                String::new()
            }
        };

        TranscriptionResult {
            transcript: Transcript::from_body(body),
            warnings,
            page_count: 0,
            image_count: 1,
        }
    }

    /// Run a full conversion and report how far it got
    pub async fn convert(&self, document: &Document) -> ConversionReport {
        let mut partial = Partial::default();

        let transcription = match self.transcribe(document).await {
            Ok(transcription) => transcription,
            Err(e) => {
                warn!("Conversion of {} failed: {}", document.display_name(), e);
                return ConversionReport::failed(partial, e);
            }
        };

        let text = transcription.transcript.render();
        partial.transcript = Some(text.clone());
        partial.warnings = transcription.warnings;

        if transcription.transcript.is_blank() {
            let message = format!("Nothing to convert in {}", document.display_name());
            warn!("{}", message);
            partial.warnings.push(message);
            return ConversionReport {
                stage: PipelineStage::Extracted,
                transcript: partial.transcript,
                language: None,
                warnings: partial.warnings,
                outcome: ConversionOutcome::EmptyTranscript,
            };
        }

        let language = match self.detector.detect(&text).await {
            Ok(code) => code,
            Err(e) => return ConversionReport::failed(partial, e.into()),
        };
        partial.language = Some(language.clone());

        if !is_supported(&language, &self.settings.supported_languages) {
            info!(
                "Detected {}, which is not supported for speech",
                describe_language(&language)
            );
            return ConversionReport {
                stage: PipelineStage::LanguageChecked,
                transcript: partial.transcript,
                language: partial.language,
                warnings: partial.warnings,
                outcome: ConversionOutcome::UnsupportedLanguage(language),
            };
        }
        info!("Detected {}", describe_language(&language));

        match self.synthesizer.synthesize(&text, &language).await {
            Ok(audio) => {
                info!("Synthesized {} bytes of {} speech", audio.audio.len(), language);
                ConversionReport {
                    stage: PipelineStage::Synthesized,
                    transcript: partial.transcript,
                    language: partial.language,
                    warnings: partial.warnings,
                    outcome: ConversionOutcome::Synthesized(audio),
                }
            }
            Err(e) => ConversionReport::failed(partial, e.into()),
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("describer", &self.describer.name())
            .field("settings", &self.settings)
            .finish()
    }
}
