/*!
 * Mock pipeline components for testing
 *
 * Each mock counts its calls and records its inputs so tests can assert
 * which remote capabilities a conversion touched, without any network.
 */

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use voxvision::detection::LanguageDetector;
use voxvision::document::{DocumentCategory, Extraction, ImageAsset, Page, PageExtractor};
use voxvision::errors::{DescribeError, DetectionError, ExtractionError, ProviderError, SynthesisError};
use voxvision::pipeline::{Pipeline, PipelineSettings};
use voxvision::speech::{AudioResult, SpeechSynthesizer};
use voxvision::vision::{DescribeOutcome, ImageDescriber};

/// Build a page whose images carry the given labels as their bytes
pub fn page(number: u32, text: &str, image_labels: &[&str]) -> Page {
    Page {
        number,
        text: text.to_string(),
        images: image_labels
            .iter()
            .map(|label| ImageAsset {
                page_number: number,
                data: Bytes::from(label.as_bytes().to_vec()),
                extension: "png".to_string(),
            })
            .collect(),
    }
}

/// Extractor returning a fixed extraction, or decoding plain text
#[derive(Debug, Default)]
pub struct MockExtractor {
    pages: Option<Vec<Page>>,
    fail: bool,
    pub calls: AtomicUsize,
}

impl MockExtractor {
    /// Decode plain text, return no pages for PDFs
    pub fn text() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Return the given pages for paginated documents
    pub fn with_pages(pages: Vec<Page>) -> Arc<Self> {
        Arc::new(Self {
            pages: Some(pages),
            ..Default::default()
        })
    }

    /// Fail every extraction with a parse error
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }
}

#[async_trait]
impl PageExtractor for MockExtractor {
    async fn extract(&self, data: &[u8], category: DocumentCategory) -> Result<Extraction, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ExtractionError::Parse("mock parse failure".to_string()));
        }
        match category {
            DocumentCategory::PlainText => Ok(Extraction::unpaginated(String::from_utf8_lossy(data).to_string())),
            DocumentCategory::Paginated => Ok(Extraction::from_pages(self.pages.clone().unwrap_or_default())),
            DocumentCategory::Image => Err(ExtractionError::UnsupportedCategory(category.to_string())),
        }
    }
}

/// Describer that echoes the image label, failing for selected labels
///
/// Labels of the form `slow:<ms>:<name>` sleep before answering.
#[derive(Debug, Default)]
pub struct MockDescriber {
    failing: HashSet<String>,
    blank: HashSet<String>,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<String>>,
}

impl MockDescriber {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail for the listed labels
    pub fn failing_on(labels: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing: labels.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        })
    }

    /// Recognize nothing for the listed labels
    pub fn blank_on(labels: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            blank: labels.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl ImageDescriber for MockDescriber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn describe(&self, image: &[u8]) -> Result<DescribeOutcome, DescribeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let label = String::from_utf8_lossy(image).to_string();
        self.seen.lock().unwrap().push(label.clone());

        let mut name = label.as_str();
        if let Some(rest) = label.strip_prefix("slow:") {
            if let Some((millis, remainder)) = rest.split_once(':') {
                let millis: u64 = millis.parse().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(millis)).await;
                name = remainder;
            }
        }

        if self.failing.contains(name) {
            return Err(DescribeError::Provider(ProviderError::ConnectionError("mock outage".to_string())));
        }
        if self.blank.contains(name) {
            return Ok(DescribeOutcome::NothingRecognized);
        }
        Ok(DescribeOutcome::Described(format!("description of {}", name)))
    }
}

/// Detector answering a fixed code
#[derive(Debug)]
pub struct MockDetector {
    answer: Result<String, ()>,
    pub calls: AtomicUsize,
    pub texts: Mutex<Vec<String>>,
}

impl MockDetector {
    pub fn answering(code: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(code.to_string()),
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: Err(()),
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LanguageDetector for MockDetector {
    async fn detect(&self, text: &str) -> Result<String, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());
        self.answer
            .clone()
            .map_err(|_| DetectionError::Provider(ProviderError::Timeout("mock timeout".to_string())))
    }
}

/// Synthesizer producing fake MP3 bytes derived from the text
#[derive(Debug, Default)]
pub struct MockSynthesizer {
    fail: bool,
    pub calls: AtomicUsize,
    pub texts: Mutex<Vec<String>>,
}

impl MockSynthesizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioResult, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(SynthesisError::EmptyAudio);
        }
        let mut audio = b"ID3".to_vec();
        audio.extend_from_slice(text.as_bytes());
        Ok(AudioResult::new(Bytes::from(audio), language))
    }
}

/// Handles to every mock behind a pipeline
pub struct MockPipeline {
    pub pipeline: Pipeline,
    pub extractor: Arc<MockExtractor>,
    pub describer: Arc<MockDescriber>,
    pub detector: Arc<MockDetector>,
    pub synthesizer: Arc<MockSynthesizer>,
}

impl MockPipeline {
    /// Assemble a pipeline from mocks with default settings
    pub fn new(
        extractor: Arc<MockExtractor>,
        describer: Arc<MockDescriber>,
        detector: Arc<MockDetector>,
        synthesizer: Arc<MockSynthesizer>,
    ) -> Self {
        Self::with_settings(extractor, describer, detector, synthesizer, PipelineSettings::default())
    }

    pub fn with_settings(
        extractor: Arc<MockExtractor>,
        describer: Arc<MockDescriber>,
        detector: Arc<MockDetector>,
        synthesizer: Arc<MockSynthesizer>,
        settings: PipelineSettings,
    ) -> Self {
        let pipeline = Pipeline::new(
            extractor.clone(),
            describer.clone(),
            detector.clone(),
            synthesizer.clone(),
            settings,
        );
        Self {
            pipeline,
            extractor,
            describer,
            detector,
            synthesizer,
        }
    }

    pub fn describe_calls(&self) -> usize {
        self.describer.calls.load(Ordering::SeqCst)
    }

    pub fn detect_calls(&self) -> usize {
        self.detector.calls.load(Ordering::SeqCst)
    }

    pub fn synth_calls(&self) -> usize {
        self.synthesizer.calls.load(Ordering::SeqCst)
    }
}
