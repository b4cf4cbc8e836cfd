use anyhow::{Result, Context, anyhow};
use log::{error, warn, info, debug};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use indicatif::{ProgressBar, ProgressStyle, MultiProgress};

use crate::app_config::{Config, RemoteStrategy, env_lookup};
use crate::detection::{CompletionBackend, CompletionParams, LlmLanguageDetector};
use crate::document::{Document, DocumentExtractor};
use crate::file_utils::FileManager;
use crate::language_utils::{describe_language, tesseract_languages};
use crate::pipeline::{ConversionOutcome, Pipeline, PipelineSettings};
use crate::providers::anthropic::Anthropic;
use crate::providers::openai::OpenAI;
use crate::speech::GoogleTts;
use crate::vision::job::PollPolicy;
use crate::vision::{DescriberChain, ImageNormalizer, JobDescriber, TesseractDescriber, VisionChatDescriber};

// @module: Application controller for document conversion

/// Per-run switches coming from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    // @field: Overwrite existing outputs
    pub force_overwrite: bool,
    // @field: Stop after writing the transcript
    pub transcript_only: bool,
    // @field: Also write the transcript next to the audio
    pub save_transcript: bool,
}

/// What happened to one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Audio written
    Converted {
        /// Path of the MP3 file
        audio_path: PathBuf,
        /// Detected language code
        language: String,
    },
    /// Transcript written, no speech requested
    Transcribed(PathBuf),
    /// Outputs already existed
    Skipped,
    /// The pipeline halted without audio (empty or unsupported input)
    Halted(String),
}

/// Counts for a folder run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub processed: usize,
    pub skipped: usize,
    pub halted: usize,
    pub errors: usize,
}

/// Main application controller for document to speech conversion
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Conversion pipeline built from the configuration
    pipeline: Pipeline,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let pipeline = build_pipeline(&config)?;
        Ok(Self { config, pipeline })
    }

    /// Create a controller around an already assembled pipeline
    pub fn with_pipeline(config: Config, pipeline: Pipeline) -> Self {
        Self { config, pipeline }
    }

    /// Pipeline used for conversions
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Convert one input file, writing outputs into `output_dir`
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, options: &RunOptions) -> Result<FileOutcome> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(&input_file, &output_dir, &multi_progress, options).await
    }

    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_dir: &Path,
        multi_progress: &MultiProgress,
        options: &RunOptions,
    ) -> Result<FileOutcome> {
        let start_time = std::time::Instant::now();

        if !input_file.exists() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        FileManager::ensure_dir(output_dir)?;

        let transcript_path = FileManager::transcript_path(input_file, output_dir);
        if !options.force_overwrite {
            if options.transcript_only && transcript_path.exists() {
                warn!("Skipping file, transcript already exists (use -f to force overwrite)");
                return Ok(FileOutcome::Skipped);
            }
            if !options.transcript_only {
                if let Some(existing) = self.existing_audio_output(input_file, output_dir) {
                    warn!("Skipping file, audio already exists at {} (use -f to force overwrite)", existing.display());
                    return Ok(FileOutcome::Skipped);
                }
            }
        }

        let document = self.load_document(input_file)?;

        let spinner = multi_progress.add(ProgressBar::new_spinner());
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner.set_message(format!("Converting {}", document.display_name()));

        if options.transcript_only {
            let transcription = self.pipeline.transcribe(&document).await;
            spinner.finish_and_clear();
            let transcription = transcription
                .with_context(|| format!("Failed to transcribe {}", input_file.display()))?;

            FileManager::write_to_file(&transcript_path, &transcription.transcript.render())?;
            info!("Success: {}", transcript_path.display());
            return Ok(FileOutcome::Transcribed(transcript_path));
        }

        info!("VoxVision: {} - {}",
            self.config.detection.provider.display_name(),
            self.config.detection.get_model());

        let report = self.pipeline.convert(&document).await;
        spinner.finish_and_clear();

        for warning in &report.warnings {
            debug!("{}: {}", document.display_name(), warning);
        }

        if options.save_transcript {
            if let Some(transcript) = &report.transcript {
                FileManager::write_to_file(&transcript_path, transcript)?;
                info!("Transcript: {}", transcript_path.display());
            }
        }

        let outcome = match report.outcome {
            ConversionOutcome::Synthesized(audio) => {
                let audio_path = FileManager::generate_output_path(input_file, output_dir, &audio.language, "mp3");
                FileManager::write_bytes(&audio_path, &audio.audio)?;
                info!("Success: {}", audio_path.display());
                FileOutcome::Converted {
                    audio_path,
                    language: audio.language,
                }
            }
            ConversionOutcome::EmptyTranscript => {
                let message = format!("Nothing to convert in {}", input_file.display());
                warn!("{}", message);
                FileOutcome::Halted(message)
            }
            ConversionOutcome::UnsupportedLanguage(code) => {
                let message = format!(
                    "Language {} ({}) is not supported for speech",
                    describe_language(&code),
                    code
                );
                warn!("{}", message);
                FileOutcome::Halted(message)
            }
            ConversionOutcome::Failed(e) => {
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("Conversion of {} failed at stage {}", input_file.display(), report.stage));
            }
        };

        info!("Conversion completed in {}.", Self::format_duration(start_time.elapsed()));
        Ok(outcome)
    }

    /// Read an input file into a document, detecting its category
    pub fn load_document(&self, input_file: &Path) -> Result<Document> {
        let category = FileManager::detect_category(input_file)?
            .ok_or_else(|| anyhow!("Unsupported file type: {:?}", input_file))?;
        let data = FileManager::read_bytes(input_file)?;

        let mut document = Document::new(data, category);
        if let Some(name) = input_file.file_name() {
            document = document.with_file_name(name.to_string_lossy());
        }
        Ok(document)
    }

    /// Existing audio output for any supported language, if one was written before
    fn existing_audio_output(&self, input_file: &Path, output_dir: &Path) -> Option<PathBuf> {
        self.config
            .speech
            .supported_languages
            .iter()
            .map(|code| FileManager::generate_output_path(input_file, output_dir, code, "mp3"))
            .find(|path| path.exists())
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Run the workflow in folder mode, converting every document in a directory
    ///
    /// Outputs go next to each input unless `output_dir` is given. Failures are
    /// logged per file and do not stop the run.
    pub async fn run_folder(&self, input_dir: PathBuf, output_dir: Option<PathBuf>, options: &RunOptions) -> Result<FolderSummary> {
        let start_time = std::time::Instant::now();

        if !input_dir.exists() {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let documents = FileManager::find_documents(&input_dir)?;
        if documents.is_empty() {
            return Err(anyhow!("No convertible documents found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(documents.len() as u64));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(template_result.progress_chars("█▓▒░"));
        folder_pb.set_message("Processing files");

        let mut summary = FolderSummary::default();

        for document_path in documents.iter() {
            let file_name = document_path.file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            folder_pb.set_message(format!("Processing: {}", file_name));

            let target_dir = match (&output_dir, document_path.parent()) {
                (Some(dir), _) => dir.clone(),
                (None, Some(parent)) => parent.to_path_buf(),
                (None, None) => input_dir.clone(),
            };

            match self.run_with_progress(document_path, &target_dir, &multi_progress, options).await {
                Ok(FileOutcome::Skipped) => summary.skipped += 1,
                Ok(FileOutcome::Halted(_)) => summary.halted += 1,
                Ok(_) => summary.processed += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    summary.errors += 1;
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");

        info!(
            "Folder processing completed: {} processed, {} skipped, {} halted, {} errors - Duration: {}",
            summary.processed,
            summary.skipped,
            summary.halted,
            summary.errors,
            Self::format_duration(start_time.elapsed())
        );

        Ok(summary)
    }
}

/// Assemble the conversion pipeline described by a configuration
pub fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let extractor = Arc::new(DocumentExtractor::new(Duration::from_secs(config.extraction_timeout_secs)));

    let describer = Arc::new(build_describer_chain(config)?);

    let detection = &config.detection;
    let timeout = Duration::from_secs(detection.get_timeout_secs());
    let backend: Arc<dyn CompletionBackend> = if detection.provider.is_openai_compatible() {
        Arc::new(OpenAI::new(detection.get_api_key(), detection.get_endpoint(), timeout))
    } else {
        Arc::new(Anthropic::new(detection.get_api_key(), detection.get_endpoint(), timeout))
    };
    let params = CompletionParams {
        model: detection.get_model(),
        temperature: detection.common.temperature,
        top_p: detection.common.top_p,
        max_tokens: detection.common.max_tokens,
    };
    let detector = Arc::new(LlmLanguageDetector::new(
        backend,
        params,
        detection.common.prompt.clone(),
        detection.common.sample_chars,
    ));

    let speech = &config.speech;
    let synthesizer = Arc::new(GoogleTts::new(
        speech.endpoint.clone(),
        Duration::from_secs(speech.timeout_secs),
        speech.max_chunk_chars,
    ));

    let settings = PipelineSettings {
        supported_languages: speech.supported_languages.clone(),
        describe_concurrency: config.description.concurrency,
    };

    Ok(Pipeline::new(extractor, describer, detector, synthesizer, settings))
}

/// Build the ordered describer chain: remote strategy first, then local OCR
pub fn build_describer_chain(config: &Config) -> Result<DescriberChain> {
    let description = &config.description;
    let normalizer = ImageNormalizer::new(description.max_dimension, description.jpeg_quality);

    let mut chain = DescriberChain::new();

    match description.remote {
        RemoteStrategy::Vision => {
            let vision = &description.vision;
            let client = OpenAI::new(
                vision.resolve_api_key(&env_lookup),
                vision.endpoint.clone(),
                Duration::from_secs(vision.timeout_secs),
            );
            chain = chain.with(Arc::new(VisionChatDescriber::new(
                client,
                vision.model.clone(),
                vision.prompt.clone(),
                vision.max_tokens,
                normalizer,
            )));
        }
        RemoteStrategy::Job => {
            let job = &description.job;
            let policy = PollPolicy {
                interval: Duration::from_millis(job.poll_interval_ms),
                attempts: job.poll_attempts,
            };
            chain = chain.with(Arc::new(JobDescriber::new(
                job.endpoint.clone(),
                job.resolve_api_key(&env_lookup),
                job.prompt.clone(),
                Duration::from_secs(job.timeout_secs),
                policy,
                normalizer,
            )));
        }
        RemoteStrategy::None => {}
    }

    if description.ocr.enabled {
        let ocr = &description.ocr;
        let languages = tesseract_languages(&ocr.languages).context("Invalid OCR language list")?;
        chain = chain.with(Arc::new(TesseractDescriber::new(
            ocr.binary.clone(),
            languages,
            Duration::from_secs(ocr.timeout_secs),
        )));
    }

    if chain.is_empty() {
        warn!("No image describer configured; images will be skipped");
    } else {
        debug!("Image describers: {}", chain.names().join(" -> "));
    }

    Ok(chain)
}
