use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::language_utils::{LanguageCodeType, tesseract_languages, validate_language_code};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language detection config
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Image description config
    #[serde(default)]
    pub description: DescriptionConfig,

    /// Speech synthesis config
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Upper bound for parsing one document, in seconds
    #[serde(default = "default_extraction_timeout_secs")]
    pub extraction_timeout_secs: u64,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Language detection provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectionProvider {
    // @provider: Groq (OpenAI-compatible)
    #[default]
    Groq,
    // @provider: OpenAI
    OpenAI,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
    // @provider: Anthropic
    Anthropic,
}

impl DetectionProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Groq => "Groq",
            Self::OpenAI => "OpenAI",
            Self::LMStudio => "LM Studio",
            Self::Anthropic => "Anthropic",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Groq => "groq".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
            Self::Anthropic => "anthropic".to_string(),
        }
    }

    // @returns: Environment variable holding the API key, if the provider needs one
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Groq => Some("GROQ_API_KEY"),
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::LMStudio => None,
        }
    }

    // @returns: Whether requests use the OpenAI chat completions wire format
    pub fn is_openai_compatible(&self) -> bool {
        !matches!(self, Self::Anthropic)
    }
}

impl std::fmt::Display for DetectionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for DetectionProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAI),
            "lmstudio" => Ok(Self::LMStudio),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key (falls back to the provider's environment variable)
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: DetectionProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model_for(&provider_type),
            api_key: String::new(),
            endpoint: default_endpoint_for(&provider_type),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Language detection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectionConfig {
    /// Detection provider to use
    #[serde(default)]
    pub provider: DetectionProvider,

    /// Available detection providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Settings shared by all providers
    #[serde(default)]
    pub common: DetectionCommonConfig,
}

/// Detection settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectionCommonConfig {
    /// Prompt template; `{text}` is replaced by the text sample
    #[serde(default = "default_detection_prompt")]
    pub prompt: String,

    /// Number of leading characters sent for detection
    #[serde(default = "default_sample_chars")]
    pub sample_chars: usize,

    /// Output token budget for the answer
    #[serde(default = "default_detection_max_tokens")]
    pub max_tokens: u32,

    /// Temperature parameter for text generation
    #[serde(default)]
    pub temperature: f32,

    /// Nucleus sampling mass
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

impl Default for DetectionCommonConfig {
    fn default() -> Self {
        Self {
            prompt: default_detection_prompt(),
            sample_chars: default_sample_chars(),
            max_tokens: default_detection_max_tokens(),
            temperature: 0.0,
            top_p: default_top_p(),
        }
    }
}

/// Remote image description strategy
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStrategy {
    // @strategy: Vision chat model, one synchronous request
    #[default]
    Vision,
    // @strategy: Upload, submit and poll job service
    Job,
    // @strategy: Local OCR only
    None,
}

impl std::fmt::Display for RemoteStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Vision => "vision",
            Self::Job => "job",
            Self::None => "none",
        };
        write!(f, "{}", name)
    }
}

/// Vision chat describer configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VisionConfig {
    /// Vision-capable model name
    #[serde(default = "default_vision_model")]
    pub model: String,

    /// API key; falls back to `GROQ_API_KEY` or `OPENAI_API_KEY` by endpoint
    #[serde(default = "String::new")]
    pub api_key: String,

    /// OpenAI-compatible service URL
    #[serde(default = "default_groq_endpoint")]
    pub endpoint: String,

    /// Instruction sent with each image
    #[serde(default = "default_description_prompt")]
    pub prompt: String,

    /// Output token budget for one description
    #[serde(default = "default_vision_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: default_vision_model(),
            api_key: String::new(),
            endpoint: default_groq_endpoint(),
            prompt: default_description_prompt(),
            max_tokens: default_vision_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl VisionConfig {
    // @returns: Environment variable consulted when `api_key` is empty
    pub fn api_key_env(&self) -> &'static str {
        if self.endpoint.contains("groq.com") {
            "GROQ_API_KEY"
        } else {
            "OPENAI_API_KEY"
        }
    }

    /// Resolve the API key using `lookup` for environment variables
    pub fn resolve_api_key(&self, lookup: &dyn Fn(&str) -> Option<String>) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        lookup(self.api_key_env()).unwrap_or_default()
    }
}

/// Job description service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JobConfig {
    /// Service base URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// API key; falls back to `VOXVISION_JOB_API_KEY`
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Instruction submitted with each job
    #[serde(default = "default_description_prompt")]
    pub prompt: String,

    /// Delay between status checks in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum number of status checks per job
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            prompt: default_description_prompt(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_attempts: default_poll_attempts(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl JobConfig {
    /// Resolve the API key using `lookup` for environment variables
    pub fn resolve_api_key(&self, lookup: &dyn Fn(&str) -> Option<String>) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        lookup(JOB_API_KEY_ENV).unwrap_or_default()
    }
}

/// Local OCR fallback configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OcrConfig {
    /// Whether the Tesseract fallback is tried
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Tesseract binary name or path
    #[serde(default = "default_tesseract_binary")]
    pub binary: String,

    /// Recognition languages as ISO 639-1 codes
    #[serde(default = "default_ocr_languages")]
    pub languages: Vec<String>,

    /// Upper bound for one recognition run, in seconds
    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: default_tesseract_binary(),
            languages: default_ocr_languages(),
            timeout_secs: default_ocr_timeout_secs(),
        }
    }
}

/// Image description configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DescriptionConfig {
    /// Remote strategy tried before OCR
    #[serde(default)]
    pub remote: RemoteStrategy,

    /// Vision chat settings
    #[serde(default)]
    pub vision: VisionConfig,

    /// Job service settings
    #[serde(default)]
    pub job: JobConfig,

    /// Local OCR settings
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Longest image side sent to remote services, in pixels
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    /// JPEG quality for re-encoded images (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Images described at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for DescriptionConfig {
    fn default() -> Self {
        Self {
            remote: RemoteStrategy::default(),
            vision: VisionConfig::default(),
            job: JobConfig::default(),
            ocr: OcrConfig::default(),
            max_dimension: default_max_dimension(),
            jpeg_quality: default_jpeg_quality(),
            concurrency: default_concurrency(),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechConfig {
    /// Text-to-speech endpoint
    #[serde(default = "default_speech_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum characters per TTS request
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// ISO 639-1 codes speech is produced for
    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: default_speech_endpoint(),
            timeout_secs: default_timeout_secs(),
            max_chunk_chars: default_max_chunk_chars(),
            supported_languages: default_supported_languages(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching `log` filter
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

/// Environment variable for the job service key
pub const JOB_API_KEY_ENV: &str = "VOXVISION_JOB_API_KEY";

fn default_timeout_secs() -> u64 {
    30
}

fn default_extraction_timeout_secs() -> u64 {
    60
}

fn default_ocr_timeout_secs() -> u64 {
    60
}

fn default_sample_chars() -> usize {
    500
}

fn default_detection_max_tokens() -> u32 {
    10
}

fn default_vision_max_tokens() -> u32 {
    300
}

fn default_top_p() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_poll_attempts() -> u32 {
    10
}

fn default_max_dimension() -> u32 {
    1024
}

fn default_jpeg_quality() -> u8 {
    90
}

fn default_concurrency() -> usize {
    1
}

fn default_max_chunk_chars() -> usize {
    100
}

fn default_tesseract_binary() -> String {
    "tesseract".to_string()
}

fn default_ocr_languages() -> Vec<String> {
    vec!["es".to_string(), "en".to_string()]
}

fn default_supported_languages() -> Vec<String> {
    crate::pipeline::DEFAULT_SUPPORTED_LANGUAGES
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_speech_endpoint() -> String {
    crate::speech::google_tts::DEFAULT_ENDPOINT.to_string()
}

fn default_groq_endpoint() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lmstudio_endpoint() -> String {
    // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
    "http://localhost:1234/v1".to_string()
}

fn default_vision_model() -> String {
    "meta-llama/llama-4-scout-17b-16e-instruct".to_string()
}

fn default_endpoint_for(provider: &DetectionProvider) -> String {
    match provider {
        DetectionProvider::Groq => default_groq_endpoint(),
        DetectionProvider::OpenAI => default_openai_endpoint(),
        DetectionProvider::LMStudio => default_lmstudio_endpoint(),
        DetectionProvider::Anthropic => default_anthropic_endpoint(),
    }
}

fn default_model_for(provider: &DetectionProvider) -> String {
    match provider {
        DetectionProvider::Groq => "compound-beta".to_string(),
        DetectionProvider::OpenAI => "gpt-4o-mini".to_string(),
        // Placeholder; users should set to the loaded model name in LM Studio
        DetectionProvider::LMStudio => "local-model".to_string(),
        DetectionProvider::Anthropic => "claude-3-5-haiku-latest".to_string(),
    }
}

fn default_detection_prompt() -> String {
    "Detect the language of the following text and answer only with its ISO 639-1 code \
     (for example: es, en, fr, de, it, pt). Text: \"{text}\""
        .to_string()
}

fn default_description_prompt() -> String {
    "Describe this image in one or two sentences. If it contains text, transcribe the text.".to_string()
}

pub(crate) fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load the configuration at `path`, writing a default one when it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path)
                .context(format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .context(format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .context(format!("Failed to write default config to file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate the configuration against the process environment
    pub fn validate(&self) -> Result<()> {
        self.validate_with(&env_lookup)
    }

    /// Validate the configuration for consistency and required values
    ///
    /// `lookup` resolves environment variables for API keys left empty in the file.
    pub fn validate_with(&self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if self.extraction_timeout_secs == 0 {
            return Err(anyhow!("extraction_timeout_secs must be greater than zero"));
        }

        // Detection
        let detection = &self.detection;
        if detection.get_endpoint().is_empty() {
            return Err(anyhow!("Detection endpoint is required for {} provider", detection.provider.display_name()));
        }
        if detection.get_model().is_empty() {
            return Err(anyhow!("Detection model is required for {} provider", detection.provider.display_name()));
        }
        if let Some(var) = detection.provider.api_key_env() {
            if detection.resolve_api_key(lookup).is_empty() {
                return Err(anyhow!(
                    "Detection API key is required for {} provider (set it in the config or {})",
                    detection.provider.display_name(),
                    var
                ));
            }
        }
        if detection.common.sample_chars == 0 || detection.common.max_tokens == 0 {
            return Err(anyhow!("Detection sample_chars and max_tokens must be greater than zero"));
        }

        // Description
        let description = &self.description;
        match description.remote {
            RemoteStrategy::Vision => {
                if description.vision.endpoint.is_empty() || description.vision.model.is_empty() {
                    return Err(anyhow!("Vision endpoint and model are required for the vision strategy"));
                }
                if description.vision.resolve_api_key(lookup).is_empty() {
                    return Err(anyhow!(
                        "Vision API key is required (set it in the config or {})",
                        description.vision.api_key_env()
                    ));
                }
            }
            RemoteStrategy::Job => {
                if description.job.endpoint.is_empty() {
                    return Err(anyhow!("Job endpoint is required for the job strategy"));
                }
                if description.job.poll_attempts == 0 {
                    return Err(anyhow!("Job poll_attempts must be greater than zero"));
                }
            }
            RemoteStrategy::None => {}
        }
        if description.ocr.enabled {
            tesseract_languages(&description.ocr.languages)
                .context("Invalid OCR language list")?;
        }
        if description.max_dimension == 0 || description.concurrency == 0 {
            return Err(anyhow!("Description max_dimension and concurrency must be greater than zero"));
        }
        if !(1..=100).contains(&description.jpeg_quality) {
            return Err(anyhow!("jpeg_quality must be between 1 and 100"));
        }

        // Speech
        if self.speech.endpoint.is_empty() {
            return Err(anyhow!("Speech endpoint is required"));
        }
        if self.speech.max_chunk_chars == 0 {
            return Err(anyhow!("Speech max_chunk_chars must be greater than zero"));
        }
        if self.speech.supported_languages.is_empty() {
            return Err(anyhow!("At least one supported speech language is required"));
        }
        for code in &self.speech.supported_languages {
            match validate_language_code(code) {
                Ok(LanguageCodeType::Part1) => {}
                _ => return Err(anyhow!("Supported language '{}' is not an ISO 639-1 code", code)),
            }
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            detection: DetectionConfig::default(),
            description: DescriptionConfig::default(),
            speech: SpeechConfig::default(),
            extraction_timeout_secs: default_extraction_timeout_secs(),
            log_level: LogLevel::default(),
        }
    }
}

impl DetectionConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &DetectionProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        default_model_for(&self.provider)
    }

    /// Get the API key configured for the active provider
    pub fn get_api_key(&self) -> String {
        self.resolve_api_key(&env_lookup)
    }

    /// Resolve the API key, falling back to the provider's environment variable
    pub fn resolve_api_key(&self, lookup: &dyn Fn(&str) -> Option<String>) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }

        // LM Studio doesn't use API keys
        self.provider
            .api_key_env()
            .and_then(lookup)
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        default_endpoint_for(&self.provider)
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_timeout_secs)
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let mut config = Self {
            provider: DetectionProvider::default(),
            available_providers: Vec::new(),
            common: DetectionCommonConfig::default(),
        };

        // Add default providers
        config.available_providers.push(ProviderConfig::new(DetectionProvider::Groq));
        config.available_providers.push(ProviderConfig::new(DetectionProvider::OpenAI));
        config.available_providers.push(ProviderConfig::new(DetectionProvider::LMStudio));
        config.available_providers.push(ProviderConfig::new(DetectionProvider::Anthropic));

        config
    }
}
