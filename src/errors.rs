/*!
 * Error types for the voxvision application.
 *
 * Each pipeline component reports failures through its own error type so the
 * orchestrator can decide whether a failure ends the whole conversion or only
 * drops one image. Transport errors from the HTTP clients are converted into
 * `ProviderError` inside the clients and never cross the component boundary.
 */

use thiserror::Error;

/// Errors that can occur when working with remote provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Map a reqwest transport error onto the provider taxonomy
    pub fn from_transport(context: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(format!("{}: {}", context, error))
        } else if error.is_connect() {
            Self::ConnectionError(format!("{}: {}", context, error))
        } else {
            Self::RequestFailed(format!("{}: {}", context, error))
        }
    }

    /// Map a non-success HTTP status and its body onto the provider taxonomy
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

/// Errors raised while turning document bytes into text and pages
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The document bytes could not be parsed
    #[error("Failed to parse document: {0}")]
    Parse(String),

    /// Plain text payload was not valid UTF-8
    #[error("Text is not valid UTF-8: {0}")]
    InvalidEncoding(String),

    /// The category cannot be handled by the extractor
    #[error("Unsupported document category: {0}")]
    UnsupportedCategory(String),

    /// Parsing did not finish in time
    #[error("Document extraction timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors raised by a single image description attempt
#[derive(Error, Debug)]
pub enum DescribeError {
    /// The image could not be decoded or re-encoded
    #[error("Image could not be processed: {0}")]
    Image(String),

    /// The remote description service failed
    #[error("Description service error: {0}")]
    Provider(#[from] ProviderError),

    /// The remote job did not produce a description within the poll budget
    #[error("No description after {attempts} status checks")]
    PollBudgetExhausted {
        /// Number of status requests that were issued
        attempts: u32,
    },

    /// The remote job reported a failure
    #[error("Description job failed: {0}")]
    JobFailed(String),

    /// The local recognizer failed to run
    #[error("OCR failed: {0}")]
    Ocr(String),

    /// No strategy is configured
    #[error("No image describer configured")]
    NoStrategy,
}

/// Errors raised by the language detector
#[derive(Error, Debug)]
pub enum DetectionError {
    /// The completion backend failed
    #[error("Language detection request failed: {0}")]
    Provider(#[from] ProviderError),

    /// The backend answered without any usable code
    #[error("Language detection returned an empty answer")]
    EmptyAnswer,
}

/// Errors raised by the speech synthesizer
#[derive(Error, Debug)]
pub enum SynthesisError {
    /// The speech endpoint failed
    #[error("Speech synthesis request failed: {0}")]
    Provider(#[from] ProviderError),

    /// Nothing to synthesize
    #[error("Speech synthesis received empty text")]
    EmptyText,

    /// The endpoint returned no audio
    #[error("Speech synthesis returned no audio")]
    EmptyAudio,
}

/// Fatal errors that end a conversion request
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Extraction failed
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Language detection failed
    #[error("Detection error: {0}")]
    Detection(#[from] DetectionError),

    /// Speech synthesis failed
    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the conversion pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
