/*!
 * Document to speech pipeline.
 *
 * - `transcript`: merging of body text and image descriptions
 * - `orchestrator`: stage machine driving extraction, description,
 *   detection and synthesis
 */

pub mod orchestrator;
pub mod transcript;

pub use orchestrator::{
    ConversionOutcome, ConversionReport, DEFAULT_SUPPORTED_LANGUAGES, Pipeline, PipelineSettings, PipelineStage,
    TranscriptionResult,
};
pub use transcript::{ImageNote, Transcript};
