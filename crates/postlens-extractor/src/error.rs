//! Error types for the Extractor

use postlens_llm::LlmError;
use postlens_media::MediaError;
use thiserror::Error;

/// Errors that abort an extraction run
///
/// Recoverable per-post problems (bad video, unparseable model output,
/// missing media) never surface here.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Corpus file is not valid JSON or lacks the `weibo` array
    #[error("Malformed corpus file {path}: {reason}")]
    Corpus {
        /// Offending file
        path: String,
        /// Parser message
        reason: String,
    },

    /// Journal or snapshot could not be written or read
    #[error("Journal error: {0}")]
    Journal(String),

    /// Inference engine error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Media layer error outside per-URL resolution
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
