//! Error types for media resolution

use thiserror::Error;

/// Errors that can occur while indexing or fetching media
#[derive(Error, Debug)]
pub enum MediaError {
    /// Local filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network or transport failure while downloading
    #[error("Fetch failed for {url}: {reason}")]
    Fetch {
        /// URL being downloaded
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// URL being downloaded
        url: String,
        /// Response status code
        status: u16,
    },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
