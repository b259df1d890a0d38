//! Persisted records: extraction results, journal entries, bad-video records

use crate::post::Post;
use crate::stance::upgrade_extraction;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Local media files actually handed to the model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUsed {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
}

/// Outcome of extracting one post
///
/// `extraction` is whatever the model returned, parsed as JSON, or
/// `{"_raw": <text>}` when the text was not JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub extraction: Value,
    #[serde(default)]
    pub media_used: MediaUsed,
}

impl ExtractionResult {
    /// Whether the model output could not be parsed
    pub fn is_degraded(&self) -> bool {
        self.extraction.get("_raw").is_some()
    }
}

/// Provenance of a journal entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalMeta {
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub source_corpus_file: String,
    /// RFC 3339 UTC timestamp
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub model_id: String,
    #[serde(default)]
    pub publish_time: Option<String>,
}

/// One line of the journal, and the content of a per-post snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    #[serde(default)]
    pub meta: JournalMeta,
    #[serde(default)]
    pub input: Post,
    #[serde(default)]
    pub result: ExtractionResult,
}

impl JournalEntry {
    /// The post this entry records
    ///
    /// Prefers `meta.post_id`, then `result.post_id`, then the input post's id.
    pub fn post_id(&self) -> &str {
        [
            self.meta.post_id.as_str(),
            self.result.post_id.as_str(),
            self.input.id.as_str(),
        ]
        .into_iter()
        .find(|id| !id.is_empty())
        .unwrap_or("")
    }

    /// Bring the stored extraction up to the current schema layout
    pub fn upgrade(&mut self) -> bool {
        upgrade_extraction(&mut self.result.extraction)
    }
}

/// A video that could not be decoded for a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadVideoRecord {
    pub post_id: String,
    pub video_path: String,
    pub error: String,
    pub media_root: String,
}
