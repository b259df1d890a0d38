//! Run-level result types

use serde::{Deserialize, Serialize};

/// What an extraction run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Corpus files opened
    pub files: usize,

    /// Posts read from those files
    pub posts_seen: usize,

    /// Posts sent to the model and journalled
    pub processed: usize,

    /// Posts skipped because the journal already had them
    pub skipped_resumed: usize,

    /// Posts skipped for lacking an id
    pub skipped_no_id: usize,

    /// Processed posts whose model output was not JSON
    pub degraded: usize,

    /// Videos dropped because they could not be decoded
    pub bad_videos: usize,

    /// Whether the run ended at the processed-count limit
    pub stopped_at_limit: bool,
}
