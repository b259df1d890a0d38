//! Configuration for the Extractor

use postlens_media::{ResolveOptions, DEFAULT_FETCH_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for an extraction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Directory searched recursively for `.json` corpus files
    pub corpus_root: PathBuf,

    /// Media root; when absent each corpus file's own directory is used
    pub media_root: Option<PathBuf>,

    /// Maximum images sent per post
    pub max_images: usize,

    /// Keep downloads as a last resort when no local file matches
    pub allow_remote_download: bool,

    /// Never send videos
    pub skip_videos: bool,

    /// Skip posts already present in the journal
    pub resume: bool,

    /// Stop after this many processed posts (0 = unlimited)
    pub limit: usize,

    /// Append-only JSONL journal
    pub journal_path: PathBuf,

    /// Directory of `{post_id}.json` snapshots
    pub snapshot_dir: PathBuf,

    /// Append-only JSONL log of undecodable videos
    pub bad_video_log: PathBuf,

    /// Match downloads against local files by content hash
    pub hash_match: bool,

    /// Download timeout (seconds)
    pub fetch_timeout_secs: u64,
}

impl ExtractorConfig {
    /// Default configuration for a corpus root
    pub fn for_root(corpus_root: impl Into<PathBuf>) -> Self {
        Self {
            corpus_root: corpus_root.into(),
            ..Self::default()
        }
    }

    /// Get the fetch timeout as a Duration
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Resolver settings derived from this configuration
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            max_images: self.max_images,
            allow_remote: self.allow_remote_download,
            hash_match: self.hash_match,
            skip_videos: self.skip_videos,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.corpus_root.as_os_str().is_empty() {
            return Err("corpus_root must be set".to_string());
        }
        if self.max_images == 0 {
            return Err("max_images must be greater than 0".to_string());
        }
        if self.fetch_timeout_secs == 0 {
            return Err("fetch_timeout_secs must be greater than 0".to_string());
        }
        if self.journal_path.as_os_str().is_empty() {
            return Err("journal_path must be set".to_string());
        }
        if self.journal_path.starts_with(&self.snapshot_dir) {
            return Err("journal_path cannot live inside snapshot_dir".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            corpus_root: PathBuf::new(),
            media_root: None,
            max_images: 3,
            allow_remote_download: false,
            skip_videos: false,
            resume: false,
            limit: 0,
            journal_path: PathBuf::from("processed_data/extractions.jsonl"),
            snapshot_dir: PathBuf::from("processed_data/extractions"),
            bad_video_log: PathBuf::from("processed_data/bad_videos.jsonl"),
            hash_match: true,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl ExtractorConfig {
    /// Local-only preset: no network access at all
    pub fn local_only() -> Self {
        Self {
            allow_remote_download: false,
            hash_match: false,
            ..Self::default()
        }
    }

    /// Networked preset: hash-match and keep downloads as a last resort
    pub fn networked() -> Self {
        Self {
            allow_remote_download: true,
            hash_match: true,
            fetch_timeout_secs: 120,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str)
            .map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
