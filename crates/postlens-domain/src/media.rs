//! Media module - categories, resolution outcomes and the offline media map

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Broad media category; each has its own index and extension set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    /// Still images
    Image,
    /// Video clips
    Video,
}

impl MediaCategory {
    /// Get the category name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::Video => "video",
        }
    }

    /// Extensions (lowercase, no dot) indexed for this category
    pub fn default_extensions(&self) -> &'static [&'static str] {
        match self {
            MediaCategory::Image => &["jpg", "jpeg", "png", "webp"],
            MediaCategory::Video => &["mp4", "mov", "mkv"],
        }
    }
}

/// Which media field of a post is being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// `original_pictures`
    OriginalPictures,
    /// `retweet_pictures`
    RetweetPictures,
    /// `video_url`
    Video,
}

impl MediaKind {
    /// Category used for indexing and extension defaults
    pub fn category(&self) -> MediaCategory {
        match self {
            MediaKind::OriginalPictures | MediaKind::RetweetPictures => MediaCategory::Image,
            MediaKind::Video => MediaCategory::Video,
        }
    }

    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::OriginalPictures => "original_pictures",
            MediaKind::RetweetPictures => "retweet_pictures",
            MediaKind::Video => "video",
        }
    }
}

/// The tier that produced (or failed to produce) a local file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Path taken from the post's persisted `media` field
    Embedded,
    /// Path derived from the crawler's file naming rule
    NamingConvention,
    /// Downloaded bytes matched a local file by size and SHA-256
    ContentHash,
    /// Downloaded into run-scoped scratch space
    RemoteDownload,
    /// No tier produced a file
    Unresolved,
}

/// One media item considered during resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCandidate {
    /// URL as listed on the post
    pub url: String,

    /// Resolved local file; absent means unresolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,

    /// How `local_path` was obtained
    pub resolution_method: ResolutionMethod,
}

impl MediaCandidate {
    /// A candidate resolved by `method`
    pub fn resolved(url: impl Into<String>, path: impl Into<String>, method: ResolutionMethod) -> Self {
        Self {
            url: url.into(),
            local_path: Some(path.into()),
            resolution_method: method,
        }
    }

    /// A candidate no tier could resolve
    pub fn unresolved(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            local_path: None,
            resolution_method: ResolutionMethod::Unresolved,
        }
    }

    /// Whether a local file was found
    pub fn is_resolved(&self) -> bool {
        self.local_path.is_some()
    }
}

/// Output of the offline content-hash pass: URL → local path per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMap {
    /// Image URL mappings
    #[serde(default)]
    pub images: BTreeMap<String, String>,

    /// Video URL mappings
    #[serde(default)]
    pub videos: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_categories() {
        assert_eq!(MediaKind::OriginalPictures.category(), MediaCategory::Image);
        assert_eq!(MediaKind::RetweetPictures.category(), MediaCategory::Image);
        assert_eq!(MediaKind::Video.category(), MediaCategory::Video);
    }

    #[test]
    fn test_candidate_serialization() {
        let candidate = MediaCandidate::unresolved("https://a/1.jpg");
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["resolution_method"], "unresolved");
        assert!(json.get("local_path").is_none());

        let candidate =
            MediaCandidate::resolved("https://a/1.jpg", "/m/1.jpg", ResolutionMethod::ContentHash);
        assert!(candidate.is_resolved());
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["resolution_method"], "content_hash");
    }
}
