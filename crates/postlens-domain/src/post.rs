//! Post module - one crawled record from a corpus file

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Crawler placeholder meaning "this post has no media of that kind"
pub const NO_MEDIA_SENTINEL: &str = "无";

/// A single post as it appears in a corpus file's `weibo` array
///
/// Fields the pipeline does not interpret are kept in `extra` so the post
/// can be written back (or snapshotted into the journal) without loss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Globally unique post identifier
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,

    /// Post text
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,

    /// ISO-like timestamp; the first 10 characters are the date
    #[serde(default, deserialize_with = "lenient_string")]
    pub publish_time: String,

    /// Comma-joined picture URLs of the post itself, or the sentinel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_pictures: Option<String>,

    /// Comma-joined picture URLs of the reposted post, or the sentinel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retweet_pictures: Option<String>,

    /// Video URL, or the sentinel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    /// URL → local path mapping written back by an offline pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<EmbeddedMedia>,

    /// Everything else the crawler emitted
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A corpus file: a `weibo` array of posts plus whatever else the crawler wrote
///
/// `weibo` is required; a file without it is malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusDocument {
    /// Posts in file order
    pub weibo: Vec<Post>,

    /// Other top-level keys (user profile etc.), preserved on write-back
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl CorpusDocument {
    /// Parse a corpus file's contents
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Pre-resolved media mapping persisted onto a post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedMedia {
    /// Links for `original_pictures`
    #[serde(default)]
    pub original_pictures: Vec<MediaLink>,

    /// Links for `retweet_pictures`
    #[serde(default)]
    pub retweet_pictures: Vec<MediaLink>,

    /// Links for `video_url` (at most one in practice)
    #[serde(default)]
    pub video: Vec<MediaLink>,
}

/// One URL and the local file it was matched to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaLink {
    /// Remote URL as listed on the post
    #[serde(default)]
    pub url: String,

    /// Local file path
    #[serde(default)]
    pub path: String,
}

impl MediaLink {
    /// Create a link
    pub fn new(url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
        }
    }

    /// Both URL and path are present
    pub fn is_complete(&self) -> bool {
        !self.url.is_empty() && !self.path.is_empty()
    }
}

impl Post {
    /// Picture URLs of the post itself; `None` when absent or the sentinel
    pub fn original_picture_urls(&self) -> Option<Vec<String>> {
        split_media_field(self.original_pictures.as_deref())
    }

    /// Picture URLs of the reposted post; `None` when absent or the sentinel
    pub fn retweet_picture_urls(&self) -> Option<Vec<String>> {
        split_media_field(self.retweet_pictures.as_deref())
    }

    /// The single video URL; `None` when absent or the sentinel
    pub fn video(&self) -> Option<String> {
        split_media_field(self.video_url.as_deref()).and_then(|urls| urls.into_iter().next())
    }

    /// `YYYYMMDD` taken from the first 10 characters of `publish_time`
    ///
    /// ```
    /// use postlens_domain::Post;
    ///
    /// let post = Post { publish_time: "2024-05-01T10:00:00".into(), ..Default::default() };
    /// assert_eq!(post.date_prefix().as_deref(), Some("20240501"));
    /// ```
    pub fn date_prefix(&self) -> Option<String> {
        let date: String = self
            .publish_time
            .chars()
            .take(10)
            .filter(|c| *c != '-')
            .collect();
        if date.is_empty() {
            None
        } else {
            Some(date)
        }
    }
}

/// Split a comma-joined media field, honouring the sentinel
///
/// Returns `None` for a missing field, an empty field, the sentinel, or a
/// field that contains only separators.
pub fn split_media_field(field: Option<&str>) -> Option<Vec<String>> {
    let raw = field?.trim();
    if raw.is_empty() || raw == NO_MEDIA_SENTINEL {
        return None;
    }
    let urls: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect();
    if urls.is_empty() {
        None
    } else {
        Some(urls)
    }
}

/// Accept strings, numbers and null for string-typed crawler fields
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}
