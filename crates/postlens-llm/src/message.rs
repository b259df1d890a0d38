//! Multimodal message model
//!
//! A [`GenerationRequest`] refers to media by path. Preparation reads and
//! encodes that media into a [`PreparedRequest`], which is what engines
//! actually send.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions to the model
    System,
    /// Post content and task
    User,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

/// One piece of message content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePart {
    /// Plain text
    Text(String),
    /// Local image file
    Image(PathBuf),
    /// Local video file
    Video(PathBuf),
}

/// A chat message whose media is still on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Author
    pub role: Role,
    /// Ordered content
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    /// A system message holding only text
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            parts: vec![MessagePart::Text(text.into())],
        }
    }

    /// A user message with the given parts
    pub fn user(parts: Vec<MessagePart>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    /// Whether any part is a video
    pub fn has_video(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, MessagePart::Video(_)))
    }
}

/// Messages plus an optional JSON Schema the output must satisfy
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Conversation in order
    pub messages: Vec<ChatMessage>,
    /// Decoding constraint
    pub schema: Option<Value>,
}

impl GenerationRequest {
    /// Create a request
    pub fn new(messages: Vec<ChatMessage>, schema: Option<Value>) -> Self {
        Self { messages, schema }
    }

    /// Copy of this request with every video part removed
    pub fn without_videos(&self) -> Self {
        let messages = self
            .messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role,
                parts: m
                    .parts
                    .iter()
                    .filter(|p| !matches!(p, MessagePart::Video(_)))
                    .cloned()
                    .collect(),
            })
            .collect();
        Self {
            messages,
            schema: self.schema.clone(),
        }
    }
}

/// Media read from disk and base64-encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMedia {
    /// Source file
    pub path: PathBuf,
    /// Sniffed MIME type
    pub mime: &'static str,
    /// Base64 (standard alphabet) of the file contents
    pub data: String,
}

impl EncodedMedia {
    /// `data:<mime>;base64,<data>`
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data)
    }
}

/// Content of a prepared message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedPart {
    /// Plain text
    Text(String),
    /// Decoded image
    Image(EncodedMedia),
    /// Decoded video
    Video(EncodedMedia),
}

/// A chat message ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedMessage {
    /// Author
    pub role: Role,
    /// Ordered content
    pub parts: Vec<PreparedPart>,
}

/// A request whose media has been read and validated
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    /// Conversation in order
    pub messages: Vec<PreparedMessage>,
    /// Decoding constraint
    pub schema: Option<Value>,
}

impl PreparedRequest {
    /// Images in message order
    pub fn images(&self) -> impl Iterator<Item = &EncodedMedia> {
        self.parts().filter_map(|p| match p {
            PreparedPart::Image(media) => Some(media),
            _ => None,
        })
    }

    /// Videos in message order
    pub fn videos(&self) -> impl Iterator<Item = &EncodedMedia> {
        self.parts().filter_map(|p| match p {
            PreparedPart::Video(media) => Some(media),
            _ => None,
        })
    }

    fn parts(&self) -> impl Iterator<Item = &PreparedPart> {
        self.messages.iter().flat_map(|m| m.parts.iter())
    }
}

/// Result of preparing a request
///
/// A video that cannot be read or recognised is not an error: the caller
/// decides whether to drop it and try again. Everything else that goes wrong
/// is returned as `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum PrepareOutcome {
    /// All media decoded
    Ready(PreparedRequest),
    /// The video at `path` could not be decoded
    VideoUndecodable {
        /// Offending file
        path: PathBuf,
        /// Why decoding failed
        error: String,
    },
}

/// Generated text for one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOutput {
    /// One text per sampled candidate
    pub candidates: Vec<String>,
}

impl GenerationOutput {
    /// Output with a single candidate
    pub fn single(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![text.into()],
        }
    }
}

/// Pick the text to parse from a batch of outputs
///
/// The first output's first candidate, trimmed, when non-empty; otherwise
/// every candidate of every output concatenated and trimmed.
///
/// ```
/// use postlens_llm::{select_text, GenerationOutput};
///
/// let outputs = vec![GenerationOutput { candidates: vec!["  {}\n".into()] }];
/// assert_eq!(select_text(&outputs), "{}");
///
/// let outputs = vec![GenerationOutput { candidates: vec!["".into(), "a".into(), "b".into()] }];
/// assert_eq!(select_text(&outputs), "ab");
/// ```
pub fn select_text(outputs: &[GenerationOutput]) -> String {
    let primary = outputs
        .first()
        .and_then(|o| o.candidates.first())
        .map(|t| t.trim())
        .unwrap_or("");
    if !primary.is_empty() {
        return primary.to_string();
    }
    outputs
        .iter()
        .flat_map(|o| o.candidates.iter())
        .map(String::as_str)
        .collect::<String>()
        .trim()
        .to_string()
}
