//! Postlens Inference Layer
//!
//! Multimodal message model, vision preprocessing and pluggable inference
//! engines behind the [`InferenceEngine`] trait.
//!
//! # Engines
//!
//! - `MockEngine`: deterministic queued responses for testing
//! - `OpenAiCompatEngine`: any OpenAI-compatible `/v1/chat/completions` server
//!
//! # Examples
//!
//! ```
//! use postlens_llm::{ChatMessage, GenerationRequest, InferenceEngine, MockEngine, PrepareOutcome, select_text};
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let engine = MockEngine::new(r#"{"post_id": "P1"}"#);
//! let request = GenerationRequest::new(vec![ChatMessage::system("JSON only")], None);
//! let PrepareOutcome::Ready(prepared) = engine.prepare(&request).await.unwrap() else { unreachable!() };
//! let outputs = engine.generate(&[prepared]).await.unwrap();
//! assert_eq!(select_text(&outputs), r#"{"post_id": "P1"}"#);
//! # });
//! # }
//! ```

#![warn(missing_docs)]

pub mod engine;
pub mod message;
pub mod openai;
pub mod vision;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use engine::InferenceEngine;
pub use message::{
    select_text, ChatMessage, EncodedMedia, GenerationOutput, GenerationRequest, MessagePart,
    PrepareOutcome, PreparedMessage, PreparedPart, PreparedRequest, Role,
};
pub use openai::{EngineConfig, OpenAiCompatEngine};

/// Errors that can occur during inference
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the engine
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// An image could not be read or is not a supported format
    #[error("Unusable media {path}: {reason}")]
    Media {
        /// File that failed
        path: String,
        /// Why it failed
        reason: String,
    },

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error,
}

/// Mock engine for deterministic testing
///
/// Queued replies are served first, one per request, then the default
/// response. Every prepared request is captured for inspection.
///
/// # Examples
///
/// ```
/// use postlens_llm::MockEngine;
///
/// let engine = MockEngine::new("{}");
/// engine.push_response("not json");
/// engine.push_error();
/// assert_eq!(engine.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockEngine {
    default_response: String,
    queue: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<PreparedRequest>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockEngine {
    /// Create an engine answering every request with `response`
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue a reply for the next request
    pub fn push_response(&self, response: impl Into<String>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(MockReply::Text(response.into()));
        }
    }

    /// Queue a failure for the next request
    pub fn push_error(&self) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(MockReply::Error);
        }
    }

    /// Number of `generate` calls so far
    pub fn call_count(&self) -> usize {
        self.call_count.lock().map(|c| *c).unwrap_or(0)
    }

    /// Every request passed to `generate`, in order
    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new("{}")
    }
}

#[async_trait]
impl InferenceEngine for MockEngine {
    async fn generate(&self, batch: &[PreparedRequest]) -> Result<Vec<GenerationOutput>, LlmError> {
        if let Ok(mut count) = self.call_count.lock() {
            *count += 1;
        }
        if let Ok(mut requests) = self.requests.lock() {
            requests.extend(batch.iter().cloned());
        }

        let mut outputs = Vec::with_capacity(batch.len());
        for _ in batch {
            let reply = self.queue.lock().ok().and_then(|mut q| q.pop_front());
            match reply {
                Some(MockReply::Text(text)) => outputs.push(GenerationOutput::single(text)),
                Some(MockReply::Error) => return Err(LlmError::Other("Mock error".to_string())),
                None => outputs.push(GenerationOutput::single(self.default_response.clone())),
            }
        }
        Ok(outputs)
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}
