//! Inference engine seam

use crate::message::{GenerationOutput, GenerationRequest, PrepareOutcome, PreparedRequest};
use crate::{vision, LlmError};
use async_trait::async_trait;
use std::sync::Arc;

/// A structured-output vision-language model
///
/// Preparation and generation are separate so a caller can react to an
/// undecodable video before anything is sent.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Read and encode the request's media
    ///
    /// The default reads files from disk and sniffs their containers.
    async fn prepare(&self, request: &GenerationRequest) -> Result<PrepareOutcome, LlmError> {
        vision::prepare_request(request).await
    }

    /// Generate one output per request, in order
    async fn generate(&self, batch: &[PreparedRequest]) -> Result<Vec<GenerationOutput>, LlmError>;

    /// Identifier recorded in journal metadata
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<E: InferenceEngine + ?Sized> InferenceEngine for Arc<E> {
    async fn prepare(&self, request: &GenerationRequest) -> Result<PrepareOutcome, LlmError> {
        (**self).prepare(request).await
    }

    async fn generate(&self, batch: &[PreparedRequest]) -> Result<Vec<GenerationOutput>, LlmError> {
        (**self).generate(batch).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}
