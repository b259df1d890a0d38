//! OpenAI-compatible chat completions engine
//!
//! Talks to any server exposing `/v1/chat/completions` with structured
//! output support, e.g. a local vLLM instance serving a vision-language
//! model.
//!
//! # Features
//!
//! - Media inlined as base64 `data:` URLs (`image_url` / `video_url` parts)
//! - `response_format` set to a strict `json_schema` when the request has one
//! - Optional bearer token read from an environment variable
//! - Retry with exponential backoff on transport errors, 429 and 5xx
//!
//! # Examples
//!
//! ```no_run
//! use postlens_llm::{EngineConfig, OpenAiCompatEngine};
//!
//! let config = EngineConfig {
//!     endpoint: "http://localhost:8000".to_string(),
//!     ..EngineConfig::default()
//! };
//! let engine = OpenAiCompatEngine::new(config).unwrap();
//! ```

use crate::engine::InferenceEngine;
use crate::message::{GenerationOutput, PreparedPart, PreparedRequest};
use crate::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Default server endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Default model name
pub const DEFAULT_MODEL: &str = "Qwen3-VL-8B-Thinking";

/// Default request timeout (10 minutes; video prompts are slow)
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Engine settings, loadable from the `[engine]` table of the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Server base URL
    pub endpoint: String,
    /// Model name sent with every request
    pub model: String,
    /// Environment variable holding a bearer token
    pub api_key_env: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum generated tokens
    pub max_tokens: u32,
    /// Candidates sampled per request
    pub candidates: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Attempts per request before giving up
    pub max_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: None,
            temperature: 0.2,
            max_tokens: 1200,
            candidates: 1,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl EngineConfig {
    /// Check that the settings are usable
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("endpoint must not be empty".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be between 0.0 and 2.0".to_string());
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }
        if self.candidates == 0 {
            return Err("candidates must be greater than 0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Full URL of the chat completions route
    pub fn completions_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }
}

/// Engine backed by an OpenAI-compatible HTTP server
pub struct OpenAiCompatEngine {
    config: EngineConfig,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: Vec<WireContent>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContent {
    Text { text: String },
    ImageUrl { image_url: WireUrl },
    VideoUrl { video_url: WireUrl },
}

#[derive(Serialize)]
struct WireUrl {
    url: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    strict: bool,
    schema: Value,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatEngine {
    /// Create an engine from validated settings
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Other` if the settings are invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: EngineConfig) -> Result<Self, LlmError> {
        config.validate().map_err(LlmError::Other)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        let api_key = match config.api_key_env.as_deref() {
            Some(var) => match std::env::var(var) {
                Ok(key) if !key.is_empty() => Some(key),
                _ => {
                    warn!("API key variable {} is not set, sending requests without a token", var);
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    /// Settings in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn request_body<'a>(&'a self, request: &PreparedRequest) -> ChatCompletionRequest<'a> {
        let messages = request
            .messages
            .iter()
            .map(|message| WireMessage {
                role: message.role.as_str(),
                content: message
                    .parts
                    .iter()
                    .map(|part| match part {
                        PreparedPart::Text(text) => WireContent::Text { text: text.clone() },
                        PreparedPart::Image(media) => WireContent::ImageUrl {
                            image_url: WireUrl {
                                url: media.data_url(),
                            },
                        },
                        PreparedPart::Video(media) => WireContent::VideoUrl {
                            video_url: WireUrl {
                                url: media.data_url(),
                            },
                        },
                    })
                    .collect(),
            })
            .collect();

        ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            n: self.config.candidates,
            response_format: request.schema.clone().map(|schema| ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "extraction",
                    strict: true,
                    schema,
                },
            }),
        }
    }

    async fn complete(&self, request: &PreparedRequest) -> Result<GenerationOutput, LlmError> {
        let url = self.config.completions_url();
        let body = self.request_body(request);
        let max_attempts = self.config.max_retries.max(1);

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < max_attempts {
            let mut builder = self.client.post(&url).json(&body);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
                            LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                        })?;
                        let candidates = parsed
                            .choices
                            .into_iter()
                            .map(|c| c.message.content.unwrap_or_default())
                            .collect();
                        return Ok(GenerationOutput { candidates });
                    } else if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(LlmError::ModelNotAvailable(self.config.model.clone()));
                    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(LlmError::RateLimitExceeded);
                    } else {
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        let error = LlmError::Communication(format!("HTTP {}: {}", status, error_text));
                        if !status.is_server_error() {
                            return Err(error);
                        }
                        last_error = Some(error);
                    }
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < max_attempts {
                // Exponential backoff: 1s, 2s, 4s, etc.
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                debug!("Retrying {} in {:?}", url, delay);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

#[async_trait]
impl InferenceEngine for OpenAiCompatEngine {
    async fn generate(&self, batch: &[PreparedRequest]) -> Result<Vec<GenerationOutput>, LlmError> {
        let mut outputs = Vec::with_capacity(batch.len());
        for request in batch {
            outputs.push(self.complete(request).await?);
        }
        Ok(outputs)
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}
