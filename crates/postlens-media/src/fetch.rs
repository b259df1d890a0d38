//! Remote media fetching
//!
//! The resolver only needs "put the bytes at this URL into this file".
//! `HttpFetcher` does that over HTTP with a bounded timeout; `MockFetcher`
//! serves canned bytes for tests and counts every call.

use crate::error::MediaError;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Default download timeout (60 seconds)
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Downloads a URL into a local file
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Write the body of `url` to `dest`, returning the number of bytes written
    ///
    /// On error `dest` may hold a partial body; the caller owns cleanup.
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64, MediaError>;
}

#[async_trait]
impl<F: MediaFetcher + ?Sized> MediaFetcher for Arc<F> {
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64, MediaError> {
        (**self).fetch_to(url, dest).await
    }
}

/// HTTP(S) fetcher backed by `reqwest`
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaError::Fetch {
                url: String::new(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    /// Create a fetcher with the default timeout
    pub fn with_default_timeout() -> Result<Self, MediaError> {
        Self::new(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64, MediaError> {
        let fetch_err = |e: reqwest::Error| MediaError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(fetch_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(fetch_err)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

/// Mock fetcher for deterministic testing
///
/// Serves registered bodies; unknown URLs fail like a 404.
///
/// # Examples
///
/// ```
/// use postlens_media::MockFetcher;
///
/// let fetcher = MockFetcher::new().with("https://cdn/a.jpg", b"bytes".to_vec());
/// assert_eq!(fetcher.call_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    bodies: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    /// Create a fetcher that knows no URLs
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a body for `url`
    pub fn with(self, url: impl Into<String>, body: Vec<u8>) -> Self {
        if let Ok(mut bodies) = self.bodies.lock() {
            bodies.insert(url.into(), body);
        }
        self
    }

    /// URLs requested so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of fetches attempted
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl MediaFetcher for MockFetcher {
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64, MediaError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }
        let body = self
            .bodies
            .lock()
            .ok()
            .and_then(|bodies| bodies.get(url).cloned());
        match body {
            Some(body) => {
                tokio::fs::write(dest, &body).await?;
                Ok(body.len() as u64)
            }
            None => Err(MediaError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
