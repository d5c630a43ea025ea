//! Source image retrieval.
//!
//! [`SourceFetcher`] is the seam between the pipelines and the network. The
//! production implementation, [`HttpFetcher`], is a `reqwest` client with a
//! hard timeout and a body-size cap; tests substitute in-memory fetchers.
//!
//! Uploaded frames arrive as temporary files and are read back with
//! [`read_upload`]. Both are the only suspension points of the pipelines.

use crate::config::FetchConfig;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} is larger than the {limit} byte limit")]
    TooLarge { url: String, limit: u64 },
    #[error("{url}: {message}")]
    Transport { url: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Retrieves raw source bytes for a URL.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// `reqwest`-backed fetcher. A timeout is always set; a missing response
/// becomes [`FetchError::Timeout`], never a hang.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            timeout,
            max_bytes: config.max_source_bytes,
        })
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let too_large = || FetchError::TooLarge {
            url: url.to_string(),
            limit: self.max_bytes,
        };
        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(too_large());
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(url, e))? {
            if body.len() as u64 + chunk.len() as u64 > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        tracing::debug!(url, bytes = body.len(), "fetched source image");
        Ok(body.freeze())
    }
}

/// Read an uploaded temporary file.
pub async fn read_upload(path: &Path) -> Result<Vec<u8>, FetchError> {
    Ok(tokio::fs::read(path).await?)
}
