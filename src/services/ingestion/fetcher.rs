//! HTTP document fetching.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::config::IngestionConfig;
use super::error::{FailureKind, PipelineError, PipelineStage};

/// A fetched response body.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Final URL after redirects.
    pub url: Url,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("GET {url} returned {status}")]
    Status { url: String, status: u16 },

    #[error("GET {url} timed out")]
    Timeout { url: String },

    #[error("GET {url} exceeded {limit} bytes")]
    TooLarge { url: String, limit: usize },

    #[error("GET {url} failed: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Status { .. } | Self::Transport { .. } => FailureKind::Http,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::TooLarge { .. } => FailureKind::TooLarge,
        }
    }

    /// Attributes the failure to a pipeline stage.
    pub fn at(&self, stage: PipelineStage) -> PipelineError {
        PipelineError::new(stage, self.kind(), self.to_string())
    }
}

#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument, FetchError>;
}

/// Fetcher backed by `reqwest` with an identifying User-Agent, a per-request
/// timeout and a response size cap.
pub struct HttpFetcher {
    client: Client,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &IngestionConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.fetch_timeout)
            .build()?;

        Ok(Self {
            client,
            max_bytes: config.max_document_bytes,
        })
    }

    fn classify(url: &Url, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
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
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument, FetchError> {
        debug!("Fetching {}", url);

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Self::classify(url, e))?;

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

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(too_large());
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Servers may omit or understate Content-Length
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| Self::classify(url, e))? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        debug!("Fetched {} bytes from {}", body.len(), final_url);

        Ok(FetchedDocument {
            url: final_url,
            content_type,
            body,
        })
    }
}
