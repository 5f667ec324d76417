//! HTTP embedding provider speaking the Ollama `/api/embeddings` protocol.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::models::{EmbeddingModel, EmbeddingVector};
use super::config::EmbeddingConfig;
use super::provider::{EmbeddingProvider, EmbeddingResult};

/// Cliente Ollama para embeddings (local o cloud con API key)
pub struct OllamaEmbeddingProvider {
    client: Client,
    base_url: String,
    model: EmbeddingModel,
    dimension: usize,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build embedding HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            api_key: config.api_key.clone(),
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {}", key)),
            None => builder,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingResult> {
        let start = Instant::now();
        let url = format!("{}/api/embeddings", self.base_url);

        let request = OllamaEmbedRequest {
            model: self.model.model_name(),
            prompt: text,
        };

        debug!("Sending embedding request to {}", url);

        let response = self
            .authorized(self.client.post(&url).json(&request))
            .send()
            .await
            .context("Failed to send embedding request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Embedding request failed with status {}: {}",
                status,
                error_text
            );
        }

        let body: OllamaEmbedResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        if body.embedding.len() != self.dimension {
            anyhow::bail!(
                "Embedding has {} dimensions, expected {}",
                body.embedding.len(),
                self.dimension
            );
        }

        Ok(EmbeddingResult::new(
            EmbeddingVector::new(body.embedding, self.model.clone()),
            start.elapsed().as_millis() as u64,
        ))
    }

    fn model(&self) -> &EmbeddingModel {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.authorized(self.client.get(&url)).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                warn!("Embedding health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}
