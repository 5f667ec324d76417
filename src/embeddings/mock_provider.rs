//! Deterministic in-process embedding provider for tests.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::provider::{EmbeddingProvider, EmbeddingResult};
use crate::models::{EmbeddingModel, EmbeddingVector};

/// How the mock answers `embed`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MockBehavior {
    Healthy,
    /// Every call fails and the health check reports down.
    Down,
    /// Calls whose text contains the marker fail; others succeed.
    RejectMarker(String),
}

/// Produces unit-length vectors derived from a hash of the text, so the
/// same text always maps to the same vector.
pub struct MockEmbeddingProvider {
    model: EmbeddingModel,
    dimension: usize,
    delay: Duration,
    behavior: MockBehavior,
}

impl MockEmbeddingProvider {
    /// Custom models have no known dimension and fall back to 768.
    pub fn new(model: EmbeddingModel) -> Self {
        let dimension = match model.dimension() {
            0 => 768,
            d => d,
        };
        Self {
            model,
            dimension,
            delay: Duration::ZERO,
            behavior: MockBehavior::Healthy,
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Sleeps this long before answering.
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.delay = Duration::from_millis(latency_ms);
        self
    }

    pub fn should_fail(mut self, fail: bool) -> Self {
        self.behavior = if fail {
            MockBehavior::Down
        } else {
            MockBehavior::Healthy
        };
        self
    }

    /// Rejects only texts containing `marker`, so a test can fail single
    /// chunks of a document.
    pub fn with_failing_marker(mut self, marker: impl Into<String>) -> Self {
        self.behavior = MockBehavior::RejectMarker(marker.into());
        self
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        // FNV-1a seed, then a splitmix64 stream per component
        let mut state = text
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
                (h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
            });

        let mut vector: Vec<f32> = (0..self.dimension)
            .map(|_| {
                state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
                let mut z = state;
                z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
                z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
                z ^= z >> 31;
                (z % 20_000) as f32 / 10_000.0 - 1.0
            })
            .collect();

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingResult> {
        match &self.behavior {
            MockBehavior::Down => anyhow::bail!("Mock embedding provider is down"),
            MockBehavior::RejectMarker(marker) if text.contains(marker.as_str()) => {
                anyhow::bail!("Mock embedding provider rejected text containing {:?}", marker)
            }
            _ => {}
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        Ok(EmbeddingResult::new(
            EmbeddingVector::new(self.vector_for(text), self.model.clone()),
            self.delay.as_millis() as u64,
        ))
    }

    fn model(&self) -> &EmbeddingModel {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.behavior != MockBehavior::Down)
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
