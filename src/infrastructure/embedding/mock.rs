use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::{Embedding, EmbeddingProvider, LlmError};

const DEFAULT_DIMENSIONS: usize = 16;

/// Hash-derived embeddings: the same text always maps to the same unit vector
#[derive(Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
    calls: AtomicUsize,
    embedded: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            calls: AtomicUsize::new(0),
            embedded: AtomicUsize::new(0),
        }
    }

    /// Number of `embed` calls received
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Total number of texts embedded across all calls
    pub fn embedded_count(&self) -> usize {
        self.embedded.load(Ordering::SeqCst)
    }

    fn vector_for(&self, model: &str, text: &str) -> Embedding {
        let mut values = Vec::with_capacity(self.dimensions);
        let mut counter: u32 = 0;

        while values.len() < self.dimensions {
            let digest = Sha256::new()
                .chain_update(model.as_bytes())
                .chain_update(text.as_bytes())
                .chain_update(counter.to_be_bytes())
                .finalize();

            values.extend(
                digest
                    .iter()
                    .take(self.dimensions - values.len())
                    .map(|b| *b as f32 / 127.5 - 1.0),
            );
            counter += 1;
        }

        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }

        values
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Embedding>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.embedded.fetch_add(inputs.len(), Ordering::SeqCst);

        Ok(inputs.iter().map(|text| self.vector_for(model, text)).collect())
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-embedding"
    }

    fn dimensions(&self, _model: &str) -> Option<usize> {
        Some(self.dimensions)
    }
}
