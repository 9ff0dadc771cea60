//! Test doubles for embedding-dependent code
//!
//! `MockEmbedder` derives a unit-length vector from a hash of the input text,
//! so identical texts embed identically (cosine 1.0) and different texts land
//! elsewhere on the sphere. No model weights, no I/O.

use std::hash::{DefaultHasher, Hash, Hasher};

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{EngramError, Result};

/// Deterministic hash-seeded embedder.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dim: usize,
}

impl MockEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Synchronous form of [`EmbeddingProvider::embed`] for test setup.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector: Vec<f32> = (0..self.dim)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                i.hash(&mut hasher);
                let h = hasher.finish();
                // Map the hash into [-1, 1]
                (h % 2000) as f32 / 1000.0 - 1.0
            })
            .collect();
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Embedder that always fails; exercises the mandatory-channel error path.
#[derive(Debug, Clone)]
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(EngramError::Embedding("mock embedder failure".to_string()))
    }

    fn dimension(&self) -> usize {
        0
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn test_mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new(16);
        assert_eq!(embedder.embed_sync("hello"), embedder.embed_sync("hello"));
        assert_ne!(embedder.embed_sync("hello"), embedder.embed_sync("world"));
    }

    #[test]
    fn test_mock_embeddings_are_unit_length() {
        let embedder = MockEmbedder::new(16);
        let v = embedder.embed_sync("some memory text");
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_async_embed_matches_sync() {
        let embedder = MockEmbedder::new(8);
        let via_trait = embedder.embed("text").await.unwrap();
        assert_eq!(via_trait, embedder.embed_sync("text"));
        assert_eq!(embedder.dimension(), 8);
    }
}
