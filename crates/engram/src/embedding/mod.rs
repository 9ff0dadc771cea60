//! Embedding provider seam
//!
//! The embedding model is an external collaborator: text in, fixed-length
//! vector out. Engram only depends on this trait; deployments plug in a real
//! model and tests use [`crate::testing::MockEmbedder`].

use async_trait::async_trait;

use crate::error::Result;

/// Trait for embedding providers.
///
/// Implementations must be deterministic for identical text within one model
/// version, and must always return vectors of the same dimension.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimension of the vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Cosine similarity between two vectors, clamped to [-1, 1].
///
/// Mismatched or empty vectors score 0 rather than erroring; retrieval treats
/// them as unrelated.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
