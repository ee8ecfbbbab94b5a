//! `EmbeddingModel`: text-to-vector backend contract (spec §4.B).

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Deterministic, offline stand-in used when `embedding_model.offline =
/// true`. Derives a fixed-length vector from a character hash so that
/// repeated calls for the same text are stable, without modeling any
/// real semantic similarity.
pub struct NoopEmbeddingModel {
    dimensions: usize,
}

impl NoopEmbeddingModel {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingModel for NoopEmbeddingModel {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for (i, byte) in text.bytes().enumerate() {
            let slot = i % self.dimensions;
            vector[slot] += (byte as f32) / 255.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

pub type SharedEmbeddingModel = Arc<dyn EmbeddingModel>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_embedding_is_deterministic_and_unit_length() {
        let model = NoopEmbeddingModel::new(8);
        let a = model.embed("hello world").await.unwrap();
        let b = model.embed("hello world").await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4 || norm == 0.0);
    }

    #[tokio::test]
    async fn embed_batch_preserves_order() {
        let model = NoopEmbeddingModel::new(4);
        let texts = vec!["a".to_string(), "b".to_string()];
        let batch = model.embed_batch(&texts).await.unwrap();
        let individual_a = model.embed("a").await.unwrap();
        assert_eq!(batch[0], individual_a);
    }
}
