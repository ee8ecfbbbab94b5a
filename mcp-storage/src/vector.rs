//! `VectorIndex`: similarity search backend contract (spec §4.B, mid-tier
//! memory recall).

use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    async fn insert(&self, collection: &str, record: VectorRecord) -> Result<()>;

    async fn search(&self, collection: &str, query: &[f32], top_k: usize) -> Result<Vec<VectorMatch>>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

struct Collection {
    dimensions: usize,
    records: Vec<VectorRecord>,
}

/// Brute-force cosine-similarity fallback. Adequate for the record
/// counts a single project accumulates; not meant to scale to a shared
/// index across projects.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Collection { dimensions, records: Vec::new() });
        Ok(())
    }

    async fn insert(&self, collection: &str, record: VectorRecord) -> Result<()> {
        let mut collections = self.collections.write();
        let entry = collections
            .entry(collection.to_string())
            .or_insert_with(|| Collection { dimensions: record.embedding.len(), records: Vec::new() });
        entry.records.retain(|r| r.id != record.id);
        entry.records.push(record);
        Ok(())
    }

    async fn search(&self, collection: &str, query: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let collections = self.collections.read();
        let Some(entry) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut scored: Vec<VectorMatch> = entry
            .records
            .iter()
            .map(|r| VectorMatch {
                id: r.id.clone(),
                score: Self::cosine(query, &r.embedding),
                payload: r.payload.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        if let Some(entry) = self.collections.write().get_mut(collection) {
            entry.records.retain(|r| r.id != id);
        }
        Ok(())
    }
}

pub type SharedVectorIndex = Arc<dyn VectorIndex>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn search_ranks_closer_vector_first() {
        let index = InMemoryVectorIndex::new();
        index.create_collection("memories", 2).await.unwrap();
        index
            .insert("memories", VectorRecord { id: "a".into(), embedding: vec![1.0, 0.0], payload: json!({}) })
            .await
            .unwrap();
        index
            .insert("memories", VectorRecord { id: "b".into(), embedding: vec![0.0, 1.0], payload: json!({}) })
            .await
            .unwrap();
        let results = index.search("memories", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].id, "a");
    }

    #[tokio::test]
    async fn delete_removes_record_from_search() {
        let index = InMemoryVectorIndex::new();
        index.create_collection("memories", 2).await.unwrap();
        index
            .insert("memories", VectorRecord { id: "a".into(), embedding: vec![1.0, 0.0], payload: json!({}) })
            .await
            .unwrap();
        index.delete("memories", "a").await.unwrap();
        let results = index.search("memories", &[1.0, 0.0], 5).await.unwrap();
        assert!(results.is_empty());
    }
}
