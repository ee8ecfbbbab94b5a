//! Tiered memory: short (KV, recency), mid (vector, semantic), long
//! (relational, keyword + importance) (spec §4.E).

mod keyword;
pub mod model;
mod stats;

pub use model::{MemoryRecord, RecallResult, RecalledMemory};
pub use stats::{LatencyPercentiles, SearchStats};

use chrono::Utc;
use mcp_core::{Channel, MemoryId, ProjectId, Tier};
use mcp_pubsub::PubSubBus;
use mcp_storage::model::LongMemoryRow;
use mcp_storage::{EmbeddingModel, KvStore, RelationalStore, StorageError, VectorIndex, VectorRecord};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

const SHORT_TTL: Duration = Duration::from_secs(3600);
const MID_COLLECTION: &str = "mid_term_memories";
const MID_CONTENT_CHAR_CAP: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

/// A breadcrumb kept for short-tier recency scoring. The underlying KV
/// entry is the durable (TTL-bounded) copy; this in-process index lets
/// recall scan "recent for this project" without a KV key-scan.
struct ShortBreadcrumb {
    memory_id: MemoryId,
    content: String,
    created_at: chrono::DateTime<Utc>,
}

pub struct TieredMemory {
    relational: Arc<dyn RelationalStore>,
    kv: Arc<dyn KvStore>,
    vector: Arc<dyn VectorIndex>,
    embeddings: Arc<dyn EmbeddingModel>,
    bus: Arc<PubSubBus>,
    short_index: RwLock<HashMap<ProjectId, Vec<ShortBreadcrumb>>>,
    stats: SearchStats,
}

impl TieredMemory {
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        kv: Arc<dyn KvStore>,
        vector: Arc<dyn VectorIndex>,
        embeddings: Arc<dyn EmbeddingModel>,
        bus: Arc<PubSubBus>,
    ) -> Self {
        Self {
            relational,
            kv,
            vector,
            embeddings,
            bus,
            short_index: RwLock::new(HashMap::new()),
            stats: SearchStats::default(),
        }
    }

    fn record_breadcrumb(&self, project_id: &ProjectId, memory_id: MemoryId, content: String) {
        let mut index = self.short_index.write();
        index.entry(project_id.clone()).or_default().push(ShortBreadcrumb {
            memory_id,
            content,
            created_at: Utc::now(),
        });
    }

    async fn write_short(&self, project_id: &ProjectId, memory_id: &MemoryId, content: &str) -> Result<()> {
        let key = format!("short:{project_id}:{memory_id}");
        self.kv.setex(&key, SHORT_TTL, content.as_bytes().to_vec()).await?;
        Ok(())
    }

    /// Stores a memory record at the given tier, returning its id.
    /// Mid and long writes also leave a short-tier breadcrumb for
    /// recency (spec §4.E) — short writes do not propagate upward.
    pub async fn store(&self, record: MemoryRecord) -> Result<MemoryId> {
        let memory_id = record.memory_id.clone();

        match record.tier {
            Tier::Short => {
                self.write_short(&record.project_id, &memory_id, &record.content).await?;
                self.record_breadcrumb(&record.project_id, memory_id.clone(), record.content.clone());
            }
            Tier::Mid => {
                let embedding = self.embeddings.embed(&record.content).await?;
                let truncated: String = record.content.chars().take(MID_CONTENT_CHAR_CAP).collect();
                self.vector
                    .insert(
                        MID_COLLECTION,
                        VectorRecord {
                            id: memory_id.to_string(),
                            embedding,
                            payload: serde_json::json!({
                                "project_id": record.project_id.to_string(),
                                "content": truncated,
                                "category": record.category,
                                "importance": record.importance,
                                "tags": record.tags,
                                "created_at": record.created_at,
                            }),
                        },
                    )
                    .await?;
                self.write_short(&record.project_id, &memory_id, &record.content).await?;
                self.record_breadcrumb(&record.project_id, memory_id.clone(), record.content.clone());
            }
            Tier::Long => {
                self.ensure_project_exists(&record.project_id).await?;
                self.relational
                    .insert_long_memory(LongMemoryRow {
                        memory_id: memory_id.clone(),
                        project_id: record.project_id.clone(),
                        content: record.content.clone(),
                        category: record.category.clone(),
                        importance: record.importance,
                        tags: record.tags.clone(),
                        creator: record.creator.clone(),
                        created_at: record.created_at,
                    })
                    .await?;
                self.write_short(&record.project_id, &memory_id, &record.content).await?;
                self.record_breadcrumb(&record.project_id, memory_id.clone(), record.content.clone());
            }
        }

        info!(memory_id = %memory_id, tier = %record.tier, "memory stored");
        Ok(memory_id)
    }

    async fn ensure_project_exists(&self, project_id: &ProjectId) -> Result<()> {
        if self.relational.get_project(project_id).await?.is_none() {
            self.relational
                .upsert_project(mcp_storage::model::Project::new(project_id.clone(), project_id.to_string(), "system"))
                .await?;
        }
        Ok(())
    }

    fn recall_short(&self, project_id: &ProjectId, top_k: usize) -> Vec<RecalledMemory> {
        const HALF_LIFE: f64 = 5.0 * 60.0;
        let index = self.short_index.read();
        let Some(entries) = index.get(project_id) else { return Vec::new() };
        let now = Utc::now();
        let mut scored: Vec<RecalledMemory> = entries
            .iter()
            .map(|e| {
                let age_s = (now - e.created_at).num_milliseconds() as f64 / 1000.0;
                let score = 0.5f64.powf(age_s.max(0.0) / HALF_LIFE);
                RecalledMemory { memory_id: e.memory_id.clone(), content: e.content.clone(), score, source_tier: Tier::Short }
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    async fn recall_mid(&self, query: &str, top_k: usize) -> Result<Vec<RecalledMemory>> {
        let ef_search = (2 * top_k).clamp(64, 128);
        let query_embedding = self.embeddings.embed(query).await?;
        let matches = self.vector.search(MID_COLLECTION, &query_embedding, ef_search.max(top_k)).await?;
        Ok(matches
            .into_iter()
            .take(top_k)
            .map(|m| RecalledMemory {
                memory_id: MemoryId::from(m.id),
                content: m.payload.get("content").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                score: m.score as f64,
                source_tier: Tier::Mid,
            })
            .collect())
    }

    async fn recall_long(&self, project_id: &ProjectId, query: &str, top_k: usize) -> Result<Vec<RecalledMemory>> {
        let keywords = keyword::extract_keywords(query, keyword::QUERY_MAX_KEYWORDS);

        if keywords.is_empty() {
            let rows = self.relational.list_long_memories_by_recency(project_id, 2 * top_k).await?;
            return Ok(rows
                .into_iter()
                .map(|r| RecalledMemory { memory_id: r.memory_id, content: r.content, score: r.importance, source_tier: Tier::Long })
                .collect());
        }

        let candidates = self.relational.list_long_memories_by_importance(project_id).await?;
        let total_keywords = keywords.len() as f64;
        let mut scored: Vec<RecalledMemory> = candidates
            .into_iter()
            .take(3 * top_k)
            .map(|row| {
                let lowered = row.content.to_lowercase();
                let matched = keywords.iter().filter(|kw| lowered.contains(kw.as_str())).count() as f64;
                let score = (matched / total_keywords) * row.importance;
                RecalledMemory { memory_id: row.memory_id, content: row.content, score, source_tier: Tier::Long }
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Retrieves up to `top_k` memories across all three tiers, scored
    /// per spec §4.E and deduplicated by `memory_id` (highest score
    /// wins).
    pub async fn retrieve(&self, project_id: &ProjectId, query: &str, top_k: usize) -> Result<RecallResult> {
        let start = Instant::now();

        let (short, mid, long) = tokio::join!(
            async { Ok::<_, MemoryError>(self.recall_short(project_id, top_k)) },
            self.recall_mid(query, top_k),
            self.recall_long(project_id, query, top_k),
        );

        let outcome = (|| -> Result<Vec<RecalledMemory>> {
            let mut merged: HashMap<MemoryId, RecalledMemory> = HashMap::new();
            for memory in short?.into_iter().chain(mid?).chain(long?) {
                merged
                    .entry(memory.memory_id.clone())
                    .and_modify(|existing| {
                        if memory.score > existing.score {
                            *existing = memory.clone();
                        }
                    })
                    .or_insert(memory);
            }
            Ok(merged.into_values().collect())
        })();

        let duration = start.elapsed();
        self.stats.record(duration);

        let truncated_query: String = query.chars().take(50).collect();
        let results_count = outcome.as_ref().map(|memories| memories.len().min(top_k)).unwrap_or(0);
        self.bus.publish(
            Channel::VectorSearch,
            "search_completed",
            serde_json::json!({
                "query": truncated_query,
                "top_k": top_k,
                "time_ms": duration.as_secs_f64() * 1000.0,
                "results": results_count,
                "success": outcome.is_ok(),
            }),
        );

        let mut memories = outcome?;
        memories.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        memories.truncate(top_k);

        let total_token_saved = memories.iter().map(|m| (m.content.len() / 4) as u64).sum();
        Ok(RecallResult { memories, total_token_saved })
    }

    pub fn search_latency_percentiles(&self) -> LatencyPercentiles {
        self.stats.percentiles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_storage::{InMemoryKvStore, InMemoryRelationalStore, InMemoryVectorIndex, NoopEmbeddingModel};

    fn memory() -> TieredMemory {
        TieredMemory::new(
            Arc::new(InMemoryRelationalStore::new()),
            Arc::new(InMemoryKvStore::new()),
            Arc::new(InMemoryVectorIndex::new()),
            Arc::new(NoopEmbeddingModel::new(32)),
            PubSubBus::new(),
        )
    }

    #[tokio::test]
    async fn long_store_creates_project_if_missing() {
        let memory = memory();
        let project_id = ProjectId::from("proj_x".to_string());
        let record = MemoryRecord::new(project_id.clone(), "first design decision", Tier::Long);
        memory.store(record).await.unwrap();
        assert!(memory.relational.get_project(&project_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn short_recall_prefers_more_recent_entries() {
        let memory = memory();
        let project_id = ProjectId::from("proj_y".to_string());
        memory.store(MemoryRecord::new(project_id.clone(), "older note", Tier::Short)).await.unwrap();
        memory.store(MemoryRecord::new(project_id.clone(), "newer note", Tier::Short)).await.unwrap();
        let recalled = memory.recall_short(&project_id, 5);
        assert_eq!(recalled[0].content, "newer note");
    }

    #[tokio::test]
    async fn retrieve_caps_results_at_top_k() {
        let memory = memory();
        let project_id = ProjectId::from("proj_z".to_string());
        for i in 0..10 {
            memory.store(MemoryRecord::new(project_id.clone(), format!("note {i}"), Tier::Short)).await.unwrap();
        }
        let result = memory.retrieve(&project_id, "note", 3).await.unwrap();
        assert!(result.memories.len() <= 3);
    }

    #[tokio::test]
    async fn long_recall_falls_back_to_recency_without_keywords() {
        let memory = memory();
        let project_id = ProjectId::from("proj_w".to_string());
        memory.store(MemoryRecord::new(project_id.clone(), "a", Tier::Long)).await.unwrap();
        let result = memory.recall_long(&project_id, "", 5).await.unwrap();
        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn retrieve_deduplicates_same_memory_across_tiers() {
        let memory = memory();
        let project_id = ProjectId::from("proj_v".to_string());
        let result = memory.retrieve(&project_id, "anything", 5).await.unwrap();
        assert!(result.memories.is_empty());
    }
}
