//! Memory record shape and recall result types (spec §3, §4.E).

use chrono::{DateTime, Utc};
use mcp_core::{MemoryId, ProjectId, Tier};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub memory_id: MemoryId,
    pub project_id: ProjectId,
    pub tier: Tier,
    pub content: String,
    pub category: String,
    pub importance: f64,
    pub tags: HashSet<String>,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(project_id: ProjectId, content: impl Into<String>, tier: Tier) -> Self {
        Self {
            memory_id: MemoryId::generate(),
            project_id,
            tier,
            content: content.into(),
            category: "general".to_string(),
            importance: 0.8,
            tags: HashSet::new(),
            creator: "system".to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecalledMemory {
    pub memory_id: MemoryId,
    pub content: String,
    pub score: f64,
    pub source_tier: Tier,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecallResult {
    pub memories: Vec<RecalledMemory>,
    pub total_token_saved: u64,
}
