//! Memory tools: `store`/`retrieve` (spec §4.H "memory tools").

use crate::state::AppComponents;
use async_trait::async_trait;
use mcp_core::{McpError, Principal, ProjectId, Tier};
use mcp_memory::MemoryRecord;
use mcp_tool::Tool;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

fn parse_tier(raw: &str) -> Result<Tier, McpError> {
    match raw {
        "short" => Ok(Tier::Short),
        "mid" => Ok(Tier::Mid),
        "long" => Ok(Tier::Long),
        other => Err(McpError::InvalidParams(format!("unknown tier '{other}', expected short/mid/long"))),
    }
}

pub struct MemoryStoreTool {
    memory: Arc<mcp_memory::TieredMemory>,
}

#[async_trait]
impl Tool for MemoryStoreTool {
    fn name(&self) -> &str {
        "store_memory"
    }

    fn description(&self) -> &str {
        "Stores a memory record at the short, mid, or long tier for a project"
    }

    fn input_schema(&self) -> Value {
        json!({
            "required": ["project_id", "content", "memory_level"],
            "properties": {
                "project_id": {"type": "string"},
                "content": {"type": "string"},
                "memory_level": {"type": "string"},
                "category": {"type": "string"},
                "importance": {"type": "number"},
                "tags": {"type": "array"},
            },
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let project_id = ProjectId::from(arguments["project_id"].as_str().unwrap_or_default().to_string());
        let content = arguments["content"].as_str().unwrap_or_default().to_string();
        let tier = parse_tier(arguments["memory_level"].as_str().unwrap_or_default())?;

        let mut record = MemoryRecord::new(project_id, content, tier);
        if let Some(category) = arguments.get("category").and_then(Value::as_str) {
            record.category = category.to_string();
        }
        if let Some(importance) = arguments.get("importance").and_then(Value::as_f64) {
            record.importance = importance;
        }
        if let Some(tags) = arguments.get("tags").and_then(Value::as_array) {
            record.tags = tags.iter().filter_map(|v| v.as_str().map(str::to_string)).collect::<HashSet<_>>();
        }

        let memory_id = self.memory.store(record).await.map_err(|e| McpError::Internal(e.to_string()))?;
        Ok(json!({ "memory_id": memory_id.to_string() }))
    }
}

pub struct MemoryRetrieveTool {
    memory: Arc<mcp_memory::TieredMemory>,
}

#[async_trait]
impl Tool for MemoryRetrieveTool {
    fn name(&self) -> &str {
        "retrieve_memory"
    }

    fn description(&self) -> &str {
        "Retrieves the top-k memories across all tiers for a project, scored and deduplicated"
    }

    fn input_schema(&self) -> Value {
        json!({
            "required": ["project_id", "query"],
            "properties": {
                "project_id": {"type": "string"},
                "query": {"type": "string"},
                "top_k": {"type": "integer"},
            },
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let project_id = ProjectId::from(arguments["project_id"].as_str().unwrap_or_default().to_string());
        let query = arguments["query"].as_str().unwrap_or_default();
        let top_k = arguments.get("top_k").and_then(Value::as_u64).unwrap_or(10) as usize;

        let result = self.memory.retrieve(&project_id, query, top_k).await.map_err(|e| McpError::Internal(e.to_string()))?;
        serde_json::to_value(result).map_err(|e| McpError::Internal(e.to_string()))
    }
}

pub struct MemorySearchStatsTool {
    memory: Arc<mcp_memory::TieredMemory>,
}

#[async_trait]
impl Tool for MemorySearchStatsTool {
    fn name(&self) -> &str {
        "memory_search_stats"
    }

    fn description(&self) -> &str {
        "Returns p50/p95/p99 recall latency percentiles for memory retrieval"
    }

    fn input_schema(&self) -> Value {
        json!({})
    }

    async fn execute(&self, _principal: &Principal, _arguments: Value) -> Result<Value, McpError> {
        serde_json::to_value(self.memory.search_latency_percentiles()).map_err(|e| McpError::Internal(e.to_string()))
    }
}

pub fn build(components: &Arc<AppComponents>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(MemoryStoreTool { memory: components.memory.clone() }),
        Arc::new(MemoryRetrieveTool { memory: components.memory.clone() }),
        Arc::new(MemorySearchStatsTool { memory: components.memory.clone() }),
    ]
}
