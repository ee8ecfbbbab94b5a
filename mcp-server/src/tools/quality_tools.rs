//! Quality/observability tools: health, aggregate request stats, pool
//! utilization, and cache control. Spec §4.H leaves this group's shape
//! to the implementation; it is grounded directly on the `/health`,
//! `/stats` handlers mcp-stats already defines (spec §4.K) and on
//! mcp-pool's/mcp-cache's public surfaces, exposed as tools rather than
//! HTTP-only endpoints so stdio clients can reach them too.

use crate::state::AppComponents;
use async_trait::async_trait;
use mcp_core::{McpError, Principal};
use mcp_pool::PoolHandle;
use mcp_tool::Tool;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct SystemHealthTool {
    components: Arc<AppComponents>,
}

#[async_trait]
impl Tool for SystemHealthTool {
    fn name(&self) -> &str {
        "system_health"
    }

    fn description(&self) -> &str {
        "Reports process uptime, registered tool count, and dependency health"
    }

    fn input_schema(&self) -> Value {
        json!({})
    }

    async fn execute(&self, _principal: &Principal, _arguments: Value) -> Result<Value, McpError> {
        let health = self.components.stats.health(self.components.registry.len());
        serde_json::to_value(health).map_err(|e| McpError::Internal(e.to_string()))
    }
}

pub struct SystemStatsTool {
    components: Arc<AppComponents>,
}

#[async_trait]
impl Tool for SystemStatsTool {
    fn name(&self) -> &str {
        "system_stats"
    }

    fn description(&self) -> &str {
        "Reports aggregate request counts, success rate, and recent tool invocations"
    }

    fn input_schema(&self) -> Value {
        json!({})
    }

    async fn execute(&self, _principal: &Principal, _arguments: Value) -> Result<Value, McpError> {
        let stats = self.components.stats.stats(&self.components.dispatcher);
        serde_json::to_value(stats).map_err(|e| McpError::Internal(e.to_string()))
    }
}

pub struct PoolStatsTool {
    components: Arc<AppComponents>,
}

#[async_trait]
impl Tool for PoolStatsTool {
    fn name(&self) -> &str {
        "pool_stats"
    }

    fn description(&self) -> &str {
        "Reports the connection pool's current size, checkouts, and overflow"
    }

    fn input_schema(&self) -> Value {
        json!({})
    }

    async fn execute(&self, _principal: &Principal, _arguments: Value) -> Result<Value, McpError> {
        let pool = &self.components.pool;
        let size = pool.current_size();
        let checked_out = pool.checked_out();
        let utilization = if size == 0 { 0.0 } else { checked_out as f64 / size as f64 };
        Ok(json!({
            "size": size,
            "checked_out": checked_out,
            "overflow": pool.overflow(),
            "utilization": utilization,
        }))
    }
}

pub struct CacheGetTool {
    components: Arc<AppComponents>,
}

#[async_trait]
impl Tool for CacheGetTool {
    fn name(&self) -> &str {
        "cache_get"
    }

    fn description(&self) -> &str {
        "Reads a cached value by category and key, reporting which tier served it"
    }

    fn input_schema(&self) -> Value {
        json!({
            "required": ["category", "key"],
            "properties": {"category": {"type": "string"}, "key": {"type": "string"}},
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let category = arguments["category"].as_str().unwrap_or_default();
        let key = arguments["key"].as_str().unwrap_or_default();
        let (value, tier) = self.components.cache.get(category, key).await;
        Ok(json!({
            "value": value.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
            "tier": format!("{tier:?}"),
        }))
    }
}

pub struct CacheSetTool {
    components: Arc<AppComponents>,
}

#[async_trait]
impl Tool for CacheSetTool {
    fn name(&self) -> &str {
        "cache_set"
    }

    fn description(&self) -> &str {
        "Writes a value into the cache under a category and key, applying the category's TTL"
    }

    fn input_schema(&self) -> Value {
        json!({
            "required": ["category", "key", "value"],
            "properties": {
                "category": {"type": "string"},
                "key": {"type": "string"},
                "value": {"type": "string"},
            },
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let category = arguments["category"].as_str().unwrap_or_default();
        let key = arguments["key"].as_str().unwrap_or_default();
        let value = arguments["value"].as_str().unwrap_or_default();
        self.components.cache.set(category, key, value.as_bytes().to_vec()).await;
        Ok(json!({ "ok": true }))
    }
}

pub struct CacheInvalidateTool {
    components: Arc<AppComponents>,
}

#[async_trait]
impl Tool for CacheInvalidateTool {
    fn name(&self) -> &str {
        "cache_invalidate"
    }

    fn description(&self) -> &str {
        "Invalidates one cache key, or an entire category when no key is given"
    }

    fn input_schema(&self) -> Value {
        json!({
            "required": ["category"],
            "properties": {"category": {"type": "string"}, "key": {"type": "string"}},
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let category = arguments["category"].as_str().unwrap_or_default();
        match arguments.get("key").and_then(Value::as_str) {
            Some(key) => self.components.cache.invalidate_key(category, key).await,
            None => self.components.cache.invalidate_category(category).await,
        }
        Ok(json!({ "ok": true }))
    }
}

pub fn build(components: &Arc<AppComponents>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(SystemHealthTool { components: components.clone() }),
        Arc::new(SystemStatsTool { components: components.clone() }),
        Arc::new(PoolStatsTool { components: components.clone() }),
        Arc::new(CacheGetTool { components: components.clone() }),
        Arc::new(CacheSetTool { components: components.clone() }),
        Arc::new(CacheInvalidateTool { components: components.clone() }),
    ]
}
