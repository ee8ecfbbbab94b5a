//! Optional AI-assisted tools group (spec §4.H, §9). Registered only
//! when `config.ai.enabled` is set; its absence must never fail
//! startup or affect any other tool group. Like [`mcp_storage::NoopEmbeddingModel`]
//! and [`mcp_storage::NoopCodeAnalyzer`], this is a best-effort
//! heuristic stand-in rather than a real model call — it summarizes
//! what the firewall and code graph already know instead of inventing
//! an external inference dependency.

use crate::state::AppComponents;
use async_trait::async_trait;
use mcp_core::{Channel, McpError, Principal};
use mcp_firewall::{ErrorFilter, ErrorFirewall};
use mcp_pubsub::PubSubBus;
use mcp_tool::Tool;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct AiAnalyzeErrorsTool {
    firewall: Arc<ErrorFirewall>,
    bus: Arc<PubSubBus>,
}

#[async_trait]
impl Tool for AiAnalyzeErrorsTool {
    fn name(&self) -> &str {
        "ai_analyze_errors"
    }

    fn description(&self) -> &str {
        "Summarizes recorded error patterns for a given error type, publishing the result on ai_analysis"
    }

    fn input_schema(&self) -> Value {
        json!({"required": ["error_type"], "properties": {"error_type": {"type": "string"}}})
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let error_type = arguments["error_type"].as_str().unwrap_or_default().to_string();
        let patterns = self.firewall.query_errors(ErrorFilter { error_type: Some(error_type.clone()), block_level: None });

        let total_occurrences: u64 = patterns.iter().map(|p| p.occurrence_count).sum();
        let most_common_solution = patterns
            .iter()
            .max_by_key(|p| p.occurrence_count)
            .map(|p| p.solution.clone())
            .filter(|s| !s.is_empty());

        let summary = json!({
            "error_type": error_type,
            "distinct_patterns": patterns.len(),
            "total_occurrences": total_occurrences,
            "most_common_solution": most_common_solution,
        });

        self.bus.publish(Channel::AiAnalysis, "error_summary", summary.clone());
        Ok(summary)
    }
}

pub fn build(components: &Arc<AppComponents>) -> Vec<Arc<dyn Tool>> {
    if !components.config.ai.enabled {
        return Vec::new();
    }
    vec![Arc::new(AiAnalyzeErrorsTool { firewall: components.firewall.clone(), bus: components.bus.clone() })]
}
