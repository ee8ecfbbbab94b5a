//! Error firewall tools: record, check, query, stats (spec §4.F / §4.H
//! "error firewall tools").

use crate::state::AppComponents;
use async_trait::async_trait;
use mcp_core::{BlockLevel, McpError, Principal};
use mcp_firewall::{ErrorFilter, ErrorFirewall};
use mcp_tool::Tool;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

fn parse_block_level(raw: Option<&str>) -> Result<BlockLevel, McpError> {
    match raw.unwrap_or("none") {
        "none" => Ok(BlockLevel::None),
        "warning" => Ok(BlockLevel::Warning),
        "block" => Ok(BlockLevel::Block),
        other => Err(McpError::InvalidParams(format!("unknown block_level '{other}', expected none/warning/block"))),
    }
}

fn feature_map_arg(arguments: &Value, field: &str) -> BTreeMap<String, Value> {
    arguments
        .get(field)
        .and_then(Value::as_object)
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

pub struct FirewallRecordErrorTool {
    firewall: Arc<ErrorFirewall>,
}

#[async_trait]
impl Tool for FirewallRecordErrorTool {
    fn name(&self) -> &str {
        "firewall_record_error"
    }

    fn description(&self) -> &str {
        "Records an observed error pattern so future matching operations can be warned about or blocked"
    }

    fn input_schema(&self) -> Value {
        json!({
            "required": ["error_type", "error_scene", "error_message"],
            "properties": {
                "error_type": {"type": "string"},
                "error_scene": {"type": "string"},
                "feature_map": {"type": "object"},
                "error_message": {"type": "string"},
                "solution": {"type": "string"},
                "block_level": {"type": "string"},
            },
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let error_type = arguments["error_type"].as_str().unwrap_or_default();
        let error_scene = arguments["error_scene"].as_str().unwrap_or_default();
        let error_message = arguments["error_message"].as_str().unwrap_or_default();
        let solution = arguments.get("solution").and_then(Value::as_str).unwrap_or_default();
        let block_level = parse_block_level(arguments.get("block_level").and_then(Value::as_str))?;
        let feature_map = feature_map_arg(&arguments, "feature_map");

        let (error_id, is_new) =
            self.firewall.record_error(error_type, error_scene, feature_map, error_message, solution, block_level);
        Ok(json!({ "error_id": error_id.to_string(), "is_new": is_new }))
    }
}

pub struct FirewallCheckOperationTool {
    firewall: Arc<ErrorFirewall>,
}

#[async_trait]
impl Tool for FirewallCheckOperationTool {
    fn name(&self) -> &str {
        "firewall_check_operation"
    }

    fn description(&self) -> &str {
        "Checks a pending operation against recorded error patterns, returning a block/warn/allow decision"
    }

    fn input_schema(&self) -> Value {
        json!({
            "required": ["operation_type"],
            "properties": {
                "operation_type": {"type": "string"},
                "operation_params": {"type": "object"},
            },
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let operation_type = arguments["operation_type"].as_str().unwrap_or_default();
        let operation_params = feature_map_arg(&arguments, "operation_params");
        let decision = self.firewall.check_operation(operation_type, operation_params);
        serde_json::to_value(decision).map_err(|e| McpError::Internal(e.to_string()))
    }
}

pub struct FirewallQueryErrorsTool {
    firewall: Arc<ErrorFirewall>,
}

#[async_trait]
impl Tool for FirewallQueryErrorsTool {
    fn name(&self) -> &str {
        "firewall_query_errors"
    }

    fn description(&self) -> &str {
        "Lists recorded error patterns, optionally filtered by error type or block level"
    }

    fn input_schema(&self) -> Value {
        json!({
            "properties": {"error_type": {"type": "string"}, "block_level": {"type": "string"}},
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let block_level = match arguments.get("block_level").and_then(Value::as_str) {
            Some(raw) => Some(parse_block_level(Some(raw))?),
            None => None,
        };
        let filter = ErrorFilter {
            error_type: arguments.get("error_type").and_then(Value::as_str).map(str::to_string),
            block_level,
        };
        let patterns = self.firewall.query_errors(filter);
        serde_json::to_value(patterns).map_err(|e| McpError::Internal(e.to_string()))
    }
}

pub struct FirewallStatsTool {
    firewall: Arc<ErrorFirewall>,
}

#[async_trait]
impl Tool for FirewallStatsTool {
    fn name(&self) -> &str {
        "firewall_stats"
    }

    fn description(&self) -> &str {
        "Summarizes total recorded patterns, occurrences, and block/warn counts"
    }

    fn input_schema(&self) -> Value {
        json!({})
    }

    async fn execute(&self, _principal: &Principal, _arguments: Value) -> Result<Value, McpError> {
        serde_json::to_value(self.firewall.get_stats()).map_err(|e| McpError::Internal(e.to_string()))
    }
}

pub fn build(components: &Arc<AppComponents>) -> Vec<Arc<dyn Tool>> {
    let firewall = components.firewall.clone();
    vec![
        Arc::new(FirewallRecordErrorTool { firewall: firewall.clone() }),
        Arc::new(FirewallCheckOperationTool { firewall: firewall.clone() }),
        Arc::new(FirewallQueryErrorsTool { firewall: firewall.clone() }),
        Arc::new(FirewallStatsTool { firewall }),
    ]
}
