//! JSON-RPC 2.0 envelope shared by stdio, HTTP and WebSocket transports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorBody {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorBody>,
}

impl JsonRpcResponse {
    pub fn ok(id: Option<Value>, result: Value) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: Some(result), error: None }
    }

    pub fn err(id: Option<Value>, code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcErrorBody { code, message: message.into(), data }),
        }
    }

    pub fn from_mcp_error(id: Option<Value>, err: &crate::error::McpError) -> Self {
        let data = err.remediation().map(|hint| serde_json::json!({ "remediation": hint }));
        Self::err(id, err.rpc_code(), err.to_string(), data)
    }
}

/// Server-pushed event over WebSocket. Not a JSON-RPC response — a
/// separate envelope per spec §4.I / §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub channel: String,
    pub data: Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Normalized request every transport converts its incoming message into
/// before calling the dispatcher (spec §4.I "uniform routing").
#[derive(Debug, Clone)]
pub struct NormalizedCall {
    pub tool_name: String,
    pub arguments: Value,
    pub principal: crate::ids::Principal,
    pub deadline: std::time::Instant,
    pub transport_hint: TransportHint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportHint {
    Stdio,
    Http,
    WebSocket,
}
