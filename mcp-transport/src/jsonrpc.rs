//! Shared JSON-RPC method handling, called by every transport after it
//! normalizes its incoming message (spec §4.I "uniform routing", §6).

use mcp_core::{JsonRpcRequest, JsonRpcResponse, McpError, Principal};
use mcp_tool::{Dispatcher, ToolRegistry};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const SERVER_NAME: &str = "mcp-enterprise-server";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Handles `initialize`, `tools/list` and `tools/call`; any other method
/// is a JSON-RPC `-32601`. `deadline` bounds `tools/call` only.
pub async fn handle_request(
    request: JsonRpcRequest,
    registry: &Arc<ToolRegistry>,
    dispatcher: &Arc<Dispatcher>,
    principal: &Principal,
    deadline: Option<Duration>,
) -> JsonRpcResponse {
    if request.jsonrpc != "2.0" {
        return JsonRpcResponse::from_mcp_error(
            request.id,
            &McpError::InvalidRequest("jsonrpc field must be \"2.0\"".to_string()),
        );
    }

    match request.method.as_str() {
        "initialize" => JsonRpcResponse::ok(
            request.id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
                "capabilities": { "tools": {} },
            }),
        ),
        "tools/list" => {
            let tools = registry.list();
            JsonRpcResponse::ok(request.id, json!({ "tools": tools }))
        }
        "tools/call" => {
            let Some(name) = request.params.get("name").and_then(Value::as_str) else {
                return JsonRpcResponse::from_mcp_error(
                    request.id,
                    &McpError::InvalidParams("params.name is required".to_string()),
                );
            };
            let arguments = request.params.get("arguments").cloned().unwrap_or(json!({}));
            match dispatcher.call(name, arguments, principal, deadline).await {
                Ok(result) => JsonRpcResponse::ok(request.id, result),
                Err(err) => JsonRpcResponse::from_mcp_error(request.id, &err),
            }
        }
        other => JsonRpcResponse::from_mcp_error(
            request.id,
            &McpError::MethodNotFound(other.to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mcp_tool::{Concurrency, Tool};
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes"
        }
        fn input_schema(&self) -> Value {
            json!({})
        }
        fn concurrency(&self) -> Concurrency {
            Concurrency::Cooperative
        }
        async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
            Ok(arguments)
        }
    }

    fn harness() -> (Arc<ToolRegistry>, Arc<Dispatcher>) {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(EchoTool));
        let dispatcher = Arc::new(Dispatcher::new(registry.clone()));
        (registry, dispatcher)
    }

    fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest { jsonrpc: "2.0".to_string(), id: Some(json!(id)), method: method.to_string(), params }
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let (registry, dispatcher) = harness();
        let response =
            handle_request(request(1, "initialize", json!({})), &registry, &dispatcher, &Principal::anonymous_local(), None)
                .await;
        assert!(response.error.is_none());
        assert_eq!(response.result.unwrap()["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn tools_list_reflects_registry() {
        let (registry, dispatcher) = harness();
        let response =
            handle_request(request(1, "tools/list", json!({})), &registry, &dispatcher, &Principal::anonymous_local(), None)
                .await;
        let tools = response.result.unwrap()["tools"].clone();
        assert_eq!(tools.as_array().unwrap().len(), 1);
        assert_eq!(tools[0]["name"], "echo");
    }

    #[tokio::test]
    async fn tools_call_dispatches_to_the_named_tool() {
        let (registry, dispatcher) = harness();
        let response = handle_request(
            request(1, "tools/call", json!({"name": "echo", "arguments": {"x": 1}})),
            &registry,
            &dispatcher,
            &Principal::anonymous_local(),
            None,
        )
        .await;
        assert_eq!(response.result.unwrap(), json!({"x": 1}));
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let (registry, dispatcher) = harness();
        let response =
            handle_request(request(1, "bogus", json!({})), &registry, &dispatcher, &Principal::anonymous_local(), None)
                .await;
        assert_eq!(response.error.unwrap().code, -32601);
    }
}
