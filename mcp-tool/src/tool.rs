//! The `Tool` trait every registered handler implements (spec §4.H).

use async_trait::async_trait;
use mcp_core::{McpError, Principal};
use serde_json::Value;

/// Declares whether a handler's body does its own async I/O
/// (`Cooperative`) or performs blocking work that must run off the
/// async executor (`Blocking`, dispatched to `spawn_blocking`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    Cooperative,
    Blocking,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;

    fn concurrency(&self) -> Concurrency {
        Concurrency::Cooperative
    }

    fn default_timeout_ms(&self) -> u64 {
        30_000
    }

    async fn execute(&self, principal: &Principal, arguments: Value) -> Result<Value, McpError>;
}

/// Metadata surfaced by `tools/list`; never includes the handler itself.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub default_timeout_ms: u64,
}
