//! Dispatch: schema validation, deadline enforcement, blocking-handler
//! offload, and the bounded invocation ring buffer (spec §4.H).

use crate::registry::ToolRegistry;
use crate::schema;
use crate::tool::Concurrency;
use chrono::{DateTime, Utc};
use mcp_core::{InvocationId, McpError, Principal};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info_span, Instrument};

const INVOCATION_BUFFER_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    Ok,
    Error,
    Timeout,
    Canceled,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct InvocationRecord {
    pub invocation_id: InvocationId,
    pub tool_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: InvocationStatus,
    pub error_message: Option<String>,
}

#[derive(Default)]
struct InvocationLog {
    records: Mutex<VecDeque<InvocationRecord>>,
}

impl InvocationLog {
    fn push(&self, record: InvocationRecord) {
        let mut records = self.records.lock();
        if records.len() == INVOCATION_BUFFER_CAPACITY {
            records.pop_front();
        }
        records.push_back(record);
    }

    fn snapshot(&self) -> Vec<InvocationRecord> {
        self.records.lock().iter().cloned().collect()
    }
}

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    log: InvocationLog,
    shutting_down: AtomicBool,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry, log: InvocationLog::default(), shutting_down: AtomicBool::new(false) }
    }

    pub fn invocation_log(&self) -> Vec<InvocationRecord> {
        self.log.snapshot()
    }

    /// Called once graceful shutdown begins (spec §4.J). Every `call`
    /// after this point is refused with `-32000 "shutting down"` instead
    /// of being dispatched to a handler.
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
    }

    /// Dispatches a tool call, enforcing `min(client_deadline,
    /// default_timeout)` and recording the outcome into the bounded
    /// invocation ring buffer regardless of success or failure.
    pub async fn call(
        &self,
        tool_name: &str,
        arguments: Value,
        principal: &Principal,
        client_deadline: Option<Duration>,
    ) -> Result<Value, McpError> {
        let invocation_id = InvocationId::generate();
        let start_time = Utc::now();

        if self.shutting_down.load(Ordering::Acquire) {
            let err = McpError::ShuttingDown;
            self.record(invocation_id, tool_name, start_time, InvocationStatus::Error, Some(err.to_string()));
            return Err(err);
        }

        let Some(tool) = self.registry.get(tool_name) else {
            let err = McpError::MethodNotFound(tool_name.to_string());
            self.record(invocation_id, tool_name, start_time, InvocationStatus::Error, Some(err.to_string()));
            return Err(err);
        };

        if let Err(reason) = schema::validate(&tool.input_schema(), &arguments) {
            let err = McpError::InvalidParams(reason);
            self.record(invocation_id, tool_name, start_time, InvocationStatus::Error, Some(err.to_string()));
            return Err(err);
        }

        let timeout = client_deadline
            .unwrap_or(Duration::from_millis(tool.default_timeout_ms()))
            .min(Duration::from_millis(tool.default_timeout_ms()));

        let span = info_span!("tool_call", invocation_id = %invocation_id, tool = tool_name);
        let principal_for_task = principal.clone();
        let arguments_for_task = arguments;

        let outcome = match tool.concurrency() {
            Concurrency::Cooperative => {
                tokio::time::timeout(timeout, tool.execute(principal, arguments_for_task).instrument(span)).await
            }
            Concurrency::Blocking => {
                let tool = tool.clone();
                tokio::time::timeout(
                    timeout,
                    tokio::task::spawn_blocking(move || {
                        tokio::runtime::Handle::current()
                            .block_on(tool.execute(&principal_for_task, arguments_for_task))
                    })
                    .instrument(span),
                )
                .await
                .map(|join_result| join_result.unwrap_or_else(|e| Err(McpError::Internal(e.to_string()))))
            }
        };

        match outcome {
            Ok(Ok(value)) => {
                self.record(invocation_id, tool_name, start_time, InvocationStatus::Ok, None);
                Ok(value)
            }
            Ok(Err(err)) => {
                error!(tool = tool_name, error = %err, "tool handler returned an error; invocation rolled back");
                self.record(invocation_id, tool_name, start_time, InvocationStatus::Error, Some(err.to_string()));
                Err(err)
            }
            Err(_elapsed) => {
                self.record(invocation_id, tool_name, start_time, InvocationStatus::Timeout, Some("deadline exceeded".into()));
                Err(McpError::Timeout)
            }
        }
    }

    fn record(
        &self,
        invocation_id: InvocationId,
        tool_name: &str,
        start_time: DateTime<Utc>,
        status: InvocationStatus,
        error_message: Option<String>,
    ) {
        self.log.push(InvocationRecord {
            invocation_id,
            tool_name: tool_name.to_string(),
            start_time,
            end_time: Utc::now(),
            status,
            error_message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Tool;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn input_schema(&self) -> Value {
            json!({"required": ["text"], "properties": {"text": {"type": "string"}}})
        }
        async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
            Ok(arguments)
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "sleeps past its own deadline"
        }
        fn input_schema(&self) -> Value {
            json!({})
        }
        fn default_timeout_ms(&self) -> u64 {
            20
        }
        async fn execute(&self, _principal: &Principal, _arguments: Value) -> Result<Value, McpError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(json!("done"))
        }
    }

    struct BlockingTool;

    #[async_trait]
    impl Tool for BlockingTool {
        fn name(&self) -> &str {
            "blocking"
        }
        fn description(&self) -> &str {
            "runs on spawn_blocking"
        }
        fn input_schema(&self) -> Value {
            json!({})
        }
        fn concurrency(&self) -> Concurrency {
            Concurrency::Blocking
        }
        async fn execute(&self, _principal: &Principal, _arguments: Value) -> Result<Value, McpError> {
            Ok(json!("blocking-done"))
        }
    }

    fn principal() -> Principal {
        Principal::anonymous_local()
    }

    #[tokio::test]
    async fn unknown_tool_name_reports_method_not_found() {
        let dispatcher = Dispatcher::new(Arc::new(ToolRegistry::new()));
        let err = dispatcher.call("missing", json!({}), &principal(), None).await.unwrap_err();
        assert_eq!(err.rpc_code(), -32601);
        assert_eq!(dispatcher.invocation_log().len(), 1);
        assert_eq!(dispatcher.invocation_log()[0].status, InvocationStatus::Error);
    }

    #[tokio::test]
    async fn invalid_arguments_report_invalid_params() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(EchoTool));
        let dispatcher = Dispatcher::new(registry);
        let err = dispatcher.call("echo", json!({}), &principal(), None).await.unwrap_err();
        assert_eq!(err.rpc_code(), -32602);
    }

    #[tokio::test]
    async fn successful_call_is_recorded_as_ok() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(EchoTool));
        let dispatcher = Dispatcher::new(registry);
        let result = dispatcher.call("echo", json!({"text": "hi"}), &principal(), None).await.unwrap();
        assert_eq!(result, json!({"text": "hi"}));
        let log = dispatcher.invocation_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, InvocationStatus::Ok);
        assert!(log[0].error_message.is_none());
    }

    #[tokio::test]
    async fn handler_exceeding_default_timeout_is_recorded_as_timeout() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(SlowTool));
        let dispatcher = Dispatcher::new(registry);
        let err = dispatcher.call("slow", json!({}), &principal(), None).await.unwrap_err();
        assert_eq!(err.rpc_code(), -32000);
        assert_eq!(dispatcher.invocation_log()[0].status, InvocationStatus::Timeout);
    }

    #[tokio::test]
    async fn client_deadline_is_capped_by_default_timeout_not_extended() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(SlowTool));
        let dispatcher = Dispatcher::new(registry);
        // A generous client deadline must not override the tool's own
        // (shorter) default timeout.
        let err = dispatcher
            .call("slow", json!({}), &principal(), Some(Duration::from_secs(10)))
            .await
            .unwrap_err();
        assert_eq!(err.rpc_code(), -32000);
    }

    #[tokio::test]
    async fn blocking_concurrency_tool_runs_to_completion() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(BlockingTool));
        let dispatcher = Dispatcher::new(registry);
        let result = dispatcher.call("blocking", json!({}), &principal(), None).await.unwrap();
        assert_eq!(result, json!("blocking-done"));
    }

    #[tokio::test]
    async fn call_after_begin_shutdown_is_refused() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(EchoTool));
        let dispatcher = Dispatcher::new(registry);
        dispatcher.begin_shutdown();
        let err = dispatcher.call("echo", json!({"text": "hi"}), &principal(), None).await.unwrap_err();
        assert_eq!(err.rpc_code(), -32000);
        assert_eq!(err.to_string(), "shutting down");
    }

    #[tokio::test]
    async fn ring_buffer_is_bounded_at_capacity() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(EchoTool));
        let dispatcher = Dispatcher::new(registry);
        for _ in 0..(INVOCATION_BUFFER_CAPACITY + 10) {
            let _ = dispatcher.call("echo", json!({"text": "x"}), &principal(), None).await;
        }
        assert_eq!(dispatcher.invocation_log().len(), INVOCATION_BUFFER_CAPACITY);
    }
}
