//! Line-delimited JSON-RPC over stdin/stdout (spec §4.I).
//!
//! One request per line, responses emitted in the order received — the
//! loop is strictly sequential, so FIFO ordering falls out for free. EOF
//! on stdin starts graceful shutdown.

use crate::http::ratelimit::RateLimiter;
use crate::jsonrpc::handle_request;
use mcp_core::{JsonRpcResponse, McpError, Principal};
use mcp_tool::{Dispatcher, ToolRegistry};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

/// Single bucket key: spec §5 scopes the token bucket "per source IP
/// (and per stdio pipe)" — a stdio session is one process-lifetime pipe,
/// so one key suffices.
const STDIO_BUCKET_KEY: &str = "stdio";

/// Runs the stdio loop until EOF or `shutdown` fires. Returns once the
/// last in-flight line has been answered.
pub async fn run(
    registry: Arc<ToolRegistry>,
    dispatcher: Arc<Dispatcher>,
    rate_limit_rps: u32,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let principal = Principal::anonymous_local();
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();
    let rate_limiter = RateLimiter::new(rate_limit_rps);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("stdio transport stopping on shutdown signal");
                    break;
                }
            }
            line = lines.next_line() => {
                let Ok(Some(line)) = line else {
                    info!("stdio transport saw EOF, shutting down");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let response = match serde_json::from_str(&line) {
                    Ok(request) => match rate_limiter.try_acquire(STDIO_BUCKET_KEY) {
                        Ok(()) => handle_request(request, &registry, &dispatcher, &principal, None).await,
                        Err(retry_after_s) => JsonRpcResponse::from_mcp_error(
                            request.id,
                            &McpError::RateLimited { retry_after_s },
                        ),
                    },
                    Err(err) => JsonRpcResponse::err(None, -32700, format!("parse error: {err}"), None),
                };
                if let Ok(mut serialized) = serde_json::to_string(&response) {
                    serialized.push('\n');
                    if stdout.write_all(serialized.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
                        warn!("stdio transport failed to write response, stopping");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_tool::{Concurrency, Tool};
    use async_trait::async_trait;
    use mcp_core::McpError;
    use serde_json::{json, Value};

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

    #[tokio::test]
    async fn malformed_line_yields_parse_error_response() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(EchoTool));
        let dispatcher = Arc::new(Dispatcher::new(registry.clone()));
        let principal = Principal::anonymous_local();
        let response: JsonRpcResponse = match serde_json::from_str::<mcp_core::JsonRpcRequest>("not json") {
            Ok(request) => handle_request(request, &registry, &dispatcher, &principal, None).await,
            Err(err) => JsonRpcResponse::err(None, -32700, format!("parse error: {err}"), None),
        };
        assert_eq!(response.error.unwrap().code, -32700);
    }
}
