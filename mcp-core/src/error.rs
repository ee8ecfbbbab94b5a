//! The JSON-RPC-flavored error kind shared by every transport and component.
//!
//! Each variant carries the JSON-RPC 2.0 error code it maps to (per
//! spec §7); transport-level kinds (`Auth`, `RateLimited`, `Capacity`)
//! additionally map to an HTTP status via [`McpError::http_status`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("timeout")]
    Timeout,

    #[error("shutting down")]
    ShuttingDown,

    #[error("authentication required")]
    AuthRequired,

    #[error("rate limited, retry after {retry_after_s}s")]
    RateLimited { retry_after_s: u64 },

    #[error("at capacity")]
    Capacity,

    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),
}

impl McpError {
    /// JSON-RPC error code, where one is defined (per spec §7).
    pub fn rpc_code(&self) -> i64 {
        match self {
            McpError::Parse(_) => -32700,
            McpError::InvalidRequest(_) => -32600,
            McpError::MethodNotFound(_) => -32601,
            McpError::InvalidParams(_) => -32602,
            McpError::Internal(_) => -32603,
            McpError::Timeout | McpError::ShuttingDown => -32000,
            McpError::DependencyUnavailable(_) => -32603,
            // Transport-level kinds have no JSON-RPC mapping; they never
            // reach the JSON-RPC envelope (caller rejects before dispatch).
            McpError::AuthRequired | McpError::RateLimited { .. } | McpError::Capacity => -32000,
        }
    }

    /// HTTP status code when this error short-circuits before dispatch.
    pub fn http_status(&self) -> u16 {
        match self {
            McpError::AuthRequired => 401,
            McpError::RateLimited { .. } => 429,
            McpError::Capacity => 503,
            _ => 200,
        }
    }

    /// Short remediation hint surfaced in the JSON-RPC `data` field, if any.
    pub fn remediation(&self) -> Option<String> {
        match self {
            McpError::RateLimited { retry_after_s } => {
                Some(format!("retry after {retry_after_s}s"))
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, McpError>;
