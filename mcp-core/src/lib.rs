//! Shared identifiers, envelope types and error kinds for the MCP
//! enterprise server workspace.
//!
//! Every other crate in this workspace depends on `mcp-core` and nothing
//! else in the workspace; it is the single point of coupling so that
//! `mcp-cache`, `mcp-pool`, `mcp-memory`, `mcp-firewall`, `mcp-pubsub` and
//! `mcp-tool` can all be wired together by `mcp-server` without pairwise
//! dependencies between them.

pub mod channel;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod registry;

pub use channel::Channel;
pub use envelope::{JsonRpcErrorBody, JsonRpcRequest, JsonRpcResponse, NormalizedCall, TransportHint, WsEvent};
pub use error::{McpError, Result};
pub use ids::{BlockLevel, ConnId, ErrorId, InvocationId, MemoryId, Principal, ProjectId, Tier};
pub use registry::{ConnectionRecord, ConnectionRegistry, TransportKind};
