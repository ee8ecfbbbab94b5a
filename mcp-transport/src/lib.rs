//! stdio, HTTP and WebSocket transports, normalized onto a single
//! [`mcp_tool::Dispatcher`] (spec §4.I).

pub mod http;
pub mod jsonrpc;
pub mod stdio;
pub mod ws;

pub use http::{build_router, AppState};
