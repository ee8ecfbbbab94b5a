//! HTTP surface: one controller per concern, composed into a single
//! router (spec §4.I, §6), mirroring the teacher's
//! `rest::controllers::{debug, ui}` + top-level router wiring.

mod handlers;
mod middleware;
pub mod ratelimit;

use axum::routing::{get, post};
use axum::Router;
use mcp_config::ApiConfig;
use mcp_core::ConnectionRegistry;
use mcp_memory::TieredMemory;
use mcp_pool::{PoolController, PoolHandle};
use mcp_pubsub::PubSubBus;
use mcp_stats::ServerStats;
use mcp_tool::{Dispatcher, ToolRegistry};
use ratelimit::RateLimiter;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Read-only views the unified `/api/v1/stats` alias surface (spec §6)
/// reports alongside the `system` section. Both are optional: a caller
/// that only needs the JSON-RPC/WebSocket surface (e.g. the transport's
/// own integration tests) can build an `AppState` without either.
#[derive(Clone)]
pub struct PoolStatsSource {
    pub controller: Arc<PoolController>,
    pub handle: Arc<dyn PoolHandle>,
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ToolRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub bus: Arc<PubSubBus>,
    pub stats: Arc<ServerStats>,
    pub api_config: ApiConfig,
    pub rate_limiter: Arc<RateLimiter>,
    pub connections: Arc<ConnectionRegistry>,
    pub pool_stats: Option<PoolStatsSource>,
    pub memory: Option<Arc<TieredMemory>>,
}

impl AppState {
    pub fn new(
        registry: Arc<ToolRegistry>,
        dispatcher: Arc<Dispatcher>,
        bus: Arc<PubSubBus>,
        stats: Arc<ServerStats>,
        api_config: ApiConfig,
        connections: Arc<ConnectionRegistry>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(api_config.rate_limit_rps));
        Self { registry, dispatcher, bus, stats, api_config, rate_limiter, connections, pool_stats: None, memory: None }
    }

    /// Attaches the pool-controller and tiered-memory views so
    /// `/api/pool/stats` and `/api/vector/stats` report live data
    /// instead of `{"available": false}`.
    pub fn with_observability(mut self, pool_stats: PoolStatsSource, memory: Arc<TieredMemory>) -> Self {
        self.pool_stats = Some(pool_stats);
        self.memory = Some(memory);
        self
    }
}

/// Builds the full router: unauthenticated health/metrics probes, the
/// JSON-RPC and stats surface behind auth/IP-allowlist/rate-limit/
/// admission-control layers, and the WebSocket upgrade.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", post(handlers::jsonrpc))
        .route("/stats", get(handlers::stats))
        .route("/api/v1/stats", get(handlers::unified_stats))
        .route("/api/overview/stats", get(handlers::overview_stats_alias))
        .route("/api/pool/stats", get(handlers::pool_stats_alias))
        .route("/api/vector/stats", get(handlers::vector_stats_alias))
        .route("/ws", get(crate::ws::upgrade))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::enforce_admission_control))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::enforce_rate_limit))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::require_ip_allowlist))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::require_bearer_auth));

    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/info", get(handlers::info));

    Router::new()
        .merge(protected)
        .merge(public)
        .fallback(handlers::not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
