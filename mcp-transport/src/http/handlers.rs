//! `/`, `/health`, `/stats`, `/metrics`, `/info`, and the `/api/*`
//! aggregate/legacy-alias surface (spec §4.K, §6).

use crate::http::AppState;
use crate::jsonrpc::handle_request;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use mcp_core::{JsonRpcRequest, JsonRpcResponse, Principal};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;

pub async fn jsonrpc(State(state): State<AppState>, Json(request): Json<JsonRpcRequest>) -> Json<JsonRpcResponse> {
    let started = Instant::now();
    let principal = Principal::api_key("http-caller");
    let response = handle_request(request, &state.registry, &state.dispatcher, &principal, None).await;
    state.stats.record_request(response.error.is_none(), started.elapsed().as_millis() as i64);
    Json(response)
}

pub async fn health(State(state): State<AppState>) -> Json<mcp_stats::HealthResponse> {
    Json(state.stats.health(state.registry.len()))
}

pub async fn stats(State(state): State<AppState>) -> Json<mcp_stats::StatsResponse> {
    Json(state.stats.stats(&state.dispatcher))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.stats.prometheus_text(),
    )
        .into_response()
}

pub async fn info(State(state): State<AppState>) -> Html<String> {
    let health = state.stats.health(state.registry.len());
    Html(format!(
        "<html><head><title>{name}</title></head><body>\
         <h1>{name}</h1>\
         <p>status: {status}</p>\
         <p>uptime: {uptime}s</p>\
         <p>tools: {tool_count}</p>\
         <p>active connections: {active}</p>\
         </body></html>",
        name = crate::jsonrpc::SERVER_NAME,
        status = health.status,
        uptime = health.uptime_seconds,
        tool_count = health.tool_count,
        active = health.active_connections,
    ))
}

#[derive(Debug, Deserialize)]
pub struct UnifiedStatsQuery {
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "json".to_string()
}

/// `GET /api/v1/stats?include=system,pool,vector&format=json|prometheus`.
/// `pool`/`vector` report `{"available": false}` only when `AppState`
/// wasn't built `with_observability` (e.g. a transport-only test harness).
pub async fn unified_stats(State(state): State<AppState>, Query(query): Query<UnifiedStatsQuery>) -> Response {
    if query.format == "prometheus" {
        return (
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            state.stats.prometheus_text(),
        )
            .into_response();
    }

    let sections: Vec<&str> = query.include.as_deref().unwrap_or("system").split(',').collect();
    let mut body = serde_json::Map::new();
    if sections.contains(&"system") {
        body.insert("system".to_string(), serde_json::to_value(state.stats.stats(&state.dispatcher)).unwrap());
    }
    if sections.contains(&"pool") {
        let value = match &state.pool_stats {
            Some(source) => serde_json::to_value(source.controller.peek(source.handle.as_ref())).unwrap(),
            None => json!({"available": false}),
        };
        body.insert("pool".to_string(), value);
    }
    if sections.contains(&"vector") {
        let value = match &state.memory {
            Some(memory) => serde_json::to_value(memory.search_latency_percentiles()).unwrap(),
            None => json!({"available": false}),
        };
        body.insert("vector".to_string(), value);
    }
    Json(Value::Object(body)).into_response()
}

pub async fn overview_stats_alias(state: State<AppState>) -> Response {
    unified_stats(state, Query(UnifiedStatsQuery { include: Some("system".to_string()), format: "json".to_string() }))
        .await
}

pub async fn pool_stats_alias(state: State<AppState>) -> Response {
    unified_stats(state, Query(UnifiedStatsQuery { include: Some("pool".to_string()), format: "json".to_string() }))
        .await
}

pub async fn vector_stats_alias(state: State<AppState>) -> Response {
    unified_stats(state, Query(UnifiedStatsQuery { include: Some("vector".to_string()), format: "json".to_string() }))
        .await
}

pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
}
