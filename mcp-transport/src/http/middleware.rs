//! Authentication, IP allow-listing, rate limiting and admission control
//! for non-stdio transports (spec §4.J). stdio is authenticated by virtue
//! of local invocation and never passes through these layers.

use crate::http::AppState;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::net::SocketAddr;

pub async fn require_bearer_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if state.api_config.api_keys.is_empty() {
        return next.run(request).await;
    }

    let presented = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(key) if state.api_config.api_keys.contains(key) => next.run(request).await,
        _ => (StatusCode::UNAUTHORIZED, axum::Json(json!({"error": "missing or invalid bearer token"})))
            .into_response(),
    }
}

pub async fn require_ip_allowlist(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if state.api_config.allowed_ips.is_empty() {
        return next.run(request).await;
    }

    if state.api_config.allowed_ips.contains(&addr.ip().to_string()) {
        next.run(request).await
    } else {
        (StatusCode::FORBIDDEN, axum::Json(json!({"error": "source IP not allow-listed"}))).into_response()
    }
}

pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    match state.rate_limiter.try_acquire(&addr.ip().to_string()) {
        Ok(()) => next.run(request).await,
        Err(retry_after_s) => {
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                axum::Json(json!({"error": "rate limit exceeded", "retry_after_s": retry_after_s})),
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after_s.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
            response
        }
    }
}

/// Rejects new work once `active_connections` reaches `max_connections`.
/// WebSocket upgrades manage their own connection lifetime bookkeeping
/// in [`crate::ws`] (the socket outlives this handshake request), so
/// this layer only performs the capacity check for `/ws`, not the
/// open/close accounting it does for ordinary requests.
pub async fn enforce_admission_control(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.stats.active_connections() >= state.api_config.max_connections {
        return (StatusCode::SERVICE_UNAVAILABLE, axum::Json(json!({"error": "at capacity"}))).into_response();
    }

    if request.uri().path() == "/ws" {
        return next.run(request).await;
    }

    state.stats.connection_opened();
    let response = next.run(request).await;
    state.stats.connection_closed();
    response
}
