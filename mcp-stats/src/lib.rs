//! Request counters, dependency health probes, and the `/health`,
//! `/stats`, `/metrics` payload shapes (spec §4.K, §6).

use chrono::{DateTime, Utc};
use mcp_tool::{Dispatcher, InvocationRecord};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// One dependency this process probes for `/health`'s `degraded` bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependency {
    Relational,
    Kv,
    Vector,
}

#[derive(Default)]
struct ProbeState {
    relational_ok: RwLock<bool>,
    kv_ok: RwLock<bool>,
    vector_ok: RwLock<bool>,
}

/// Shared counters updated by the dispatcher/transport layer and read by
/// the `/health`, `/stats`, `/metrics` handlers.
pub struct ServerStats {
    started_at: Instant,
    total_requests: AtomicI64,
    successful_requests: AtomicI64,
    failed_requests: AtomicI64,
    response_time_ms_total: AtomicI64,
    active_connections: AtomicUsize,
    probes: ProbeState,
}

impl Default for ServerStats {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            total_requests: AtomicI64::new(0),
            successful_requests: AtomicI64::new(0),
            failed_requests: AtomicI64::new(0),
            response_time_ms_total: AtomicI64::new(0),
            active_connections: AtomicUsize::new(0),
            probes: ProbeState {
                relational_ok: RwLock::new(true),
                kv_ok: RwLock::new(true),
                vector_ok: RwLock::new(true),
            },
        }
    }
}

impl ServerStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self, successful: bool, response_time_ms: i64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if successful {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
        self.response_time_ms_total.fetch_add(response_time_ms, Ordering::Relaxed);
    }

    pub fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn set_dependency_health(&self, dependency: Dependency, healthy: bool) {
        let mut slot = match dependency {
            Dependency::Relational => self.probes.relational_ok.write(),
            Dependency::Kv => self.probes.kv_ok.write(),
            Dependency::Vector => self.probes.vector_ok.write(),
        };
        *slot = healthy;
    }

    fn all_dependencies_healthy(&self) -> bool {
        *self.probes.relational_ok.read() && *self.probes.kv_ok.read() && *self.probes.vector_ok.read()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    fn total(&self) -> i64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    fn successful(&self) -> i64 {
        self.successful_requests.load(Ordering::Relaxed)
    }

    fn failed(&self) -> i64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 1.0;
        }
        self.successful() as f64 / total as f64
    }

    fn avg_response_time_s(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.response_time_ms_total.load(Ordering::Relaxed) as f64 / total as f64) / 1000.0
    }

    pub fn health(&self, tool_count: usize) -> HealthResponse {
        HealthResponse {
            status: if self.all_dependencies_healthy() { "healthy" } else { "degraded" },
            uptime_seconds: self.uptime_seconds(),
            tool_count,
            active_connections: self.active_connections(),
            total_requests: self.total(),
        }
    }

    pub fn stats(&self, dispatcher: &Dispatcher) -> StatsResponse {
        let mut recent: Vec<InvocationRecord> = dispatcher.invocation_log();
        if recent.len() > 100 {
            recent = recent.split_off(recent.len() - 100);
        }
        StatsResponse {
            total_requests: self.total(),
            successful_requests: self.successful(),
            failed_requests: self.failed(),
            success_rate: self.success_rate(),
            avg_response_time_s: self.avg_response_time_s(),
            active_connections: self.active_connections(),
            recent_invocations: recent,
        }
    }

    /// Hand-formatted Prometheus text exposition — the teacher's stack
    /// has no metrics-exposition crate, and this surface is four
    /// gauges/counters, so a formatter keeps the dependency set aligned
    /// rather than pulling one in for this alone.
    pub fn prometheus_text(&self) -> String {
        format!(
            "# HELP mcp_uptime_seconds Seconds since process start\n\
             # TYPE mcp_uptime_seconds gauge\n\
             mcp_uptime_seconds {}\n\
             # HELP mcp_active_connections Currently open connections\n\
             # TYPE mcp_active_connections gauge\n\
             mcp_active_connections {}\n\
             # HELP mcp_requests_total Total JSON-RPC requests handled\n\
             # TYPE mcp_requests_total counter\n\
             mcp_requests_total {}\n\
             # HELP mcp_requests_successful Successful JSON-RPC requests\n\
             # TYPE mcp_requests_successful counter\n\
             mcp_requests_successful {}\n\
             # HELP mcp_requests_failed Failed JSON-RPC requests\n\
             # TYPE mcp_requests_failed counter\n\
             mcp_requests_failed {}\n\
             # HELP mcp_response_time_avg Average response time in seconds\n\
             # TYPE mcp_response_time_avg gauge\n\
             mcp_response_time_avg {}\n",
            self.uptime_seconds(),
            self.active_connections(),
            self.total(),
            self.successful(),
            self.failed(),
            self.avg_response_time_s(),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub tool_count: usize,
    pub active_connections: usize,
    pub total_requests: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub total_requests: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    pub success_rate: f64,
    pub avg_response_time_s: f64,
    pub active_connections: usize,
    pub recent_invocations: Vec<InvocationRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatsEvent {
    pub total_requests: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    pub avg_response_time: f64,
    pub active_connections: usize,
    pub memory_usage: f64,
    pub cpu_usage: f64,
    pub uptime: u64,
    pub timestamp: DateTime<Utc>,
}

impl ServerStats {
    /// Builds the periodic `system_stats.stats_update` payload (spec §6).
    /// `memory_usage`/`cpu_usage` are best-effort host gauges; this
    /// process does not shell out to a system-metrics crate the teacher's
    /// stack doesn't carry, so both report 0.0 when unavailable.
    pub fn system_stats_event(&self, memory_usage: f64, cpu_usage: f64) -> SystemStatsEvent {
        SystemStatsEvent {
            total_requests: self.total(),
            successful_requests: self.successful(),
            failed_requests: self.failed(),
            avg_response_time: self.avg_response_time_s() * 1000.0,
            active_connections: self.active_connections(),
            memory_usage,
            cpu_usage,
            uptime: self.uptime_seconds(),
            timestamp: Utc::now(),
        }
    }
}
