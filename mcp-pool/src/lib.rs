//! Dynamic database connection pool controller (spec §4.D).
//!
//! A background sampling loop refreshes a metrics snapshot, publishes it
//! on `db_pool_stats`, and — outside its cooldown window — resizes the
//! pool by the first matching rule. This crate models the controller's
//! decision logic and instrumentation; the pool it governs is injected
//! through the [`PoolHandle`] trait so the same controller drives either
//! a real `sqlx::Pool` or a test double.

use mcp_config::PoolConfig;
use mcp_pubsub::PubSubBus;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Abstraction over the pool object being governed. `resize` must create
/// a replacement pool of the new size, swap it in atomically, and
/// dispose the old pool's idle connections — in-flight checkouts drain
/// on return rather than being force-closed.
#[async_trait::async_trait]
pub trait PoolHandle: Send + Sync {
    fn current_size(&self) -> usize;
    fn checked_out(&self) -> usize;
    fn overflow(&self) -> usize;
    async fn resize(&self, new_size: usize);
}

const ROLLING_BUFFER_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolMetricsSnapshot {
    pub size: usize,
    pub checked_out: usize,
    pub checked_in: usize,
    pub overflow: usize,
    pub utilization: f64,
    pub qps: f64,
    pub mean_wait_ms: f64,
    pub potential_leak_count: usize,
}

struct Checkout {
    started_at: Instant,
}

/// Instrumentation shared between the controller and whatever code
/// performs checkouts/checkins against the governed pool.
pub struct PoolInstrumentation {
    in_flight: Mutex<Vec<Checkout>>,
    wait_times_ms: Mutex<VecDeque<f64>>,
    total_queries: AtomicUsize,
    queries_since_last_tick: AtomicUsize,
}

impl Default for PoolInstrumentation {
    fn default() -> Self {
        Self {
            in_flight: Mutex::new(Vec::new()),
            wait_times_ms: Mutex::new(VecDeque::with_capacity(ROLLING_BUFFER_CAPACITY)),
            total_queries: AtomicUsize::new(0),
            queries_since_last_tick: AtomicUsize::new(0),
        }
    }
}

impl PoolInstrumentation {
    pub fn record_checkout(&self) -> usize {
        let mut in_flight = self.in_flight.lock();
        in_flight.push(Checkout { started_at: Instant::now() });
        in_flight.len() - 1
    }

    pub fn record_checkin(&self, checkout_index: usize) {
        let mut in_flight = self.in_flight.lock();
        if checkout_index < in_flight.len() {
            let checkout = in_flight.remove(checkout_index);
            let mut wait_times = self.wait_times_ms.lock();
            if wait_times.len() == ROLLING_BUFFER_CAPACITY {
                wait_times.pop_front();
            }
            wait_times.push_back(checkout.started_at.elapsed().as_secs_f64() * 1000.0);
        }
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        self.queries_since_last_tick.fetch_add(1, Ordering::Relaxed);
    }

    fn mean_wait_ms(&self) -> f64 {
        let wait_times = self.wait_times_ms.lock();
        if wait_times.is_empty() {
            0.0
        } else {
            wait_times.iter().sum::<f64>() / wait_times.len() as f64
        }
    }

    fn max_wait_ms(&self) -> f64 {
        self.wait_times_ms.lock().iter().cloned().fold(0.0, f64::max)
    }

    fn total_queries(&self) -> usize {
        self.total_queries.load(Ordering::Relaxed)
    }

    fn leak_count(&self, leak_threshold: Duration) -> usize {
        self.in_flight.lock().iter().filter(|c| c.started_at.elapsed() > leak_threshold).count()
    }

    fn drain_qps(&self, interval: Duration) -> f64 {
        let count = self.queries_since_last_tick.swap(0, Ordering::Relaxed);
        count as f64 / interval.as_secs_f64().max(1.0)
    }
}

#[derive(Debug, Clone)]
pub struct ResizeEvent {
    pub old_size: usize,
    pub new_size: usize,
    pub reason: &'static str,
}

/// Drives the sampling loop. Holds no pool itself — `tick` is called
/// periodically by [`run`] against a [`PoolHandle`].
pub struct PoolController {
    config: PoolConfig,
    instrumentation: Arc<PoolInstrumentation>,
    bus: Arc<PubSubBus>,
    last_resize: Mutex<Instant>,
    consecutive_saturated_ticks: AtomicUsize,
}

impl PoolController {
    pub fn new(config: PoolConfig, instrumentation: Arc<PoolInstrumentation>, bus: Arc<PubSubBus>) -> Self {
        Self {
            config,
            instrumentation,
            bus,
            last_resize: Mutex::new(Instant::now() - Duration::from_secs(3600)),
            consecutive_saturated_ticks: AtomicUsize::new(0),
        }
    }

    fn snapshot(&self, pool: &dyn PoolHandle, interval: Duration) -> PoolMetricsSnapshot {
        let size = pool.current_size();
        let checked_out = pool.checked_out();
        let utilization = if size == 0 { 0.0 } else { checked_out as f64 / size as f64 };
        PoolMetricsSnapshot {
            size,
            checked_out,
            checked_in: size.saturating_sub(checked_out),
            overflow: pool.overflow(),
            utilization,
            qps: self.instrumentation.drain_qps(interval),
            mean_wait_ms: self.instrumentation.mean_wait_ms(),
            potential_leak_count: self.instrumentation.leak_count(Duration::from_secs(self.config.leak_threshold_s)),
        }
    }

    /// A read-only snapshot for callers outside the sampling loop (e.g.
    /// the `/api/pool/stats` HTTP alias). Unlike [`Self::snapshot`] this
    /// never drains the QPS counter, so it can be called at any cadence
    /// without perturbing the next scheduled `tick`.
    pub fn peek(&self, pool: &dyn PoolHandle) -> PoolMetricsSnapshot {
        let size = pool.current_size();
        let checked_out = pool.checked_out();
        let utilization = if size == 0 { 0.0 } else { checked_out as f64 / size as f64 };
        PoolMetricsSnapshot {
            size,
            checked_out,
            checked_in: size.saturating_sub(checked_out),
            overflow: pool.overflow(),
            utilization,
            qps: 0.0,
            mean_wait_ms: self.instrumentation.mean_wait_ms(),
            potential_leak_count: self.instrumentation.leak_count(Duration::from_secs(self.config.leak_threshold_s)),
        }
    }

    fn decide_resize(&self, snapshot: &PoolMetricsSnapshot) -> Option<(usize, &'static str)> {
        let size = snapshot.size;
        if snapshot.utilization > self.config.high_util_threshold {
            let target = ((size as f64 * self.config.resize_step_up).ceil() as usize).min(self.config.max);
            return (target != size).then_some((target, "high-load expand"));
        }
        if snapshot.overflow > 0 {
            let target = ((size as f64 * 1.3).ceil() as usize).min(self.config.max);
            return (target != size).then_some((target, "overflow expand"));
        }
        if snapshot.utilization < self.config.low_util_threshold && size > self.config.min {
            let target = ((size as f64 * self.config.resize_step_down).floor() as usize).max(self.config.min);
            return (target != size).then_some((target, "low-load shrink"));
        }
        None
    }

    /// Runs one sampling iteration: refresh, publish, maybe resize,
    /// check alerts. Returns the snapshot and any resize that occurred.
    pub async fn tick(&self, pool: &dyn PoolHandle, interval: Duration) -> (PoolMetricsSnapshot, Option<ResizeEvent>) {
        let snapshot = self.snapshot(pool, interval);

        self.bus.publish(
            mcp_core::Channel::DbPoolStats,
            "stats_update",
            serde_json::json!({
                "pool_size": snapshot.size,
                "active_connections": snapshot.checked_out,
                "idle_connections": snapshot.checked_in,
                "overflow_connections": snapshot.overflow,
                "utilization": snapshot.utilization * 100.0,
                "qps": snapshot.qps,
                "avg_query_time": snapshot.mean_wait_ms,
                "max_wait_time": self.instrumentation.max_wait_ms(),
                "total_queries": self.instrumentation.total_queries(),
            }),
        );

        if snapshot.potential_leak_count > 0 {
            warn!(count = snapshot.potential_leak_count, "potential connection leak detected");
        }

        if snapshot.utilization > 0.90 {
            let ticks = self.consecutive_saturated_ticks.fetch_add(1, Ordering::Relaxed) + 1;
            if ticks >= 2 {
                self.bus.publish(
                    mcp_core::Channel::DbPoolStats,
                    "pool_saturation_warning",
                    serde_json::json!({ "utilization": snapshot.utilization }),
                );
            }
        } else {
            self.consecutive_saturated_ticks.store(0, Ordering::Relaxed);
        }

        let cooldown_elapsed = {
            let last_resize = self.last_resize.lock();
            last_resize.elapsed() >= Duration::from_secs(self.config.cooldown_s)
        };

        if !cooldown_elapsed {
            return (snapshot, None);
        }

        let Some((new_size, reason)) = self.decide_resize(&snapshot) else {
            return (snapshot, None);
        };

        pool.resize(new_size).await;
        *self.last_resize.lock() = Instant::now();

        let event = ResizeEvent { old_size: snapshot.size, new_size, reason };
        let action = if event.new_size >= event.old_size { "expand" } else { "shrink" };
        self.bus.publish(
            mcp_core::Channel::DbPoolStats,
            "pool_resized",
            serde_json::json!({
                "action": action,
                "from": event.old_size,
                "to": event.new_size,
                "reason": event.reason,
            }),
        );

        (snapshot, Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as AU;
    use tokio::sync::Mutex as AsyncMutex;

    struct FakePool {
        size: AU,
        checked_out: AU,
        overflow: AU,
        resize_calls: AsyncMutex<Vec<usize>>,
    }

    impl FakePool {
        fn new(size: usize, checked_out: usize, overflow: usize) -> Self {
            Self {
                size: AU::new(size),
                checked_out: AU::new(checked_out),
                overflow: AU::new(overflow),
                resize_calls: AsyncMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl PoolHandle for FakePool {
        fn current_size(&self) -> usize {
            self.size.load(Ordering::Relaxed)
        }
        fn checked_out(&self) -> usize {
            self.checked_out.load(Ordering::Relaxed)
        }
        fn overflow(&self) -> usize {
            self.overflow.load(Ordering::Relaxed)
        }
        async fn resize(&self, new_size: usize) {
            self.size.store(new_size, Ordering::Relaxed);
            self.resize_calls.lock().await.push(new_size);
        }
    }

    fn controller(config: PoolConfig) -> PoolController {
        PoolController::new(config, Arc::new(PoolInstrumentation::default()), PubSubBus::new())
    }

    #[tokio::test]
    async fn high_utilization_expands_pool() {
        let config = PoolConfig { min: 5, max: 50, cooldown_s: 0, high_util_threshold: 0.8, ..PoolConfig::default() };
        let controller = controller(config);
        let pool = FakePool::new(10, 9, 0);
        let (snapshot, event) = controller.tick(&pool, Duration::from_secs(60)).await;
        assert!(snapshot.utilization > 0.8);
        let event = event.expect("expected a resize");
        assert_eq!(event.reason, "high-load expand");
        assert_eq!(pool.current_size(), 12);
    }

    #[tokio::test]
    async fn low_utilization_shrinks_pool_but_not_below_min() {
        let config = PoolConfig { min: 5, max: 50, cooldown_s: 0, low_util_threshold: 0.2, ..PoolConfig::default() };
        let controller = controller(config);
        let pool = FakePool::new(10, 1, 0);
        let (_, event) = controller.tick(&pool, Duration::from_secs(60)).await;
        assert_eq!(event.unwrap().reason, "low-load shrink");
        assert_eq!(pool.current_size(), 8);
    }

    #[tokio::test]
    async fn overflow_expands_even_under_moderate_utilization() {
        let config = PoolConfig { min: 5, max: 50, cooldown_s: 0, ..PoolConfig::default() };
        let controller = controller(config);
        let pool = FakePool::new(10, 5, 2);
        let (_, event) = controller.tick(&pool, Duration::from_secs(60)).await;
        assert_eq!(event.unwrap().reason, "overflow expand");
    }

    #[tokio::test]
    async fn cooldown_suppresses_resize() {
        let config = PoolConfig { min: 5, max: 50, cooldown_s: 3600, high_util_threshold: 0.8, ..PoolConfig::default() };
        let controller = controller(config);
        let pool = FakePool::new(10, 9, 0);
        let (_, event) = controller.tick(&pool, Duration::from_secs(60)).await;
        assert!(event.is_none());
        assert_eq!(pool.current_size(), 10);
    }

    #[tokio::test]
    async fn stale_checkout_counts_as_potential_leak() {
        let instrumentation = PoolInstrumentation::default();
        let idx = instrumentation.record_checkout();
        let _ = idx;
        assert_eq!(instrumentation.leak_count(Duration::from_secs(0)), 1);
    }
}
