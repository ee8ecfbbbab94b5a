//! Background tasks the server core owns outright: the periodic
//! system-stats publisher, the connection pool's sampling loop, and the
//! idle-connection reaper (spec §4.J). All three stop cooperatively on
//! the shared shutdown signal rather than being aborted.

use crate::state::AppComponents;
use chrono::Duration as ChronoDuration;
use mcp_core::Channel;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const SYSTEM_STATS_INTERVAL: Duration = Duration::from_secs(5);
const IDLE_REAP_INTERVAL: Duration = Duration::from_secs(30);
const IDLE_CONNECTION_THRESHOLD_MINUTES: i64 = 10;

/// Publishes `system_stats.stats_update` every [`SYSTEM_STATS_INTERVAL`].
pub async fn run_system_stats_publisher(
    components: Arc<AppComponents>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(SYSTEM_STATS_INTERVAL);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("system stats publisher stopping on shutdown signal");
                    return;
                }
            }
            _ = ticker.tick() => {
                let event = components.stats.system_stats_event(0.0, 0.0);
                components.bus.publish(
                    Channel::SystemStats,
                    "stats_update",
                    serde_json::to_value(&event).unwrap_or_else(|_| serde_json::json!({})),
                );
            }
        }
    }
}

/// Drives [`mcp_pool::PoolController::tick`] on `pool.sample_interval_s`.
pub async fn run_pool_controller(components: Arc<AppComponents>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let interval = Duration::from_secs(components.config.pool.sample_interval_s);
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("pool controller stopping on shutdown signal");
                    return;
                }
            }
            _ = ticker.tick() => {
                components.pool_controller.tick(components.pool.as_ref(), interval).await;
            }
        }
    }
}

/// Disconnects and forgets connections idle longer than
/// [`IDLE_CONNECTION_THRESHOLD_MINUTES`], every [`IDLE_REAP_INTERVAL`].
pub async fn run_idle_connection_reaper(
    components: Arc<AppComponents>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(IDLE_REAP_INTERVAL);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("idle connection reaper stopping on shutdown signal");
                    return;
                }
            }
            _ = ticker.tick() => {
                let idle = components.connections.idle_longer_than(ChronoDuration::minutes(IDLE_CONNECTION_THRESHOLD_MINUTES));
                for conn_id in idle {
                    components.bus.disconnect(&conn_id);
                    components.connections.unregister(&conn_id);
                    info!(conn_id = %conn_id, "reaped idle connection");
                }
            }
        }
    }
}
