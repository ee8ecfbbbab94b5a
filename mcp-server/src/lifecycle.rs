//! Process lifecycle: binds both transports, watches for SIGTERM/SIGINT,
//! and drains in-flight work within a grace period before exiting
//! (spec §4.J, §9 "explicit construction phase").

use crate::state::AppComponents;
use mcp_transport::http::{AppState, PoolStatsSource};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

pub async fn run(components: Arc<AppComponents>) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let stdio_task = tokio::spawn(mcp_transport::stdio::run(
        components.registry.clone(),
        components.dispatcher.clone(),
        components.config.api.rate_limit_rps,
        shutdown_rx.clone(),
    ));

    let app_state = AppState::new(
        components.registry.clone(),
        components.dispatcher.clone(),
        components.bus.clone(),
        components.stats.clone(),
        components.config.api.clone(),
        components.connections.clone(),
    )
    .with_observability(
        PoolStatsSource { controller: components.pool_controller.clone(), handle: components.pool.clone() },
        components.memory.clone(),
    );
    let addr: SocketAddr = format!("{}:{}", components.config.api.host, components.config.api.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http transport listening");
    let router = mcp_transport::build_router(app_state).into_make_service_with_connect_info::<SocketAddr>();

    let http_shutdown_rx = shutdown_rx.clone();
    let http_task = tokio::spawn(async move {
        let mut shutdown_rx = http_shutdown_rx;
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });

    let system_stats_task = tokio::spawn(crate::background::run_system_stats_publisher(
        components.clone(),
        shutdown_rx.clone(),
    ));
    let pool_controller_task =
        tokio::spawn(crate::background::run_pool_controller(components.clone(), shutdown_rx.clone()));
    let idle_reaper_task =
        tokio::spawn(crate::background::run_idle_connection_reaper(components.clone(), shutdown_rx.clone()));

    wait_for_termination().await;
    info!("shutdown signal received, draining in-flight work");
    components.dispatcher.begin_shutdown();
    let _ = shutdown_tx.send(true);

    let drain = async {
        let _ = stdio_task.await;
        let _ = http_task.await;
        let _ = system_stats_task.await;
        let _ = pool_controller_task.await;
        let _ = idle_reaper_task.await;
    };

    if tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, drain).await.is_err() {
        warn!("shutdown grace period elapsed before all tasks drained");
    }

    Ok(())
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = tokio::signal::ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}
