//! Telemetry initialization: structured, leveled logging with daily
//! rotation (spec §4.A).
//!
//! Follows the same `tracing_subscriber::registry()` + `EnvFilter` +
//! `fmt::layer()` shape used elsewhere in the stack, with an added
//! non-blocking daily-rotating file appender. Every invocation-scoped log
//! line is expected to carry `invocation_id` (or `conn_id` pre-dispatch)
//! as a structured field — callers attach it via `tracing::info_span!`.

use mcp_config::LoggingConfig;
use std::sync::{Once, OnceLock};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Marker returned by [`init`]. The real guard lives in a process-wide
/// `OnceLock` since `init` only ever runs its setup once; this type just
/// documents the call site's intent to keep telemetry alive.
pub struct TelemetryGuard(());

/// Initialize the global tracing subscriber. `log_dir` enables a daily
/// rotating file sink in addition to the console stream; `None` logs to
/// stderr only. Subsequent calls after the first are no-ops.
pub fn init(service_name: &str, config: &LoggingConfig, log_dir: Option<&str>) -> TelemetryGuard {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

        let console_layer = fmt::layer().with_target(true).with_thread_ids(true);
        let registry = tracing_subscriber::registry().with(filter).with(console_layer);

        if let Some(dir) = log_dir {
            let file_appender = tracing_appender::rolling::daily(dir, format!("{service_name}.log"));
            let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer().with_ansi(false).with_writer(non_blocking);
            registry.with(file_layer).init();
            let _ = FILE_GUARD.set(file_guard);
        } else {
            registry.init();
        }

        tracing::info!(service.name = service_name, "telemetry initialized");
    });

    TelemetryGuard(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_does_not_panic_without_file_sink() {
        let config = LoggingConfig::default();
        let _guard = init("mcp-test", &config, None);
        tracing::info!("hello from test");
    }
}
