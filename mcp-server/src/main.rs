//! Binary entry point: load config, init telemetry, bootstrap every
//! component, then hand off to the lifecycle runner (spec §4.J).

use mcp_config::Config;
use mcp_server::state::AppComponents;
use std::path::PathBuf;

fn config_path() -> Option<PathBuf> {
    std::env::var("MCP_CONFIG_PATH").ok().map(PathBuf::from)
}

/// Exit code 2 ("unhandled runtime panic", spec §6) for panics that
/// escape every `catch_unwind` boundary in the dispatcher/transports.
/// `process::exit` from inside the hook terminates before the default
/// 101 unwind-abort exit code would otherwise apply.
fn install_panic_exit_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_hook(info);
        std::process::exit(2);
    }));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    install_panic_exit_hook();

    let path = config_path();
    let config = match Config::load(path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fatal startup error: {err}");
            std::process::exit(1);
        }
    };
    let _telemetry_guard =
        mcp_telemetry::init("mcp-server", &config.logging, config.logging.directory.as_deref());

    if hot_reload_requested() {
        match path {
            Some(path) => match mcp_config::reload::ConfigWatcher::spawn(path.clone(), config.clone()) {
                Ok(watcher) => {
                    tracing::info!(path = %path.display(), "config hot-reload enabled");
                    tokio::spawn(watch_config_reloads(watcher));
                }
                Err(err) => tracing::warn!(error = %err, "failed to start config file watcher"),
            },
            None => tracing::warn!("CONFIG_HOT_RELOAD set but MCP_CONFIG_PATH is unset, ignoring"),
        }
    }

    let components = AppComponents::bootstrap(config);
    if let Err(err) = mcp_server::lifecycle::run(components).await {
        tracing::error!(error = %err, "fatal startup error");
        std::process::exit(1);
    }
    Ok(())
}

fn hot_reload_requested() -> bool {
    std::env::var("CONFIG_HOT_RELOAD").ok().and_then(|v| v.parse().ok()).unwrap_or(false)
}

/// Logs each validated reload. Components are constructed once at
/// startup (spec §9) and are not hot-swapped; the watcher only keeps a
/// revalidated snapshot available for introspection.
async fn watch_config_reloads(mut watcher: mcp_config::reload::ConfigWatcher) {
    loop {
        if watcher.rx.changed().await.is_err() {
            break;
        }
        let reloaded = watcher.current();
        tracing::info!(rate_limit_rps = reloaded.api.rate_limit_rps, "config file reload applied");
    }
}
