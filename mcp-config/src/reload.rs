//! Optional file-watch hot-reload (`CONFIG_HOT_RELOAD=1`, spec §4.A).

use crate::Config;
use notify::{RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Watches `path` for changes and publishes newly-validated snapshots on
/// `rx`. Invalid edits are logged and ignored; the previous snapshot
/// remains current.
pub struct ConfigWatcher {
    pub rx: watch::Receiver<Arc<Config>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl ConfigWatcher {
    pub fn spawn(path: PathBuf, initial: Config) -> Result<Self, notify::Error> {
        let (tx, rx) = watch::channel(Arc::new(initial));
        let (notify_tx, mut notify_rx) = tokio::sync::mpsc::channel(16);

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.blocking_send(res);
        })?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        let handle = tokio::spawn(async move {
            // Keep the watcher alive for the lifetime of the task.
            let _watcher = watcher;
            loop {
                let Some(event) = notify_rx.recv().await else { break };
                if event.is_err() {
                    continue;
                }
                // Debounce: coalesce bursts of fs events into one reload.
                tokio::time::sleep(Duration::from_secs(1)).await;
                while notify_rx.try_recv().is_ok() {}

                match Config::load(Some(&path)) {
                    Ok(new_config) => {
                        tracing::info!(path = %path.display(), "config reloaded");
                        let _ = tx.send(Arc::new(new_config));
                    }
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "config reload failed, keeping previous snapshot");
                    }
                }
            }
        });

        Ok(Self { rx, _handle: handle })
    }

    pub fn current(&self) -> Arc<Config> {
        self.rx.borrow().clone()
    }
}
