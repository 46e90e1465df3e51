//! Configuration file watcher for hot reload.
//!
//! Polls the file's modification time. When it advances, the file is
//! re-parsed and, only if that succeeds, its routes replace the published
//! table. Settings outside `routes` are read once at startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::broadcast;
use tokio::time;

use crate::config::loader::{load_config, log_route_warnings, ConfigError};
use crate::observability::metrics;
use crate::routing::RouteTable;

/// Result of a single poll.
#[derive(Debug)]
pub enum PollOutcome {
    Unchanged,
    Reloaded { routes: usize },
    Failed(ConfigError),
}

/// Watches the configuration file and republishes its routes.
pub struct ConfigWatcher {
    path: PathBuf,
    routes: Arc<RouteTable>,
    interval: Duration,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    /// Create a watcher for `path`.
    ///
    /// No baseline mtime is taken: the first poll always reloads, so an edit
    /// made between the initial load and the watcher's start is not lost.
    pub fn new(path: &Path, routes: Arc<RouteTable>, interval: Duration) -> Self {
        Self {
            path: path.to_path_buf(),
            routes,
            interval,
            last_modified: None,
        }
    }

    /// Check the file once, reloading if it changed.
    pub fn poll(&mut self) -> PollOutcome {
        let current = match modified(&self.path) {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Config file unreadable, keeping current routes");
                return PollOutcome::Failed(ConfigError::Io(e));
            }
        };

        if self.last_modified.is_some_and(|last| current <= last) {
            return PollOutcome::Unchanged;
        }

        // A broken file is not re-parsed until it changes again.
        self.last_modified = Some(current);
        tracing::info!(path = ?self.path, "Config file change detected, reloading...");

        match load_config(&self.path) {
            Ok(config) => {
                let count = config.routes.len();
                log_route_warnings(&config.routes);
                self.routes.replace(config.routes);
                metrics::record_config_reload("success");
                tracing::info!(routes = count, "Config reloaded");
                PollOutcome::Reloaded { routes: count }
            }
            Err(e) => {
                metrics::record_config_reload("failure");
                tracing::error!("Failed to reload config: {}. Keeping current configuration.", e);
                PollOutcome::Failed(e)
            }
        }
    }

    /// Poll on a fixed interval until shutdown.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            path = ?self.path,
            interval_ms = self.interval.as_millis() as u64,
            "Config watcher started"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Config watcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

fn modified(path: &Path) -> std::io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}
