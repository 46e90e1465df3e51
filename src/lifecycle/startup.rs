//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the shared state (route table, health registry, rate limiter)
//! - Bind the listener
//! - Start background tasks (config watcher, health checks, limiter sweep)
//!   and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: an unusable config or bind address is fatal
//! - The metrics endpoint is optional; failing to start it only logs
//! - Shared state exists before the bind; background tasks start only after
//!   it succeeds, so a bind failure leaves nothing running

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::{log_route_warnings, ConfigWatcher, ProxyConfig};
use crate::health::{HealthMonitor, HealthRegistry};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::load_balancer::RoundRobin;
use crate::observability::metrics;
use crate::routing::{RouteTable, Router};
use crate::security::RateLimiter;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// A fully wired proxy, ready to serve.
pub struct Proxy {
    config: ProxyConfig,
    config_path: Option<PathBuf>,
    routes: Arc<RouteTable>,
    health: Arc<HealthRegistry>,
    limiter: Option<Arc<RateLimiter>>,
}

impl Proxy {
    pub fn new(config: ProxyConfig) -> Self {
        let routes = Arc::new(RouteTable::new(config.routes.clone()));
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::new(&config.rate_limit)));

        Self {
            config,
            config_path: None,
            routes,
            health: Arc::new(HealthRegistry::new()),
            limiter,
        }
    }

    /// Hot-reload routes from `path` while serving (if reload is enabled).
    pub fn with_config_file(mut self, path: &Path) -> Self {
        self.config_path = Some(path.to_path_buf());
        self
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    pub fn health(&self) -> &Arc<HealthRegistry> {
        &self.health
    }

    /// An HTTP server sharing this proxy's state.
    pub fn http_server(&self) -> HttpServer {
        let balancer = Arc::new(RoundRobin::new(self.health.clone()));
        HttpServer::new(
            Router::new(self.routes.clone(), balancer),
            self.limiter.clone(),
        )
    }

    /// Spawn the background loops. Each one exits on `shutdown`.
    pub fn spawn_background(&self, shutdown: &Shutdown) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();

        match &self.config_path {
            Some(path) if self.config.reload.enabled => {
                let watcher = ConfigWatcher::new(
                    path,
                    self.routes.clone(),
                    Duration::from_millis(self.config.reload.poll_interval_ms),
                );
                tasks.push(tokio::spawn(watcher.run(shutdown.subscribe())));
            }
            _ => tracing::info!("Config hot reload disabled"),
        }

        let monitor = HealthMonitor::new(
            self.routes.clone(),
            self.health.clone(),
            self.config.health_check.clone(),
        );
        tasks.push(tokio::spawn(monitor.run(shutdown.subscribe())));

        if let Some(limiter) = &self.limiter {
            tasks.push(tokio::spawn(limiter.clone().run_eviction(shutdown.subscribe())));
        }

        tasks
    }

    /// Serve on `listener` until `shutdown` fires, then wait for every
    /// background task to stop.
    pub async fn serve(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), StartupError> {
        let server_shutdown = shutdown.subscribe();
        let tasks = self.spawn_background(&shutdown);

        let result = self.http_server().run(listener, server_shutdown).await;

        // The server may have stopped on its own error.
        shutdown.trigger();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Background task failed");
            }
        }

        tracing::info!("Shutdown complete");
        result.map_err(StartupError::Serve)
    }
}

/// Run the proxy for a loaded config until SIGINT/SIGTERM.
pub async fn run(config: ProxyConfig, config_path: &Path) -> Result<(), StartupError> {
    log_route_warnings(&config.routes);

    if let Some(address) = &config.observability.metrics_address {
        match address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %address,
                "Failed to parse metrics address"
            ),
        }
    }

    let proxy = Proxy::new(config).with_config_file(config_path);
    let listener = bind(&proxy.config().listener.bind_address).await?;

    tracing::info!(
        address = %listener.local_addr()?,
        routes = proxy.routes().len(),
        rate_limit = proxy.config().rate_limit.enabled,
        health_checks = proxy.config().health_check.enabled,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown.clone().trigger_on_signal());

    proxy.serve(listener, shutdown).await
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Route;

    fn config(rate_limit: bool) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.routes = vec![Route::to_target("/api", "http://127.0.0.1:9")];
        config.rate_limit.enabled = rate_limit;
        config.health_check.enabled = false;
        config
    }

    #[test]
    fn test_new_publishes_routes() {
        let proxy = Proxy::new(config(true));
        assert_eq!(proxy.routes().len(), 1);
        assert!(proxy.limiter.is_some());
        assert!(Proxy::new(config(false)).limiter.is_none());
    }

    #[tokio::test]
    async fn test_background_tasks_stop_on_shutdown() {
        let proxy = Proxy::new(config(true)).with_config_file(Path::new("/nonexistent.toml"));
        let shutdown = Shutdown::new();

        let tasks = proxy.spawn_background(&shutdown);
        assert_eq!(tasks.len(), 3);

        shutdown.trigger();
        for task in tasks {
            tokio::time::timeout(Duration::from_secs(1), task)
                .await
                .expect("task should stop on shutdown")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_bind_failure_is_fatal() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = config(false);
        config.listener.bind_address = taken.local_addr().unwrap().to_string();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            run(config, Path::new("/nonexistent.toml")),
        )
        .await
        .expect("run should fail without serving");

        assert!(matches!(result, Err(StartupError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_serve_returns_after_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(Proxy::new(config(false)).serve(listener, shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("serve should return")
            .unwrap();
        assert!(result.is_ok());
    }
}
