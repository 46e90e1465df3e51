//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every target referenced by the current route table
//! - Update the health registry from each probe result

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, Uri};
use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::schema::HealthCheckConfig;
use crate::health::registry::HealthRegistry;
use crate::http::forward::{upstream_client, UpstreamClient};
use crate::observability::metrics;
use crate::routing::RouteTable;

pub struct HealthMonitor {
    routes: Arc<RouteTable>,
    registry: Arc<HealthRegistry>,
    config: HealthCheckConfig,
    client: UpstreamClient,
}

impl HealthMonitor {
    pub fn new(
        routes: Arc<RouteTable>,
        registry: Arc<HealthRegistry>,
        config: HealthCheckConfig,
    ) -> Self {
        Self {
            routes,
            registry,
            config,
            client: upstream_client(),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            "Health monitor starting"
        );

        let interval = Duration::from_secs(self.config.interval_secs);

        loop {
            tokio::select! {
                _ = self.check_all() => {}
                _ = shutdown.recv() => break,
            }

            // Full pause after every cycle, however long the cycle took.
            tokio::select! {
                _ = time::sleep(interval) => {}
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("Health monitor received shutdown signal, exiting loop");
    }

    /// Run one probe cycle over the targets of the current route snapshot.
    pub async fn check_all(&self) {
        let targets = self.routes.targets();
        tracing::debug!(count = targets.len(), "Probing targets");

        join_all(targets.iter().map(|target| async move {
            let healthy = self.probe(target).await;
            self.record(target, healthy);
        }))
        .await;
    }

    async fn probe(&self, target: &str) -> bool {
        let uri = match probe_uri(target, &self.config.path) {
            Some(uri) => uri,
            None => {
                tracing::warn!(target = %target, "Health check skipped: invalid target URL");
                return false;
            }
        };

        let request = match Request::builder()
            .method("GET")
            .uri(uri)
            .header("user-agent", "edge-proxy-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!("Failed to build health check request: {}", e);
                return false;
            }
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let ok = response.status() == StatusCode::OK;
                if !ok {
                    tracing::warn!(target = %target, status = %response.status(), "Health check failed: non-200 status");
                }
                ok
            }
            Ok(Err(e)) => {
                tracing::warn!(target = %target, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(target = %target, "Health check failed: timeout");
                false
            }
        }
    }

    fn record(&self, target: &str, healthy: bool) {
        let previous = self.registry.set(target, healthy);
        if previous != Some(healthy) {
            tracing::info!(target = %target, healthy, "Target health changed");
        }
        metrics::record_target_health(target, healthy);
    }
}

/// `<target><path>`, tolerating a trailing slash on the target.
fn probe_uri(target: &str, path: &str) -> Option<Uri> {
    let uri: Uri = format!("{}{}", target.trim_end_matches('/'), path).parse().ok()?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return None;
    }
    Some(uri)
}
