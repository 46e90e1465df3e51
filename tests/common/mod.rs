//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::fs::{self, File};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Router,
};
use edge_proxy::{Proxy, ProxyConfig, Shutdown};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Clone)]
struct UpstreamState {
    name: &'static str,
    healthy: Arc<AtomicBool>,
    hits: Arc<AtomicUsize>,
}

/// A mock upstream that answers `/health` and echoes everything else.
///
/// The echo body is `"<name> <path?query>"`. The `Host`, `X-Forwarded-For`
/// and `Connection` headers it received come back as `x-seen-*` headers.
pub struct Upstream {
    pub addr: SocketAddr,
    healthy: Arc<AtomicBool>,
    hits: Arc<AtomicUsize>,
}

impl Upstream {
    pub async fn start(name: &'static str) -> Self {
        let state = UpstreamState {
            name,
            healthy: Arc::new(AtomicBool::new(true)),
            hits: Arc::new(AtomicUsize::new(0)),
        };
        let healthy = state.healthy.clone();
        let hits = state.hits.clone();

        let app = Router::new()
            .route("/health", get(health))
            .fallback(echo)
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, healthy, hits }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Proxied requests served, excluding health probes.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn health(State(state): State<UpstreamState>) -> StatusCode {
    if state.healthy.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn echo(State(state): State<UpstreamState>, uri: Uri, headers: HeaderMap) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let mut seen = HeaderMap::new();
    for (name, copy) in [
        ("host", "x-seen-host"),
        ("x-forwarded-for", "x-seen-forwarded-for"),
        ("connection", "x-seen-connection"),
        ("authorization", "x-seen-authorization"),
    ] {
        if let Some(value) = headers.get(name) {
            seen.insert(copy, value.clone());
        }
    }

    let body = match uri.path_and_query() {
        Some(pq) => format!("{} {}", state.name, pq),
        None => format!("{} {}", state.name, uri.path()),
    };
    (seen, body)
}

/// A URL nothing is listening on.
pub async fn dead_target() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// A running proxy bound to an ephemeral port.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub proxy_health: Arc<edge_proxy::health::HealthRegistry>,
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

impl RunningProxy {
    pub async fn start(config: ProxyConfig, config_file: Option<&Path>) -> Self {
        let mut proxy = Proxy::new(config);
        if let Some(path) = config_file {
            proxy = proxy.with_config_file(path);
        }
        let proxy_health = proxy.health().clone();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let handle = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                proxy.serve(listener, shutdown).await.unwrap();
            }
        });

        Self {
            addr,
            proxy_health,
            shutdown,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("proxy should stop")
            .unwrap();
    }
}

/// An HTTP client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Base config for tests: no health checks, no rate limiting, fast reloads.
pub fn test_config(routes_toml: &str) -> ProxyConfig {
    let mut config: ProxyConfig = toml::from_str(routes_toml).unwrap();
    config.health_check.enabled = false;
    config.rate_limit.enabled = false;
    config.reload.poll_interval_ms = 50;
    config
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn eventually<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    check()
}

/// A config file in the temp directory, removed on drop.
pub struct TempConfig {
    pub path: PathBuf,
}

impl TempConfig {
    pub fn new(content: &str) -> Self {
        let path = std::env::temp_dir().join(format!("edge-proxy-it-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, content).unwrap();
        Self { path }
    }

    /// Rewrite the file and push its mtime forward so the change is always seen.
    pub fn update(&self, content: &str, bump_secs: u64) {
        fs::write(&self.path, content).unwrap();
        let file = File::options().write(true).open(&self.path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(bump_secs))
            .unwrap();
    }
}

impl Drop for TempConfig {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
