//! Per-client token bucket rate limiting.
//!
//! One mutex guards the client map. An admission holds it for the lookup or
//! insert plus that one record's refill and debit, which serialises
//! admissions for the same client. It is never held across an await.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::schema::RateLimitConfig;
use crate::error::ProxyError;
use crate::observability::metrics;

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = self.last_update.max(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
struct ClientRecord {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Admission control keyed by client identity.
///
/// Every client gets its own bucket with the same capacity and refill rate.
/// Records idle longer than the TTL are dropped by [`RateLimiter::evict_idle`].
#[derive(Debug)]
pub struct RateLimiter {
    clients: Mutex<HashMap<String, ClientRecord>>,
    capacity: f64,
    refill_rate: f64,
    idle_ttl: Duration,
    sweep_interval: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            capacity: config.burst_size as f64,
            refill_rate: config.requests_per_second,
            idle_ttl: Duration::from_secs(config.idle_ttl_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
        }
    }

    /// Consume a token for `client`. Returns false, consuming nothing, when
    /// the bucket is empty.
    pub fn admit(&self, client: &str) -> bool {
        self.admit_at(client, Instant::now())
    }

    pub fn admit_at(&self, client: &str, now: Instant) -> bool {
        let mut clients = self.clients.lock().expect("rate limiter mutex poisoned");
        let record = clients
            .entry(client.to_string())
            .or_insert_with(|| ClientRecord {
                bucket: TokenBucket::new(self.capacity, now),
                last_seen: now,
            });

        record.last_seen = record.last_seen.max(now);
        record.bucket.try_acquire(self.capacity, self.refill_rate, now)
    }

    /// Drop every client idle longer than the TTL. Returns how many were removed.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    pub fn evict_idle_at(&self, now: Instant) -> usize {
        let mut clients = self.clients.lock().expect("rate limiter mutex poisoned");
        let before = clients.len();
        clients.retain(|_, record| now.saturating_duration_since(record.last_seen) <= self.idle_ttl);
        before - clients.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().expect("rate limiter mutex poisoned").len()
    }

    /// Periodic eviction sweep until shutdown.
    pub async fn run_eviction(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.sweep_interval.as_secs(),
            idle_ttl_secs = self.idle_ttl.as_secs(),
            "Rate limiter sweep starting"
        );

        let mut ticker = time::interval_at(
            time::Instant::now() + self.sweep_interval,
            self.sweep_interval,
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.evict_idle();
                    if evicted > 0 {
                        tracing::debug!(evicted, remaining = self.client_count(), "Evicted idle clients");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limiter sweep received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// Client identity: first `X-Forwarded-For` entry, else the peer IP.
pub fn client_id<B>(request: &Request<B>) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(client) = forwarded {
        return client.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_id(&request);

    if limiter.admit(&client) {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, "Rate limit exceeded");
        metrics::record_rate_limited();
        ProxyError::RateLimited { client }.into_response()
    }
}
