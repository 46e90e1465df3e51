//! Edge reverse proxy library.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──▶ http::server (request ID, trace span, rate limit)
//!         ──▶ routing::Router (first prefix match, Basic auth)
//!             ──▶ load_balancer::RoundRobin (healthy targets first)
//!                 ──▶ http::forward (rewrite, relay) ──▶ Upstream
//!
//!     Background:
//!         config::ConfigWatcher   polls the config file, swaps the route table
//!         health::HealthMonitor   probes <target>/health, feeds the registry
//!         security::RateLimiter   sweeps idle client records
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod routing;

pub mod health;
pub mod load_balancer;

pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::{Proxy, Shutdown};
