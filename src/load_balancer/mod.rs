//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → route.targets
//!     → health registry (filter to healthy targets)
//!     → empty? fall back to the full list
//!     → round_robin.rs (per-path cursor modulo candidate count)
//!     → chosen target URL
//! ```
//!
//! # Design Decisions
//! - Health gating is binary; no weights, no connection counts
//! - Rotation is only eventually fair once the candidate set changes

pub mod round_robin;

pub use round_robin::RoundRobin;

/// Picks the upstream for one request.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Returns `None` only when `targets` is empty.
    fn next_target(&self, route_path: &str, targets: &[String]) -> Option<String>;
}
