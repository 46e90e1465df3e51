//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Sleep interval
//!     → Probe every target of the current route snapshot, concurrently
//!     → Write each result to registry.rs
//!
//! Load balancer:
//!     → registry.rs (read healthy subset)
//! ```
//!
//! # Design Decisions
//! - One failed probe marks a target unhealthy; one success restores it
//! - Unprobed targets count as unhealthy
//! - Probes run outside the registry lock; only the write is locked

pub mod active;
pub mod registry;

pub use active::HealthMonitor;
pub use registry::HealthRegistry;
