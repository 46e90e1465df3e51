//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client token bucket, 429 on empty)
//!     → routing (match)
//!     → auth.rs (Basic credentials for gated routes, 401 on mismatch)
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-For)
//! ```

pub mod auth;
pub mod headers;
pub mod rate_limit;

pub use rate_limit::RateLimiter;
