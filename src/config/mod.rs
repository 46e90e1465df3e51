//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (settings errors, route warnings)
//!     → ProxyConfig (validated, immutable)
//!     → routes published into routing::RouteTable
//!
//! While running:
//!     watcher.rs polls the file's mtime
//!     → loader.rs loads new config
//!     → on success: atomic swap of the route list
//!     → on failure: log, keep serving the last good table
//! ```
//!
//! # Design Decisions
//! - Only `routes` is hot-reloaded; settings need a restart
//! - All settings have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, log_route_warnings, ConfigError};
pub use schema::{
    Credentials, HealthCheckConfig, ListenerConfig, ObservabilityConfig, ProxyConfig,
    RateLimitConfig, ReloadConfig, Route,
};
pub use watcher::ConfigWatcher;
