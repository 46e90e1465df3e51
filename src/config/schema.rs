//! Configuration schema definitions.
//!
//! One TOML document carries both the hot-reloadable route list and the
//! process settings. All settings sections default, so a file containing only
//! `[[routes]]` entries is a complete configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route definitions, evaluated in list order.
    pub routes: Vec<Route>,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Config file polling.
    pub reload: ReloadConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A path-prefix route to one or more upstream targets.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Route {
    /// Path prefix to match.
    pub path: String,

    /// Single upstream URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Upstream pool; takes precedence over `target` when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,

    /// Optional HTTP Basic gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Credentials>,

    /// Replacement for the matched path prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<String>,
}

impl Route {
    /// Route to a single upstream.
    pub fn to_target(path: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target: Some(target.into()),
            targets: Vec::new(),
            auth: None,
            rewrite: None,
        }
    }

    /// Route balanced across an upstream pool.
    pub fn to_targets<I, S>(path: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            target: None,
            targets: targets.into_iter().map(Into::into).collect(),
            auth: None,
            rewrite: None,
        }
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_rewrite(mut self, rewrite: impl Into<String>) -> Self {
        self.rewrite = Some(rewrite.into());
        self
    }

    /// The single `target`, ignoring an empty string.
    pub fn single_target(&self) -> Option<&str> {
        self.target.as_deref().filter(|t| !t.is_empty())
    }

    /// Whether the route can ever forward a request.
    pub fn is_reachable(&self) -> bool {
        !self.targets.is_empty() || self.single_target().is_some()
    }

    /// Every upstream this route may forward to, in configured order.
    pub fn upstreams(&self) -> Vec<&str> {
        if !self.targets.is_empty() {
            self.targets.iter().map(String::as_str).collect()
        } else {
            self.single_target().into_iter().collect()
        }
    }

    /// The rewrite prefix, ignoring an empty string.
    pub fn rewrite_prefix(&self) -> Option<&str> {
        self.rewrite.as_deref().filter(|r| !r.is_empty())
    }
}

/// Username/password pair compared against HTTP Basic credentials.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Pause between probe cycles in seconds.
    pub interval_secs: u64,

    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,

    /// Path appended to each target for probing.
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            timeout_secs: 5,
            path: "/health".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Token refill rate per client.
    pub requests_per_second: f64,

    /// Burst capacity.
    pub burst_size: u32,

    /// Client records idle longer than this are evicted.
    pub idle_ttl_secs: u64,

    /// How often the eviction sweep runs.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 2.0,
            burst_size: 5,
            idle_ttl_secs: 180,
            sweep_interval_secs: 60,
        }
    }
}

/// Config file polling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Enable hot reload of the route list.
    pub enabled: bool,

    /// Modification-time poll interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 2000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Prometheus scrape endpoint; disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}
