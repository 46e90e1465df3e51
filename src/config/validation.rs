//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation of settings (serde handles syntactic)
//! - Flag routes that can never be served
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Route problems are warnings: the table is served exactly as written,
//!   first prefix match wins, so a shadowed route is reported but kept

use std::fmt;

use crate::config::schema::{ProxyConfig, Route};

/// A setting that makes the configuration unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A route that is accepted but will not behave as its author likely expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteWarning {
    /// Neither `target` nor `targets` is set.
    Unreachable { index: usize, path: String },
    /// An earlier route has the same path.
    Duplicate { index: usize, first: usize, path: String },
    /// An earlier route's prefix already captures every request for this one.
    Shadowed { index: usize, by: usize, path: String, prefix: String },
}

impl fmt::Display for RouteWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteWarning::Unreachable { index, path } => {
                write!(f, "route #{} ({}) has no target and will never match", index, path)
            }
            RouteWarning::Duplicate { index, first, path } => {
                write!(f, "route #{} duplicates path {} of route #{}", index, path, first)
            }
            RouteWarning::Shadowed { index, by, path, prefix } => write!(
                f,
                "route #{} ({}) is shadowed by route #{} ({})",
                index, path, by, prefix
            ),
        }
    }
}

/// Validate process settings.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let rps = config.rate_limit.requests_per_second;
    if !(rps.is_finite() && rps > 0.0) {
        errors.push(ValidationError {
            field: "rate_limit.requests_per_second",
            message: format!("must be a positive number, got {}", rps),
        });
    }
    if config.rate_limit.burst_size == 0 {
        errors.push(ValidationError {
            field: "rate_limit.burst_size",
            message: "must be at least 1".to_string(),
        });
    }
    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError {
            field: "rate_limit.sweep_interval_secs",
            message: "must be greater than 0".to_string(),
        });
    }
    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError {
            field: "health_check.interval_secs",
            message: "must be greater than 0".to_string(),
        });
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError {
            field: "health_check.timeout_secs",
            message: "must be greater than 0".to_string(),
        });
    }
    if config.reload.poll_interval_ms == 0 {
        errors.push(ValidationError {
            field: "reload.poll_interval_ms",
            message: "must be greater than 0".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Collect warnings for routes that cannot be reached as configured.
pub fn route_warnings(routes: &[Route]) -> Vec<RouteWarning> {
    let mut warnings = Vec::new();

    for (index, route) in routes.iter().enumerate() {
        if !route.is_reachable() {
            warnings.push(RouteWarning::Unreachable {
                index,
                path: route.path.clone(),
            });
            continue;
        }

        let earlier = routes[..index]
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_reachable())
            .find(|(_, r)| route.path.starts_with(&r.path));

        if let Some((by, r)) = earlier {
            if r.path == route.path {
                warnings.push(RouteWarning::Duplicate {
                    index,
                    first: by,
                    path: route.path.clone(),
                });
            } else {
                warnings.push(RouteWarning::Shadowed {
                    index,
                    by,
                    path: route.path.clone(),
                    prefix: r.path.clone(),
                });
            }
        }
    }

    warnings
}
