//! Shared target liveness map.
//!
//! Written by the health checker, read by the load balancer. A target that
//! has never been probed is reported unhealthy.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct HealthRegistry {
    targets: Mutex<HashMap<String, bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a probe. Returns the previous state, if any.
    pub fn set(&self, target: &str, healthy: bool) -> Option<bool> {
        let mut targets = self.targets.lock().expect("health registry mutex poisoned");
        targets.insert(target.to_string(), healthy)
    }

    pub fn is_healthy(&self, target: &str) -> bool {
        let targets = self.targets.lock().expect("health registry mutex poisoned");
        targets.get(target).copied().unwrap_or(false)
    }

    /// The members of `candidates` currently marked healthy, order preserved.
    pub fn healthy_subset<'a>(&self, candidates: &'a [String]) -> Vec<&'a String> {
        let targets = self.targets.lock().expect("health registry mutex poisoned");
        candidates
            .iter()
            .filter(|t| targets.get(t.as_str()).copied().unwrap_or(false))
            .collect()
    }

    /// Point-in-time copy of every known target.
    pub fn snapshot(&self) -> HashMap<String, bool> {
        self.targets.lock().expect("health registry mutex poisoned").clone()
    }
}
