//! The published route table.
//!
//! # Design Decisions
//! - Backed by `ArcSwap`: readers take a snapshot without blocking each other
//!   or the writer, and a swap replaces the whole list at once
//! - A snapshot stays valid for the request that took it even if a reload
//!   publishes a new table mid-flight

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::schema::Route;

/// Atomically replaceable, ordered list of routes.
#[derive(Debug)]
pub struct RouteTable {
    routes: ArcSwap<Vec<Route>>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes: ArcSwap::from_pointee(routes),
        }
    }

    /// Immutable view of the current routes.
    pub fn snapshot(&self) -> Arc<Vec<Route>> {
        self.routes.load_full()
    }

    /// Publish a new route list, replacing the old one wholesale.
    pub fn replace(&self, routes: Vec<Route>) {
        self.routes.store(Arc::new(routes));
    }

    /// Distinct upstreams referenced by the current routes, first-seen order.
    pub fn targets(&self) -> Vec<String> {
        let snapshot = self.snapshot();
        let mut seen = std::collections::HashSet::new();
        snapshot
            .iter()
            .flat_map(|route| route.upstreams())
            .filter(|target| seen.insert(*target))
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
