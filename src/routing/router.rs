//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Take one snapshot of the route table per request
//! - Find the first matching route, enforce its credentials
//! - Pick the target: balanced pool, or the single target
//!
//! # Design Decisions
//! - The whole decision uses one snapshot, so a concurrent reload can never
//!   mix routes from two tables
//! - Explicit NoMatch rather than silent default

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::config::schema::Route;
use crate::error::ProxyError;
use crate::load_balancer::LoadBalancer;
use crate::routing::matcher::match_index;
use crate::routing::table::RouteTable;
use crate::security::auth::authorize;

/// Outcome of a successful route decision.
#[derive(Debug, Clone)]
pub struct Dispatch {
    snapshot: Arc<Vec<Route>>,
    index: usize,
    pub target: String,
}

impl Dispatch {
    pub fn route(&self) -> &Route {
        &self.snapshot[self.index]
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    routes: Arc<RouteTable>,
    balancer: Arc<dyn LoadBalancer>,
}

impl Router {
    pub fn new(routes: Arc<RouteTable>, balancer: Arc<dyn LoadBalancer>) -> Self {
        Self { routes, balancer }
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    /// Decide where a request for `path` goes.
    pub fn resolve(&self, path: &str, headers: &HeaderMap) -> Result<Dispatch, ProxyError> {
        let snapshot = self.routes.snapshot();
        let no_route = || ProxyError::NoRoute {
            path: path.to_string(),
        };

        let index = match_index(&snapshot, path).ok_or_else(no_route)?;
        let route = &snapshot[index];

        authorize(route, headers)?;

        let target = if route.targets.is_empty() {
            route.single_target().map(str::to_string)
        } else {
            self.balancer.next_target(&route.path, &route.targets)
        }
        .ok_or_else(no_route)?;

        Ok(Dispatch {
            snapshot,
            index,
            target,
        })
    }
}
