//! Route matching logic.
//!
//! # Design Decisions
//! - Path matching is a case-sensitive prefix test
//! - Routes are scanned in list order and the first match wins; a general
//!   prefix listed before a specific one shadows it
//! - Routes without any upstream never match

use crate::config::schema::Route;

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

impl From<&Route> for PathPrefixMatcher {
    fn from(route: &Route) -> Self {
        Self::new(route.path.as_str())
    }
}

/// Position of the first reachable route whose prefix matches `path`.
pub fn match_index(routes: &[Route], path: &str) -> Option<usize> {
    routes
        .iter()
        .position(|route| route.is_reachable() && PathPrefixMatcher::from(route).matches(path))
}

/// Find the first reachable route whose prefix matches `path`.
pub fn match_route<'a>(routes: &'a [Route], path: &str) -> Option<&'a Route> {
    match_index(routes, path).map(|index| &routes[index])
}
