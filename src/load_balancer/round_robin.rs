//! Health-aware round-robin strategy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::health::registry::HealthRegistry;
use crate::load_balancer::LoadBalancer;

/// Round-robin selector.
/// Keeps one cursor per route path, so routes sharing a path share rotation.
#[derive(Debug)]
pub struct RoundRobin {
    health: Arc<HealthRegistry>,
    cursors: Mutex<HashMap<String, usize>>,
}

impl RoundRobin {
    pub fn new(health: Arc<HealthRegistry>) -> Self {
        Self {
            health,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    /// Read and advance the cursor for `route_path`.
    fn advance(&self, route_path: &str) -> usize {
        let mut cursors = self.cursors.lock().expect("round robin mutex poisoned");
        let cursor = cursors.entry(route_path.to_string()).or_insert(0);
        let current = *cursor;
        *cursor = cursor.wrapping_add(1);
        current
    }
}

impl LoadBalancer for RoundRobin {
    fn next_target(&self, route_path: &str, targets: &[String]) -> Option<String> {
        if targets.is_empty() {
            return None;
        }

        // Health lock is released before the cursor lock is taken.
        let healthy = self.health.healthy_subset(targets);
        let candidates: Vec<&String> = if healthy.is_empty() {
            // No healthy target: rotate over the whole pool.
            targets.iter().collect()
        } else {
            healthy
        };

        let index = self.advance(route_path) % candidates.len();
        Some(candidates[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> Vec<String> {
        vec![
            "http://localhost:5001".to_string(),
            "http://localhost:5002".to_string(),
            "http://localhost:5003".to_string(),
        ]
    }

    #[test]
    fn test_round_robin() {
        let health = Arc::new(HealthRegistry::new());
        let targets = targets();
        for t in &targets {
            health.set(t, true);
        }
        let lb = RoundRobin::new(health);

        for i in 0..targets.len() * 3 {
            let selected = lb.next_target("/api", &targets).unwrap();
            assert_eq!(selected, targets[i % targets.len()], "iteration {}", i);
        }
    }

    #[test]
    fn test_unhealthy_targets_skipped() {
        let health = Arc::new(HealthRegistry::new());
        let targets = targets();
        health.set(&targets[0], true);
        health.set(&targets[1], false);
        health.set(&targets[2], true);
        let lb = RoundRobin::new(health);

        for _ in 0..10 {
            let selected = lb.next_target("/api", &targets).unwrap();
            assert_ne!(selected, targets[1]);
        }
    }

    #[test]
    fn test_all_unhealthy_falls_back() {
        let health = Arc::new(HealthRegistry::new());
        let targets = targets();
        for t in &targets {
            health.set(t, false);
        }
        let lb = RoundRobin::new(health);

        let picks: Vec<String> = (0..targets.len())
            .map(|_| lb.next_target("/api", &targets).unwrap())
            .collect();
        assert_eq!(picks, targets);
    }

    #[test]
    fn test_unknown_health_falls_back() {
        let lb = RoundRobin::new(Arc::new(HealthRegistry::new()));
        let selected = lb.next_target("/api", &targets()).unwrap();
        assert!(targets().contains(&selected));
    }

    #[test]
    fn test_empty_targets() {
        let lb = RoundRobin::new(Arc::new(HealthRegistry::new()));
        assert!(lb.next_target("/api", &[]).is_none());
    }

    #[test]
    fn test_cursor_is_per_path() {
        let health = Arc::new(HealthRegistry::new());
        let targets = targets();
        for t in &targets {
            health.set(t, true);
        }
        let lb = RoundRobin::new(health);

        assert_eq!(lb.next_target("/a", &targets).unwrap(), targets[0]);
        assert_eq!(lb.next_target("/a", &targets).unwrap(), targets[1]);
        assert_eq!(lb.next_target("/b", &targets).unwrap(), targets[0]);
        assert_eq!(lb.next_target("/a", &targets).unwrap(), targets[2]);
    }

    #[test]
    fn test_distribution_balances_across_health_flips() {
        let health = Arc::new(HealthRegistry::new());
        let targets = targets();
        for t in &targets {
            health.set(t, true);
        }
        let lb = RoundRobin::new(health.clone());
        let mut hits: HashMap<String, usize> = HashMap::new();

        for i in 0..300 {
            // Flap the middle target every 50 picks.
            health.set(&targets[1], (i / 50) % 2 == 0);
            let selected = lb.next_target("/api", &targets).unwrap();
            *hits.entry(selected).or_default() += 1;
        }

        for t in &targets {
            let count = hits.get(t).copied().unwrap_or(0);
            assert!(count >= 40, "{} only selected {} times", t, count);
        }
    }
}
