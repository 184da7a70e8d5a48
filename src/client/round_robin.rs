//! Round-robin endpoint selection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::client::endpoint::Endpoint;

/// Round-robin selector.
/// Stores an internal counter to rotate through endpoints.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every endpoint in the order a request should try them: alive ones
    /// starting at the rotation point, then zombies as a last resort.
    pub fn attempt_order(&self, endpoints: &[Arc<Endpoint>]) -> Vec<Arc<Endpoint>> {
        if endpoints.is_empty() {
            return Vec::new();
        }

        let start = self.counter.fetch_add(1, Ordering::Relaxed);
        let len = endpoints.len();
        let rotated = (0..len).map(|i| &endpoints[(start + i) % len]);

        let (alive, zombies): (Vec<_>, Vec<_>) = rotated.cloned().partition(|e| e.is_alive());
        alive.into_iter().chain(zombies).collect()
    }
}
