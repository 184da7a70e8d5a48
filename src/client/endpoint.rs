//! Endpoint abstraction for load-balanced clients.
//!
//! # Responsibilities
//! - Represent a single search endpoint URL
//! - Track liveness (Alive / Zombie) for round-robin selection
//! - Count consecutive failures for diagnostics

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use url::Url;

use crate::observability::metrics;

/// Liveness of an endpoint.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Unknown = 0,
    Alive = 1,
    Zombie = 2,
}

impl From<u8> for EndpointState {
    fn from(val: u8) -> Self {
        match val {
            1 => EndpointState::Alive,
            2 => EndpointState::Zombie,
            _ => EndpointState::Unknown,
        }
    }
}

/// A single endpoint of a load-balanced client.
#[derive(Debug)]
pub struct Endpoint {
    pub url: Url,
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
}

impl Endpoint {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            state: AtomicU8::new(EndpointState::Unknown as u8),
            consecutive_failures: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> EndpointState {
        EndpointState::from(self.state.load(Ordering::Relaxed))
    }

    /// Unknown endpoints are treated as alive until a request fails.
    pub fn is_alive(&self) -> bool {
        self.state() != EndpointState::Zombie
    }

    pub fn consecutive_failures(&self) -> usize {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Record a successful request or check. Returns true if the endpoint
    /// was a zombie and has been revived.
    pub fn mark_alive(&self) -> bool {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let previous = self.state.swap(EndpointState::Alive as u8, Ordering::Relaxed);
        let revived = previous == EndpointState::Zombie as u8;
        if revived {
            metrics::record_endpoint_alive(self.url.as_str(), true);
        }
        revived
    }

    /// Record a failed request or check. Returns true if the endpoint has
    /// just become a zombie.
    pub fn mark_zombie(&self) -> bool {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        let previous = self.state.swap(EndpointState::Zombie as u8, Ordering::Relaxed);
        let died = previous != EndpointState::Zombie as u8;
        if died {
            metrics::record_endpoint_alive(self.url.as_str(), false);
        }
        died
    }
}
