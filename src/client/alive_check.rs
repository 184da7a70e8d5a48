//! Alive checking of zombie endpoints.
//!
//! # Responsibilities
//! - Periodically ping endpoints that failed a request
//! - Return them to rotation once they answer again
//!
//! Only zombies are probed; live endpoints are judged by real traffic.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::client::endpoint::Endpoint;
use crate::client::transport::Transport;
use crate::client::types::SearchRequest;

// Tokio intervals reject a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(10);

pub struct AliveCheck {
    endpoints: Vec<Arc<Endpoint>>,
    transport: Arc<Transport>,
    interval: Duration,
}

impl AliveCheck {
    pub fn new(endpoints: Vec<Arc<Endpoint>>, transport: Arc<Transport>, interval: Duration) -> Self {
        Self {
            endpoints,
            transport,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::debug!(
            interval_ms = self.interval.as_millis() as u64,
            endpoints = self.endpoints.len(),
            "Alive check starting"
        );

        let start = time::Instant::now() + self.interval;
        let mut ticker = time::interval_at(start, self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.transport.is_closed() {
                        break;
                    }
                    self.check_zombies().await;
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Alive check received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn check_zombies(&self) {
        let ping = SearchRequest::ping();

        for endpoint in self.endpoints.iter().filter(|e| !e.is_alive()) {
            match self.transport.execute(&endpoint.url, &ping).await {
                Ok(_) => {
                    if endpoint.mark_alive() {
                        tracing::info!(endpoint = %endpoint.url, "Endpoint is alive again");
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        endpoint = %endpoint.url,
                        error = %e,
                        failures = endpoint.consecutive_failures(),
                        "Alive check failed"
                    );
                    endpoint.mark_zombie();
                }
            }
        }
    }
}
