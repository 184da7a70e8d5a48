//! Client-side load-balanced client.
//!
//! # Data Flow
//! ```text
//! request
//!     → round_robin.rs (alive endpoints in rotation, zombies last)
//!     → transport.rs (send to endpoint)
//!     → on retryable failure: mark zombie, try next endpoint
//!     → alive_check.rs (background ping of zombies, started on first failure)
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::client::alive_check::AliveCheck;
use crate::client::endpoint::Endpoint;
use crate::client::round_robin::RoundRobin;
use crate::client::transport::{parse_endpoint, HttpSettings, Transport};
use crate::client::types::{ClientError, ClientResult, SearchRequest};
use crate::lifecycle::Shutdown;

/// Settings of a load-balanced client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LbSettings {
    pub http: HttpSettings,
    pub alive_check_interval: Duration,
}

impl Default for LbSettings {
    fn default() -> Self {
        Self {
            http: HttpSettings::default(),
            alive_check_interval: Duration::from_secs(60),
        }
    }
}

/// Round-robins requests over a fixed endpoint set.
#[derive(Debug)]
pub struct LbSearchClient {
    endpoints: Vec<Arc<Endpoint>>,
    balancer: RoundRobin,
    transport: Arc<Transport>,
    alive_check_interval: Duration,
    alive_check: Mutex<Option<JoinHandle<()>>>,
    shutdown: Shutdown,
}

impl LbSearchClient {
    pub fn new(urls: &[String], settings: LbSettings) -> ClientResult<Self> {
        if urls.is_empty() {
            return Err(ClientError::MissingEndpoints);
        }

        let endpoints = urls
            .iter()
            .map(|raw| parse_endpoint(raw).map(|url| Arc::new(Endpoint::new(url))))
            .collect::<ClientResult<Vec<_>>>()?;

        Ok(Self {
            endpoints,
            balancer: RoundRobin::new(),
            transport: Arc::new(Transport::new(settings.http)?),
            alive_check_interval: settings.alive_check_interval,
            alive_check: Mutex::new(None),
            shutdown: Shutdown::new(),
        })
    }

    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    pub fn settings(&self) -> &HttpSettings {
        self.transport.settings()
    }

    pub fn alive_check_interval(&self) -> Duration {
        self.alive_check_interval
    }

    /// Send `request` to the first endpoint that answers.
    ///
    /// Non-retryable failures (client errors, bad requests) are returned
    /// immediately; they would fail on every endpoint alike.
    pub async fn request(&self, request: &SearchRequest) -> ClientResult<Value> {
        let order = self.balancer.attempt_order(&self.endpoints);
        let tried = order.len();
        let mut last = None;

        for endpoint in order {
            match self.transport.execute(&endpoint.url, request).await {
                Ok(value) => {
                    if endpoint.mark_alive() {
                        tracing::info!(endpoint = %endpoint.url, "Endpoint is alive again");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(endpoint = %endpoint.url, error = %e, "Request failed, trying next endpoint");
                    if endpoint.mark_zombie() {
                        self.ensure_alive_check();
                    }
                    last = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(ClientError::NoLiveEndpoints {
            tried,
            last: Box::new(last.unwrap_or(ClientError::MissingEndpoints)),
        })
    }

    /// Start the alive check unless one is already running.
    fn ensure_alive_check(&self) {
        if self.transport.is_closed() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime available, zombie endpoints will not be re-checked");
            return;
        };

        let mut slot = match self.alive_check.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let check = AliveCheck::new(
            self.endpoints.clone(),
            self.transport.clone(),
            self.alive_check_interval,
        );
        *slot = Some(runtime.spawn(check.run(self.shutdown.subscribe())));
    }

    pub fn close(&self) -> ClientResult<()> {
        self.transport.close()?;
        self.shutdown.trigger();
        Ok(())
    }
}
