//! Cluster-coordinated client.
//!
//! # Data Flow
//! ```text
//! request (collection or default collection)
//!     → collection cache (DashMap, refreshed after TTL, bounded refreshes)
//!         → coordinator: CLUSTERSTATUS via load-balanced coordinator endpoints
//!     → updates with update-to-leaders: shard leaders
//!         - commit/rollback: every leader (concurrently if parallel updates)
//!         - document updates: any leader, ids checked first
//!     → everything else: secondary load balancer if configured,
//!       otherwise a random active replica
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures_util::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use url::Url;

use crate::client::load_balanced::{LbSearchClient, LbSettings};
use crate::client::transport::{parse_endpoint, HttpSettings, Transport};
use crate::client::types::{ClientError, ClientResult, SearchRequest};

/// Settings of a cluster client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudSettings {
    /// Send updates to shard leaders.
    pub update_to_leaders: bool,
    pub default_collection: Option<String>,
    pub id_field: String,
    pub collection_cache_ttl: Duration,
    pub parallel_cache_refreshes: usize,
    pub parallel_updates: bool,
    pub coordinator_client_timeout: Option<Duration>,
    pub coordinator_connect_timeout: Option<Duration>,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            update_to_leaders: true,
            default_collection: None,
            id_field: "id".to_string(),
            collection_cache_ttl: Duration::from_secs(60),
            parallel_cache_refreshes: 3,
            parallel_updates: true,
            coordinator_client_timeout: Some(Duration::from_secs(10)),
            coordinator_connect_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Where a collection's replicas live, as last fetched from the coordinator.
#[derive(Debug, Clone)]
pub struct CollectionState {
    pub leaders: Vec<Url>,
    pub replicas: Vec<Url>,
    /// Shards whose leader is missing or not active.
    pub leaderless: Vec<String>,
    fetched_at: Instant,
}

impl CollectionState {
    /// Extract replica URLs from a CLUSTERSTATUS response.
    pub fn parse(collection: &str, status: &Value) -> ClientResult<Self> {
        let shards = status
            .get("cluster")
            .and_then(|c| c.get("collections"))
            .and_then(|c| c.get(collection))
            .and_then(|c| c.get("shards"))
            .and_then(Value::as_object)
            .ok_or_else(|| {
                ClientError::ClusterState(format!("collection '{}' not found", collection))
            })?;

        let mut leaders = Vec::new();
        let mut replicas = Vec::new();
        let mut leaderless = Vec::new();

        for (shard_id, shard) in shards {
            let shard_leaders = leaders.len();
            let shard_replicas = shard
                .get("replicas")
                .and_then(Value::as_object)
                .into_iter()
                .flat_map(|r| r.values());
            for replica in shard_replicas {
                let field = |name: &str| replica.get(name).and_then(Value::as_str);
                if field("state") != Some("active") {
                    continue;
                }
                let (Some(base_url), Some(core)) = (field("base_url"), field("core")) else {
                    continue;
                };
                let url = parse_endpoint(&format!("{}/{}", base_url.trim_end_matches('/'), core))?;
                if field("leader") == Some("true") {
                    leaders.push(url.clone());
                }
                replicas.push(url);
            }
            if leaders.len() == shard_leaders {
                leaderless.push(shard_id.clone());
            }
        }

        Ok(Self {
            leaders,
            replicas,
            leaderless,
            fetched_at: Instant::now(),
        })
    }

    /// One active leader per shard, or an error naming the first shard
    /// without one.
    pub fn shard_leaders(&self) -> ClientResult<&[Url]> {
        match self.leaderless.first() {
            Some(shard) => Err(ClientError::ClusterState(format!(
                "shard '{}' has no active leader",
                shard
            ))),
            None => Ok(&self.leaders),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Routes requests from cluster state fetched through coordinator endpoints.
pub struct CloudSearchClient {
    coordinator: LbSearchClient,
    load_balancer: Option<LbSearchClient>,
    replicas: Transport,
    settings: CloudSettings,
    collections: DashMap<String, Arc<CollectionState>>,
    refreshes: Semaphore,
}

impl CloudSearchClient {
    /// Build from the full coordinator endpoint set, each qualified by
    /// `chroot`.
    pub fn new(coordinators: &[String], chroot: Option<&str>, settings: CloudSettings) -> ClientResult<Self> {
        if coordinators.is_empty() {
            return Err(ClientError::MissingEndpoints);
        }
        let urls: Vec<String> = coordinators
            .iter()
            .map(|url| with_chroot(url, chroot))
            .collect();
        Self::assemble(&urls, None, settings)
    }

    /// Build around one coordinator endpoint and a secondary load-balanced
    /// client used for non-leader traffic.
    pub fn with_load_balancer(
        coordinator: &str,
        load_balancer: LbSearchClient,
        settings: CloudSettings,
    ) -> ClientResult<Self> {
        Self::assemble(&[coordinator.to_string()], Some(load_balancer), settings)
    }

    fn assemble(
        coordinators: &[String],
        load_balancer: Option<LbSearchClient>,
        settings: CloudSettings,
    ) -> ClientResult<Self> {
        let coordinator_settings = LbSettings {
            http: HttpSettings {
                connection_timeout: settings.coordinator_connect_timeout,
                socket_timeout: settings.coordinator_client_timeout,
                ..HttpSettings::default()
            },
            ..LbSettings::default()
        };

        Ok(Self {
            coordinator: LbSearchClient::new(coordinators, coordinator_settings)?,
            load_balancer,
            replicas: Transport::new(HttpSettings::default())?,
            refreshes: Semaphore::new(settings.parallel_cache_refreshes.max(1)),
            collections: DashMap::new(),
            settings,
        })
    }

    pub fn settings(&self) -> &CloudSettings {
        &self.settings
    }

    pub fn coordinator(&self) -> &LbSearchClient {
        &self.coordinator
    }

    pub fn load_balancer(&self) -> Option<&LbSearchClient> {
        self.load_balancer.as_ref()
    }

    /// Verify the coordinator answers, loading the default collection's
    /// state if one is configured.
    pub async fn connect(&self) -> ClientResult<()> {
        match &self.settings.default_collection {
            Some(collection) => {
                self.collection_state(collection).await?;
            }
            None => {
                self.coordinator.request(&SearchRequest::cluster_status(None)).await?;
            }
        }
        Ok(())
    }

    pub async fn request(&self, request: &SearchRequest) -> ClientResult<Value> {
        let collection = request
            .collection
            .clone()
            .or_else(|| self.settings.default_collection.clone())
            .ok_or(ClientError::NoDefaultCollection)?;

        if request.is_update() {
            self.check_ids(request)?;
        }

        if request.is_update() && self.settings.update_to_leaders {
            let state = self.collection_state(&collection).await?;
            let leaders = state.shard_leaders()?;
            if request.is_broadcast() {
                return self.broadcast(leaders, request).await;
            }
            return self.send_any(leaders, request).await;
        }

        match &self.load_balancer {
            Some(lb) => lb.request(&request.clone().in_collection(collection)).await,
            None => {
                let state = self.collection_state(&collection).await?;
                self.send_any(&state.replicas, request).await
            }
        }
    }

    /// Cached state of `collection`, refreshed once older than the TTL.
    pub async fn collection_state(&self, collection: &str) -> ClientResult<Arc<CollectionState>> {
        if let Some(state) = self.cached(collection) {
            return Ok(state);
        }

        let _permit = self.refreshes.acquire().await.map_err(|_| ClientError::Closed)?;
        // Another task may have refreshed while we waited.
        if let Some(state) = self.cached(collection) {
            return Ok(state);
        }

        let status = self
            .coordinator
            .request(&SearchRequest::cluster_status(Some(collection)))
            .await?;
        let state = Arc::new(CollectionState::parse(collection, &status)?);
        tracing::debug!(
            collection,
            leaders = state.leaders.len(),
            replicas = state.replicas.len(),
            "Collection state refreshed"
        );
        self.collections.insert(collection.to_string(), state.clone());
        Ok(state)
    }

    fn cached(&self, collection: &str) -> Option<Arc<CollectionState>> {
        self.collections
            .get(collection)
            .filter(|state| state.is_fresh(self.settings.collection_cache_ttl))
            .map(|state| state.value().clone())
    }

    fn check_ids(&self, request: &SearchRequest) -> ClientResult<()> {
        let Some(Value::Array(documents)) = &request.body else {
            return Ok(());
        };
        let id_field = &self.settings.id_field;
        if documents.iter().all(|doc| doc.get(id_field).is_some()) {
            Ok(())
        } else {
            Err(ClientError::MissingId(id_field.clone()))
        }
    }

    async fn broadcast(&self, leaders: &[Url], request: &SearchRequest) -> ClientResult<Value> {
        if leaders.is_empty() {
            return Err(ClientError::ClusterState("no active shard leader".to_string()));
        }
        let direct = direct_request(request);

        let responses = if self.settings.parallel_updates {
            join_all(leaders.iter().map(|url| self.replicas.execute(url, &direct))).await
        } else {
            let mut responses = Vec::with_capacity(leaders.len());
            for url in leaders {
                responses.push(self.replicas.execute(url, &direct).await);
            }
            responses
        };

        let mut last = Value::Null;
        for response in responses {
            last = response?;
        }
        Ok(last)
    }

    /// Try `targets` starting at a random one until one answers.
    async fn send_any(&self, targets: &[Url], request: &SearchRequest) -> ClientResult<Value> {
        if targets.is_empty() {
            return Err(ClientError::ClusterState("no active replica".to_string()));
        }
        let direct = direct_request(request);
        let start = fastrand::usize(..targets.len());
        let mut last = None;

        for i in 0..targets.len() {
            let url = &targets[(start + i) % targets.len()];
            match self.replicas.execute(url, &direct).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    tracing::warn!(replica = %url, error = %e, "Replica request failed, trying next");
                    last = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(ClientError::NoLiveEndpoints {
            tried: targets.len(),
            last: Box::new(last.unwrap_or(ClientError::MissingEndpoints)),
        })
    }

    /// Close every inner client; all are attempted, the first failure is
    /// returned.
    pub fn close(&self) -> ClientResult<()> {
        self.refreshes.close();
        let results = [
            self.coordinator.close(),
            self.load_balancer.as_ref().map_or(Ok(()), LbSearchClient::close),
            self.replicas.close(),
        ];
        results.into_iter().collect()
    }
}

impl fmt::Debug for CloudSearchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudSearchClient")
            .field("coordinators", &self.coordinator.endpoints().len())
            .field("load_balanced", &self.load_balancer.is_some())
            .field("default_collection", &self.settings.default_collection)
            .field("cached_collections", &self.collections.len())
            .finish()
    }
}

/// Replica URLs already name the core, so the collection is dropped.
fn direct_request(request: &SearchRequest) -> SearchRequest {
    let mut direct = request.clone();
    direct.collection = None;
    direct
}

fn with_chroot(url: &str, chroot: Option<&str>) -> String {
    match chroot.map(|c| c.trim_matches('/')).filter(|c| !c.is_empty()) {
        Some(chroot) => format!("{}/{}", url.trim_end_matches('/'), chroot),
        None => url.to_string(),
    }
}
