//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the search
//! resources. All types derive Serde traits for deserialization from config
//! files. Tuning fields are `Option`s: an absent field leaves the client's
//! built-in default in place.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::client::TopologyKind;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SearchConfig {
    /// Client resources by name.
    pub clients: BTreeMap<String, ResourceConfig>,

    /// Resource used by calls routed here without naming one.
    pub default_client: Option<String>,

    /// Call identifier → resource name.
    pub calls: BTreeMap<String, String>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl SearchConfig {
    pub fn add_client(mut self, name: impl Into<String>, config: ResourceConfig) -> Self {
        self.clients.insert(name.into(), config);
        self
    }

    pub fn with_default_client(mut self, name: impl Into<String>) -> Self {
        self.default_client = Some(name.into());
        self
    }

    pub fn add_call(mut self, call: impl Into<String>, client: impl Into<String>) -> Self {
        self.calls.insert(call.into(), client.into());
        self
    }
}

/// One search client resource.
///
/// The topology tag is kept as written so an unknown tag can be reported
/// verbatim; only the tuning block matching the tag is used.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceConfig {
    /// Topology tag: `http`, `load_balanced_http` or `cloud`.
    #[serde(rename = "type", default = "default_topology")]
    pub topology: String,

    /// Endpoint URLs (coordinator endpoints for `cloud`).
    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(default)]
    pub http: HttpTuning,

    #[serde(default)]
    pub lb_http: LbTuning,

    #[serde(default)]
    pub cloud: CloudTuning,

    /// Name of a registered exception classifier.
    #[serde(default)]
    pub exception_classifier: Option<String>,
}

fn default_topology() -> String {
    TopologyKind::Http.as_str().to_string()
}

impl ResourceConfig {
    pub fn new(topology: TopologyKind) -> Self {
        Self {
            topology: topology.as_str().to_string(),
            urls: Vec::new(),
            http: HttpTuning::default(),
            lb_http: LbTuning::default(),
            cloud: CloudTuning::default(),
            exception_classifier: None,
        }
    }

    pub fn add_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.exception_classifier = Some(classifier.into());
        self
    }

    /// The typed topology, or the unrecognized tag.
    pub fn topology_config(&self) -> Result<TopologyConfig, String> {
        let urls = self.urls.clone();
        match TopologyKind::parse(&self.topology) {
            Some(TopologyKind::Http) => Ok(TopologyConfig::Single {
                urls,
                tuning: self.http.clone(),
            }),
            Some(TopologyKind::LoadBalancedHttp) => Ok(TopologyConfig::LoadBalanced {
                urls,
                tuning: self.lb_http.clone(),
            }),
            Some(TopologyKind::Cloud) => Ok(TopologyConfig::Clustered {
                coordinators: urls,
                tuning: self.cloud.clone(),
            }),
            None => Err(self.topology.clone()),
        }
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self::new(TopologyKind::Http)
    }
}

/// A resource's topology with only the tuning that applies to it.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyConfig {
    Single { urls: Vec<String>, tuning: HttpTuning },
    LoadBalanced { urls: Vec<String>, tuning: LbTuning },
    Clustered { coordinators: Vec<String>, tuning: CloudTuning },
}

impl TopologyConfig {
    pub fn kind(&self) -> TopologyKind {
        match self {
            TopologyConfig::Single { .. } => TopologyKind::Http,
            TopologyConfig::LoadBalanced { .. } => TopologyKind::LoadBalancedHttp,
            TopologyConfig::Clustered { .. } => TopologyKind::Cloud,
        }
    }
}

/// Tuning of a single-endpoint client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpTuning {
    pub connection_timeout_ms: Option<u64>,
    pub socket_timeout_ms: Option<u64>,
    pub query_params: Option<BTreeSet<String>>,
    pub allow_compression: Option<bool>,
    pub max_connections_per_host: Option<usize>,
    pub follow_redirects: Option<bool>,
    pub max_total_connections: Option<usize>,
    pub use_multipart_post: Option<bool>,
}

/// Tuning of a load-balanced client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LbTuning {
    pub connection_timeout_ms: Option<u64>,
    pub socket_timeout_ms: Option<u64>,
    pub query_params: Option<BTreeSet<String>>,
    pub alive_check_interval_ms: Option<u64>,
}

/// Tuning of a cluster client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CloudTuning {
    /// Secondary load-balanced endpoints; when present the first
    /// coordinator URL is used together with a load balancer over these.
    pub load_balanced_urls: Vec<String>,

    /// Only used together with `load_balanced_urls`.
    pub update_to_leaders: bool,

    pub chroot: Option<String>,
    pub default_collection: Option<String>,
    pub id_field: Option<String>,
    pub collection_cache_ttl_secs: Option<u64>,
    pub parallel_cache_refreshes: Option<usize>,
    pub parallel_updates: Option<bool>,
    pub coordinator_client_timeout_ms: Option<u64>,
    pub coordinator_connect_timeout_ms: Option<u64>,
}

impl Default for CloudTuning {
    fn default() -> Self {
        Self {
            load_balanced_urls: Vec::new(),
            update_to_leaders: true,
            chroot: None,
            default_collection: None,
            id_field: None,
            collection_cache_ttl_secs: None,
            parallel_cache_refreshes: None,
            parallel_updates: None,
            coordinator_client_timeout_ms: None,
            coordinator_connect_timeout_ms: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
