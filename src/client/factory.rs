//! Client construction from resource configuration.
//!
//! # Responsibilities
//! - Interpret the topology tag (unknown tags are rejected verbatim)
//! - Start from each client's built-in defaults and apply only the tuning
//!   fields the configuration sets
//! - Construct the client; no network I/O happens here
//!
//! # Design Decisions
//! - Any construction failure is wrapped with the resource name and
//!   topology so startup errors point at the offending entry

use crate::client::cloud::{CloudSearchClient, CloudSettings};
use crate::client::http::HttpSearchClient;
use crate::client::load_balanced::{LbSearchClient, LbSettings};
use crate::client::transport::HttpSettings;
use crate::client::tuning::{apply_if_present, CLOUD, HTTP, LOAD_BALANCED};
use crate::client::types::{ClientError, ClientResult};
use crate::client::SearchClient;
use crate::config::schema::{CloudTuning, HttpTuning, LbTuning, ResourceConfig, TopologyConfig};
use crate::error::{BinderError, ResourceName};

/// Builds search clients from configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientFactory;

impl ClientFactory {
    pub fn new() -> Self {
        Self
    }

    /// Build the client for one configured resource.
    pub fn build(&self, name: &ResourceName, config: &ResourceConfig) -> Result<SearchClient, BinderError> {
        let topology = config
            .topology_config()
            .map_err(|tag| BinderError::UnsupportedTopology {
                resource: name.clone(),
                topology: tag,
            })?;
        let kind = topology.kind();

        let client = match &topology {
            TopologyConfig::Single { urls, tuning } => {
                build_single(name, urls, tuning).map(SearchClient::Single)
            }
            TopologyConfig::LoadBalanced { urls, tuning } => {
                build_load_balanced(name, urls, tuning).map(SearchClient::LoadBalanced)
            }
            TopologyConfig::Clustered {
                coordinators,
                tuning,
            } => build_cloud(name, coordinators, tuning).map(SearchClient::Clustered),
        }
        .map_err(|source| BinderError::ClientConstructionFailed {
            resource: name.clone(),
            topology: kind,
            source,
        })?;

        tracing::info!(resource = %name, topology = %kind, "Search client created");
        Ok(client)
    }
}

fn build_single(name: &ResourceName, urls: &[String], tuning: &HttpTuning) -> ClientResult<HttpSearchClient> {
    let url = urls.first().ok_or(ClientError::MissingEndpoints)?;
    let mut settings = HttpSettings::default();
    let applied = apply_if_present(tuning, &mut settings, HTTP);
    tracing::debug!(resource = %name, ?applied, "Applied http tuning");

    HttpSearchClient::new(url, settings)
}

fn build_load_balanced(name: &ResourceName, urls: &[String], tuning: &LbTuning) -> ClientResult<LbSearchClient> {
    let mut settings = LbSettings::default();
    let applied = apply_if_present(tuning, &mut settings, LOAD_BALANCED);
    tracing::debug!(resource = %name, ?applied, "Applied load-balanced tuning");

    LbSearchClient::new(urls, settings)
}

fn build_cloud(name: &ResourceName, coordinators: &[String], tuning: &CloudTuning) -> ClientResult<CloudSearchClient> {
    let coordinator = coordinators.first().ok_or(ClientError::MissingEndpoints)?;
    let mut settings = CloudSettings::default();
    let applied = apply_if_present(tuning, &mut settings, CLOUD);
    tracing::debug!(resource = %name, ?applied, "Applied cloud tuning");

    if tuning.load_balanced_urls.is_empty() {
        CloudSearchClient::new(coordinators, tuning.chroot.as_deref(), settings)
    } else {
        settings.update_to_leaders = tuning.update_to_leaders;
        let load_balancer = LbSearchClient::new(&tuning.load_balanced_urls, LbSettings::default())?;
        CloudSearchClient::with_load_balancer(coordinator, load_balancer, settings)
    }
}
