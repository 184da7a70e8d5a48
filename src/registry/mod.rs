//! Resource registry.
//!
//! # Data Flow
//! ```text
//! SearchConfig.clients + ClassifierTable
//!     → ClientFactory (one client per resource, eagerly)
//!     → ResourceRegistry (name → client + optional classifier)
//!     → TransactionHandler lookups (read-only after startup)
//!     → close_all() at shutdown
//! ```
//!
//! # Design Decisions
//! - Written once at startup, shared via `Arc` afterwards; no interior mutability
//! - Sorted by name so close order is deterministic
//! - Generic over [`ClientHandle`] so pre-built handles can be registered

pub mod classifier;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::client::{ClientError, ClientFactory, ClientHandle, ClientResult, SearchClient};
use crate::config::schema::ResourceConfig;
use crate::error::{BinderError, ResourceName};
use crate::observability::metrics;

pub use classifier::{ClassifierTable, ExceptionClassifier};

/// One registered resource.
pub struct RegistryEntry<C: ClientHandle = SearchClient> {
    pub client: Arc<C>,
    pub classifier: Option<Arc<dyn ExceptionClassifier>>,
}

impl<C: ClientHandle> Clone for RegistryEntry<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            classifier: self.classifier.clone(),
        }
    }
}

impl<C: ClientHandle> fmt::Debug for RegistryEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("has_classifier", &self.classifier.is_some())
            .finish_non_exhaustive()
    }
}

/// Outcome of closing every registered handle.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub closed: Vec<ResourceName>,
    pub failures: Vec<(ResourceName, ClientError)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Name → client handle mapping, immutable after startup.
pub struct ResourceRegistry<C: ClientHandle = SearchClient> {
    entries: BTreeMap<ResourceName, RegistryEntry<C>>,
}

impl ResourceRegistry<SearchClient> {
    /// Build a client for every configured resource. The first failure aborts,
    /// closing the clients built before it.
    pub fn build_all(
        configs: &BTreeMap<String, ResourceConfig>,
        classifiers: &ClassifierTable,
    ) -> Result<Self, BinderError> {
        let factory = ClientFactory::new();
        Self::build_with(
            configs,
            classifiers,
            |name, config| factory.build(name, config),
            SearchClient::close_now,
        )
    }
}

impl<C: ClientHandle> ResourceRegistry<C> {
    fn build_with(
        configs: &BTreeMap<String, ResourceConfig>,
        classifiers: &ClassifierTable,
        mut build: impl FnMut(&ResourceName, &ResourceConfig) -> Result<C, BinderError>,
        close: impl Fn(&C) -> ClientResult<()>,
    ) -> Result<Self, BinderError> {
        if configs.is_empty() {
            tracing::info!("No search clients configured");
            return Ok(Self::empty());
        }

        let mut entries = BTreeMap::new();
        for (raw_name, config) in configs {
            let entry = ResourceName::new(raw_name.as_str()).and_then(|name| {
                let classifier = match &config.exception_classifier {
                    Some(classifier) => Some(classifiers.get(classifier).ok_or_else(|| {
                        BinderError::UnknownClassifier {
                            resource: name.clone(),
                            classifier: classifier.clone(),
                        }
                    })?),
                    None => None,
                };
                let client = build(&name, config)?;
                Ok((name, classifier, client))
            });

            match entry {
                Ok((name, classifier, client)) => {
                    entries.insert(
                        name,
                        RegistryEntry {
                            client: Arc::new(client),
                            classifier,
                        },
                    );
                }
                Err(e) => {
                    for (name, entry) in &entries {
                        if let Err(close_err) = close(entry.client.as_ref()) {
                            tracing::warn!(resource = %name, error = %close_err, "Failed to close client after startup failure");
                        }
                    }
                    return Err(e);
                }
            }
        }

        tracing::info!(resources = entries.len(), "Search resource registry built");
        Ok(Self { entries })
    }
}

impl<C: ClientHandle> ResourceRegistry<C> {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register pre-built handles, none of them with a classifier.
    pub fn from_handles(handles: impl IntoIterator<Item = (ResourceName, Arc<C>)>) -> Self {
        let entries = handles
            .into_iter()
            .map(|(name, client)| {
                (
                    name,
                    RegistryEntry {
                        client,
                        classifier: None,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Attach a classifier to an already registered resource.
    pub fn with_classifier(
        mut self,
        name: &str,
        classifier: Arc<dyn ExceptionClassifier>,
    ) -> Result<Self, BinderError> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| unknown_resource(name))?;
        entry.classifier = Some(classifier);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Result<&RegistryEntry<C>, BinderError> {
        self.entries.get(name).ok_or_else(|| unknown_resource(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &ResourceName> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceName, &RegistryEntry<C>)> {
        self.entries.iter()
    }

    /// Close every handle in name order. A failure is logged and recorded,
    /// and the remaining handles are still closed.
    pub async fn close_all(&self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        for (name, entry) in &self.entries {
            match entry.client.close().await {
                Ok(()) => {
                    tracing::debug!(resource = %name, "Search client closed");
                    report.closed.push(name.clone());
                }
                Err(e) => {
                    tracing::error!(resource = %name, error = %e, "Failed to close search client");
                    metrics::record_close_failure(name.as_str());
                    report.failures.push((name.clone(), e));
                }
            }
        }
        tracing::info!(
            closed = report.closed.len(),
            failed = report.failures.len(),
            "Search resources released"
        );
        report
    }
}

impl<C: ClientHandle> fmt::Debug for ResourceRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

// A name that is not a valid ResourceName can never be registered.
fn unknown_resource(name: &str) -> BinderError {
    match ResourceName::new(name) {
        Ok(resource) => BinderError::UnknownResource { resource },
        Err(e) => e,
    }
}
