//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every configured search client
//! - Build the resolver from the default client and call table
//! - Hand out binders and the transaction handler
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - No network I/O; cluster clients are connected explicitly

use std::sync::Arc;

use crate::config::schema::SearchConfig;
use crate::error::BinderError;
use crate::registry::{ClassifierTable, ResourceRegistry, ShutdownReport};
use crate::transaction::{ResourceBinder, ResourceResolver, TransactionHandler};

/// Everything a process needs to run transactions against its resources.
#[derive(Debug)]
pub struct SearchRuntime {
    registry: Arc<ResourceRegistry>,
    resolver: Arc<ResourceResolver>,
    handler: TransactionHandler,
}

impl SearchRuntime {
    pub fn start(config: &SearchConfig, classifiers: &ClassifierTable) -> Result<Self, BinderError> {
        tracing::info!(clients = config.clients.len(), "Starting search runtime");

        let registry = Arc::new(ResourceRegistry::build_all(&config.clients, classifiers)?);
        let resolver = Arc::new(ResourceResolver::from_config(config)?);
        let handler = TransactionHandler::new(Arc::clone(&registry));

        tracing::info!(
            resources = registry.len(),
            default = resolver.default_resource().map(|r| r.as_str()).unwrap_or("none"),
            "Search runtime ready"
        );

        Ok(Self {
            registry,
            resolver,
            handler,
        })
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &Arc<ResourceResolver> {
        &self.resolver
    }

    pub fn handler(&self) -> &TransactionHandler {
        &self.handler
    }

    /// A fresh, empty binder for one execution context.
    pub fn binder(&self) -> ResourceBinder {
        ResourceBinder::new()
    }

    /// Close every client once.
    pub async fn shutdown(self) -> ShutdownReport {
        tracing::info!("Shutting down search runtime");
        self.registry.close_all().await
    }
}
