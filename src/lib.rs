//! Named search client resources with transactional scopes.
//!
//! Builds one client per configured resource (single endpoint,
//! client-side load-balanced, or cluster-coordinated), keeps them in an
//! immutable registry, and runs commit/rollback scopes against them through
//! a caller-owned [`ResourceBinder`].

pub mod client;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod transaction;

pub use client::{ClientError, ClientHandle, SearchClient, TopologyKind};
pub use config::schema::SearchConfig;
pub use error::{BinderError, ResourceName};
pub use lifecycle::{SearchRuntime, Shutdown};
pub use registry::{ClassifierTable, ExceptionClassifier, ResourceRegistry, ShutdownReport};
pub use transaction::{ResolvedResource, ResourceBinder, ResourceResolver, Transaction, TransactionHandler};
