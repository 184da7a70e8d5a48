//! Transaction state machine.
//!
//! # Responsibilities
//! - Look up the resolved resource and push its client on the binder
//! - Commit or roll back through the client, translating failures
//! - Pop exactly once per `begin`, on every path
//!
//! # States
//! ```text
//! Idle → Active → Committing → Idle
//!               → RollingBack → Idle
//! Idle (after failed commit) → RollingBack → Idle
//! ```

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tracing::Instrument;
use uuid::Uuid;

use crate::client::{ClientHandle, SearchClient};
use crate::error::{BinderError, ResourceName};
use crate::observability::metrics;
use crate::registry::{ExceptionClassifier, ResourceRegistry};
use crate::transaction::binder::ResourceBinder;
use crate::transaction::resolver::ResolvedResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Active,
    Committing,
    RollingBack,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionState::Idle => "idle",
            TransactionState::Active => "active",
            TransactionState::Committing => "committing",
            TransactionState::RollingBack => "rolling back",
        };
        f.write_str(s)
    }
}

/// One begun transaction. Hand it back to [`TransactionHandler::end`].
pub struct Transaction<C: ClientHandle = SearchClient> {
    id: Uuid,
    resource: ResourceName,
    client: Arc<C>,
    classifier: Option<Arc<dyn ExceptionClassifier>>,
    state: TransactionState,
    commit_failed: bool,
    // Binder depth right after our push.
    depth: usize,
    span: tracing::Span,
}

impl<C: ClientHandle> Transaction<C> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn resource(&self) -> &ResourceName {
        &self.resource
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn commit_failed(&self) -> bool {
        self.commit_failed
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub async fn commit(&mut self) -> Result<(), BinderError> {
        if self.state != TransactionState::Active {
            return Err(self.illegal("commit"));
        }

        self.state = TransactionState::Committing;
        let result = self.client.commit().instrument(self.span.clone()).await;
        self.state = TransactionState::Idle;

        match result {
            Ok(()) => {
                tracing::debug!(parent: &self.span, "Transaction committed");
                metrics::record_transaction(self.resource.as_str(), "committed");
                Ok(())
            }
            Err(source) => {
                self.commit_failed = true;
                tracing::warn!(parent: &self.span, error = %source, "Commit failed");
                metrics::record_transaction(self.resource.as_str(), "commit_failed");
                Err(self.classify(BinderError::CommitFailed {
                    resource: self.resource.clone(),
                    source,
                }))
            }
        }
    }

    pub async fn rollback(&mut self) -> Result<(), BinderError> {
        let allowed = match self.state {
            TransactionState::Active => true,
            TransactionState::Idle => self.commit_failed,
            _ => false,
        };
        if !allowed {
            return Err(self.illegal("roll back"));
        }

        self.state = TransactionState::RollingBack;
        let result = self.client.rollback().instrument(self.span.clone()).await;
        self.state = TransactionState::Idle;
        self.commit_failed = false;

        match result {
            Ok(()) => {
                tracing::debug!(parent: &self.span, "Transaction rolled back");
                metrics::record_transaction(self.resource.as_str(), "rolled_back");
                Ok(())
            }
            Err(source) => {
                tracing::warn!(parent: &self.span, error = %source, "Rollback failed");
                metrics::record_transaction(self.resource.as_str(), "rollback_failed");
                Err(self.classify(BinderError::RollbackFailed {
                    resource: self.resource.clone(),
                    source,
                }))
            }
        }
    }

    fn classify(&self, error: BinderError) -> BinderError {
        match &self.classifier {
            Some(classifier) => classifier.classify(&self.resource, error),
            None => error,
        }
    }

    fn illegal(&self, operation: &'static str) -> BinderError {
        BinderError::IllegalState {
            resource: self.resource.clone(),
            operation,
            state: self.state,
        }
    }
}

impl<C: ClientHandle> fmt::Debug for Transaction<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("resource", &self.resource)
            .field("state", &self.state)
            .field("commit_failed", &self.commit_failed)
            .finish()
    }
}

/// Begins, finishes and ends transactions against registered resources.
pub struct TransactionHandler<C: ClientHandle = SearchClient> {
    registry: Arc<ResourceRegistry<C>>,
}

impl<C: ClientHandle> Clone for TransactionHandler<C> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<C: ClientHandle> TransactionHandler<C> {
    pub fn new(registry: Arc<ResourceRegistry<C>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry<C>> {
        &self.registry
    }

    /// Push the resource's client. On failure the binder is untouched.
    pub fn begin(&self, binder: &mut ResourceBinder<C>, resource: &ResourceName) -> Result<Transaction<C>, BinderError> {
        let entry = self.registry.get(resource.as_str())?;

        binder.push(Arc::clone(&entry.client));
        let id = Uuid::new_v4();
        let span = tracing::info_span!("transaction", id = %id, resource = %resource);
        tracing::debug!(parent: &span, depth = binder.depth(), "Transaction begun");

        Ok(Transaction {
            id,
            resource: resource.clone(),
            client: Arc::clone(&entry.client),
            classifier: entry.classifier.clone(),
            state: TransactionState::Active,
            commit_failed: false,
            depth: binder.depth(),
            span,
        })
    }

    /// Begin against a resolved resource; a default-routed call with no
    /// configured default fails with `NoDefaultResource`.
    pub fn begin_resolved(
        &self,
        binder: &mut ResourceBinder<C>,
        resolved: &ResolvedResource,
    ) -> Result<Transaction<C>, BinderError> {
        let resource = resolved.resource().ok_or(BinderError::NoDefaultResource)?;
        self.begin(binder, resource)
    }

    /// Pop the entry `begin` pushed. Imbalance is logged, never raised.
    pub fn end(&self, binder: &mut ResourceBinder<C>, tx: Transaction<C>) {
        if tx.state == TransactionState::Active {
            tracing::warn!(parent: &tx.span, "Transaction ended without commit or rollback");
        }
        if binder.depth() != tx.depth {
            tracing::error!(
                parent: &tx.span,
                expected = tx.depth,
                actual = binder.depth(),
                "Resource binder depth changed inside transaction"
            );
        }

        match binder.pop() {
            Some(popped) if Arc::ptr_eq(&popped, &tx.client) => {
                tracing::debug!(parent: &tx.span, depth = binder.depth(), "Transaction ended");
            }
            Some(_) => {
                tracing::error!(parent: &tx.span, "Popped a search client other than the one this transaction pushed");
            }
            None => {
                tracing::error!(parent: &tx.span, "Resource binder empty at transaction end");
            }
        }
    }

    /// Run `body` inside a transaction: commit on success, roll back on
    /// error, and always end. A rollback failure after a body error is
    /// logged; the body's error is returned.
    pub async fn execute<T, E, F>(
        &self,
        binder: &mut ResourceBinder<C>,
        resolved: &ResolvedResource,
        body: F,
    ) -> Result<T, E>
    where
        F: for<'b> FnOnce(&'b mut ResourceBinder<C>) -> BoxFuture<'b, Result<T, E>>,
        E: From<BinderError>,
    {
        let mut tx = self.begin_resolved(binder, resolved)?;
        let span = tx.span.clone();

        let result = match body(binder).instrument(span).await {
            Ok(value) => tx.commit().await.map(|()| value).map_err(E::from),
            Err(body_error) => {
                if let Err(e) = tx.rollback().await {
                    tracing::error!(parent: &tx.span, error = %e, "Rollback after failed body also failed");
                }
                Err(body_error)
            }
        };

        self.end(binder, tx);
        result
    }
}

impl<C: ClientHandle> fmt::Debug for TransactionHandler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionHandler")
            .field("registry", &self.registry)
            .finish()
    }
}
