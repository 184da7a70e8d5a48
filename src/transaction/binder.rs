//! Per-context active resource stack.
//!
//! # Responsibilities
//! - Track which client is active for the current execution context
//! - Support nested scopes in strict LIFO order
//! - Release the stack storage once the outermost scope ends
//!
//! # Design Decisions
//! - The binder is a plain value owned by the context and borrowed `&mut`;
//!   two contexts can never observe each other's stack
//! - Handles are compared by pointer identity, never by value

use std::fmt;
use std::sync::Arc;

use crate::client::{ClientHandle, SearchClient};
use crate::error::BinderError;

/// LIFO stack of active client handles for one execution context.
pub struct ResourceBinder<C: ClientHandle = SearchClient> {
    // None while no transaction is active.
    stack: Option<Vec<Arc<C>>>,
}

impl<C: ClientHandle> ResourceBinder<C> {
    pub fn new() -> Self {
        Self { stack: None }
    }

    /// Make `handle` the active client until the matching [`pop`](Self::pop).
    pub fn push(&mut self, handle: Arc<C>) {
        self.stack.get_or_insert_with(Vec::new).push(handle);
    }

    /// The most recently pushed handle.
    pub fn current(&self) -> Result<Arc<C>, BinderError> {
        match self.peek_or_none() {
            Some(handle) => Ok(handle),
            None => {
                tracing::error!("Search client requested outside of a transaction");
                Err(BinderError::NoActiveResource)
            }
        }
    }

    pub fn peek_or_none(&self) -> Option<Arc<C>> {
        self.stack.as_ref().and_then(|stack| stack.last()).cloned()
    }

    /// Remove the top handle. Emptying the stack releases its storage.
    pub fn pop(&mut self) -> Option<Arc<C>> {
        let stack = self.stack.as_mut()?;
        let handle = stack.pop();
        if stack.is_empty() {
            self.stack = None;
        }
        handle
    }

    pub fn depth(&self) -> usize {
        self.stack.as_ref().map_or(0, Vec::len)
    }

    /// False once the outermost scope has popped and the storage is gone.
    pub fn is_active(&self) -> bool {
        self.stack.is_some()
    }
}

impl<C: ClientHandle> Default for ResourceBinder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ClientHandle> fmt::Debug for ResourceBinder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceBinder")
            .field("depth", &self.depth())
            .finish()
    }
}
