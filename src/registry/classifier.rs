//! Per-resource exception classifiers.
//!
//! A classifier sees every commit/rollback failure of its resource and may
//! translate it into a domain-specific error, usually `BinderError::Classified`.
//! Classifiers are registered by name; configuration refers to them by name.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{BinderError, ResourceName};

/// Translates transaction failures of one resource.
pub trait ExceptionClassifier: Send + Sync {
    fn classify(&self, resource: &ResourceName, error: BinderError) -> BinderError;
}

impl<F> ExceptionClassifier for F
where
    F: Fn(&ResourceName, BinderError) -> BinderError + Send + Sync,
{
    fn classify(&self, resource: &ResourceName, error: BinderError) -> BinderError {
        self(resource, error)
    }
}

/// Named classifiers available to configuration.
#[derive(Clone, Default)]
pub struct ClassifierTable {
    classifiers: BTreeMap<String, Arc<dyn ExceptionClassifier>>,
}

impl ClassifierTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a classifier; a later registration under the same name wins.
    pub fn register(mut self, name: impl Into<String>, classifier: impl ExceptionClassifier + 'static) -> Self {
        self.classifiers.insert(name.into(), Arc::new(classifier));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ExceptionClassifier>> {
        self.classifiers.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }
}

impl fmt::Debug for ClassifierTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.classifiers.keys()).finish()
    }
}
