//! Resource binding errors and the resource name type.
//!
//! Every variant that concerns a configured resource carries its name, and
//! construction failures also carry the topology tag, so that a
//! misconfiguration can be diagnosed from the message alone.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::{ClientError, TopologyKind};
use crate::transaction::TransactionState;

/// Name of one configured search client resource.
///
/// Never empty. Compares and hashes like the underlying string so registries
/// keyed by `ResourceName` can be queried with a plain `&str`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName(String);

impl ResourceName {
    /// Create a resource name, rejecting empty strings.
    pub fn new(name: impl Into<String>) -> Result<Self, BinderError> {
        let name = name.into();
        if name.is_empty() {
            return Err(BinderError::EmptyResourceName);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ResourceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceName {
    type Error = BinderError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl TryFrom<&str> for ResourceName {
    type Error = BinderError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl FromStr for ResourceName {
    type Err = BinderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<ResourceName> for String {
    fn from(name: ResourceName) -> Self {
        name.0
    }
}

/// Errors raised while building, resolving, or running transactions over
/// search client resources.
#[derive(Debug, Error)]
pub enum BinderError {
    /// A resource name was empty.
    #[error("resource name must not be empty")]
    EmptyResourceName,

    /// The configured topology tag is not one of the supported client shapes.
    #[error("resource '{resource}' uses unsupported client type '{topology}'")]
    UnsupportedTopology {
        resource: ResourceName,
        topology: String,
    },

    /// The underlying client could not be created.
    #[error("unable to create {topology} client for resource '{resource}': {source}")]
    ClientConstructionFailed {
        resource: ResourceName,
        topology: TopologyKind,
        #[source]
        source: ClientError,
    },

    /// The resource names an exception classifier nobody registered.
    #[error("resource '{resource}' references unknown exception classifier '{classifier}'")]
    UnknownClassifier {
        resource: ResourceName,
        classifier: String,
    },

    /// No resource with this name exists in the registry.
    #[error("unknown search resource '{resource}'")]
    UnknownResource { resource: ResourceName },

    /// The call did not name a resource and no default is configured.
    #[error("no search resource specified and no default resource configured")]
    NoDefaultResource,

    /// The active client was requested outside any transaction.
    #[error("search client accessed outside of a transaction")]
    NoActiveResource,

    /// The client refused or failed the commit.
    #[error("unable to commit transaction on resource '{resource}': {source}")]
    CommitFailed {
        resource: ResourceName,
        #[source]
        source: ClientError,
    },

    /// The client refused or failed the rollback.
    #[error("unable to roll back transaction on resource '{resource}': {source}")]
    RollbackFailed {
        resource: ResourceName,
        #[source]
        source: ClientError,
    },

    /// A transaction operation was invoked from a state that does not allow it.
    #[error("cannot {operation} transaction on resource '{resource}' while {state}")]
    IllegalState {
        resource: ResourceName,
        operation: &'static str,
        state: TransactionState,
    },

    /// A failure translated by the resource's exception classifier.
    #[error("{message} (resource '{resource}')")]
    Classified {
        resource: ResourceName,
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BinderError {
    /// The resource this error concerns, if any.
    pub fn resource(&self) -> Option<&ResourceName> {
        match self {
            BinderError::UnsupportedTopology { resource, .. }
            | BinderError::ClientConstructionFailed { resource, .. }
            | BinderError::UnknownClassifier { resource, .. }
            | BinderError::UnknownResource { resource }
            | BinderError::CommitFailed { resource, .. }
            | BinderError::RollbackFailed { resource, .. }
            | BinderError::IllegalState { resource, .. }
            | BinderError::Classified { resource, .. } => Some(resource),
            BinderError::EmptyResourceName
            | BinderError::NoDefaultResource
            | BinderError::NoActiveResource => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_resource_name_rejects_empty() {
        assert!(matches!(
            ResourceName::new(""),
            Err(BinderError::EmptyResourceName)
        ));
        assert_eq!(ResourceName::new("search-primary").unwrap().as_str(), "search-primary");
    }

    #[test]
    fn test_resource_name_borrows_as_str() {
        let mut map = HashMap::new();
        map.insert(ResourceName::new("catalog").unwrap(), 1);
        assert_eq!(map.get("catalog"), Some(&1));
    }

    #[test]
    fn test_resource_name_deserialize_rejects_empty() {
        let ok: Result<ResourceName, _> = serde_json::from_str("\"catalog\"");
        assert!(ok.is_ok());
        let empty: Result<ResourceName, _> = serde_json::from_str("\"\"");
        assert!(empty.is_err());
    }

    #[test]
    fn test_error_display_names_resource_and_topology() {
        let err = BinderError::UnsupportedTopology {
            resource: ResourceName::new("catalog").unwrap(),
            topology: "embedded".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("catalog"));
        assert!(msg.contains("embedded"));

        let err = BinderError::ClientConstructionFailed {
            resource: ResourceName::new("catalog").unwrap(),
            topology: TopologyKind::Cloud,
            source: ClientError::MissingEndpoints,
        };
        assert!(err.to_string().contains("cloud"));
        assert_eq!(err.resource().map(ResourceName::as_str), Some("catalog"));
    }

    #[test]
    fn test_no_active_resource_has_no_resource() {
        assert!(BinderError::NoActiveResource.resource().is_none());
    }
}
