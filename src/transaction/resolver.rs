//! Resource resolution.
//!
//! Decides which resource a call activates: an explicit name always wins,
//! otherwise calls routed here by default get the configured default. The
//! call table maps call identifiers to explicit names, filled at startup.

use std::collections::BTreeMap;

use crate::config::schema::SearchConfig;
use crate::error::{BinderError, ResourceName};

/// The resource a call should run against.
///
/// `None` as the resource means the call was routed by default but no
/// default is configured; beginning it fails with `NoDefaultResource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    resource: Option<ResourceName>,
}

impl ResolvedResource {
    pub fn explicit(resource: ResourceName) -> Self {
        Self {
            resource: Some(resource),
        }
    }

    pub fn resource(&self) -> Option<&ResourceName> {
        self.resource.as_ref()
    }
}

/// Immutable default resource plus call table.
#[derive(Debug, Clone, Default)]
pub struct ResourceResolver {
    default: Option<ResourceName>,
    calls: BTreeMap<String, ResourceName>,
}

impl ResourceResolver {
    pub fn new(default: Option<ResourceName>) -> Self {
        Self {
            default,
            calls: BTreeMap::new(),
        }
    }

    pub fn with_call(mut self, call: impl Into<String>, resource: ResourceName) -> Self {
        self.calls.insert(call.into(), resource);
        self
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self, BinderError> {
        let default = config
            .default_client
            .as_deref()
            .map(ResourceName::new)
            .transpose()?;

        let mut resolver = Self::new(default);
        for (call, resource) in &config.calls {
            resolver = resolver.with_call(call.as_str(), ResourceName::new(resource.as_str())?);
        }
        Ok(resolver)
    }

    pub fn default_resource(&self) -> Option<&ResourceName> {
        self.default.as_ref()
    }

    /// Resolve one call. `None` means the handler does not apply.
    pub fn resolve(&self, call_site: Option<&ResourceName>, routed_by_default: bool) -> Option<ResolvedResource> {
        if let Some(name) = call_site {
            return Some(ResolvedResource::explicit(name.clone()));
        }
        if routed_by_default {
            return Some(ResolvedResource {
                resource: self.default.clone(),
            });
        }
        None
    }

    /// Resolve a call through the call table.
    pub fn resolve_call(&self, call: &str, routed_by_default: bool) -> Option<ResolvedResource> {
        self.resolve(self.calls.get(call), routed_by_default)
    }
}
