//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (default client and call table reference
//!   configured clients)
//! - Check each client has a known topology and at least one URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SearchConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::client::TopologyKind;
use crate::config::schema::SearchConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("client names must not be empty")]
    EmptyClientName,

    #[error("client '{client}' has unsupported type '{topology}'")]
    UnsupportedTopology { client: String, topology: String },

    #[error("client '{client}' has no urls")]
    MissingUrls { client: String },

    #[error("default_client '{client}' is not a configured client")]
    UnknownDefaultClient { client: String },

    #[error("call '{call}' references unknown client '{client}'")]
    UnknownCallClient { call: String, client: String },
}

pub fn validate_config(config: &SearchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (name, client) in &config.clients {
        if name.is_empty() {
            errors.push(ValidationError::EmptyClientName);
        }
        if TopologyKind::parse(&client.topology).is_none() {
            errors.push(ValidationError::UnsupportedTopology {
                client: name.clone(),
                topology: client.topology.clone(),
            });
        }
        if client.urls.is_empty() {
            errors.push(ValidationError::MissingUrls { client: name.clone() });
        }
    }

    if let Some(default) = &config.default_client {
        if !config.clients.contains_key(default) {
            errors.push(ValidationError::UnknownDefaultClient {
                client: default.clone(),
            });
        }
    }

    for (call, client) in &config.calls {
        if !config.clients.contains_key(client) {
            errors.push(ValidationError::UnknownCallClient {
                call: call.clone(),
                client: client.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
