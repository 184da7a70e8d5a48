//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, every error collected)
//!     → SearchConfig (validated, immutable)
//!     → SearchRuntime::start builds registry and resolver from it
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Topology tags stay strings until validation so an unknown tag can be
//!   reported as written

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_str, ConfigError};
pub use schema::{CloudTuning, HttpTuning, LbTuning, ObservabilityConfig, ResourceConfig, SearchConfig, TopologyConfig};
pub use validation::{validate_config, ValidationError};
