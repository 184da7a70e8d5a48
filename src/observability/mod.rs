//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Factory, clients, registry, transactions produce:
//!     → logging.rs (structured tracing events, one span per transaction)
//!     → metrics.rs (transaction outcomes, endpoint liveness, close failures)
//!
//! Consumers:
//!     → stdout via the fmt layer
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Metrics go through the `metrics` facade; without an installed
//!   recorder every update is a no-op, so library users pay nothing
//! - The binary decides whether to install the exporter

pub mod logging;
pub mod metrics;
