//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     SearchConfig → ResourceRegistry::build_all → ResourceResolver
//!     → TransactionHandler → SearchRuntime
//!
//! Shutdown:
//!     SearchRuntime::shutdown → ResourceRegistry::close_all
//!     → each client triggers its shutdown.rs coordinator
//!     → alive-check tasks exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: registry first, then resolver, then handler
//! - Fail fast: any startup error is fatal
//! - Shutdown consumes the runtime so handles are closed at most once

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::SearchRuntime;
