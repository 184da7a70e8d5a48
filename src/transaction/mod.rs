//! Transaction subsystem.
//!
//! # Data Flow
//! ```text
//! Call (optional explicit name, routed-by-default flag)
//!     → resolver.rs (explicit name, call table, or default)
//!     → handler.rs begin (registry lookup, push on binder)
//!     → application code: binder.current()
//!     → handler.rs commit / rollback (classifier applied to failures)
//!     → handler.rs end (pop, balance checked)
//! ```
//!
//! # Design Decisions
//! - The active stack lives in a caller-owned [`ResourceBinder`]; nothing
//!   here is thread-local or global
//! - Binder, resolver and state transitions never await; only the client
//!   commit/rollback calls do

pub mod binder;
pub mod handler;
pub mod resolver;

pub use binder::ResourceBinder;
pub use handler::{Transaction, TransactionHandler, TransactionState};
pub use resolver::{ResolvedResource, ResourceResolver};
