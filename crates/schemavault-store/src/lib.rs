//! Schemavault Store
//!
//! Transactional document database abstraction underneath the version and
//! override managers.
//!
//! # Core Concepts
//!
//! - [`DocumentStore`]: keyed get/set/update/delete/list plus
//!   `run_transaction` with automatic conflict retry
//! - [`TransactionOps`]: buffered read-modify-write handle passed to
//!   transaction closures
//! - [`MemoryStore`]: optimistic in-memory implementation (test fake and
//!   reference semantics)
//! - [`paths`]: the persisted collection layout

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod memory;
mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{decode, encode, paths, DocumentStore, TransactionOps};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
