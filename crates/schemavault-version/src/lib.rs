//! Schemavault Version
//!
//! Template version control: monotonic version numbers, structural diffs,
//! approvals, history-preserving rollback, and advisory editor locks.
//!
//! # Core Concepts
//!
//! - [`TemplateVersionManager`]: the single entry point; every mutation is
//!   one store transaction
//! - [`Template`]: mutable counter + ETag + embedded [`EditorLock`]
//! - [`TemplateVersion`]: immutable-once-written version record with diff
//!   and rollback provenance
//! - [`LockOutcome`] and friends: lock results as data, not errors

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod manager;
mod types;

pub use error::VersionError;
pub use manager::TemplateVersionManager;
pub use types::{
    EditorLock, LockOutcome, RefreshOutcome, ReleaseOutcome, RollbackInfo, RollbackOutcome,
    SaveOutcome, Template, TemplateVersion, VersionManagerConfig, VersionStatus,
    DEFAULT_LOCK_TTL_SECS,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
