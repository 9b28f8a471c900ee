//! Schemavault Override
//!
//! Per-customer schema overrides layered on top of versioned templates:
//! collision-aware creation, one-way review, effective-schema resolution,
//! and exactly-once intake version freezing.
//!
//! # Core Concepts
//!
//! - [`CustomerOverrideManager`]: the single entry point for override and
//!   intake mutations
//! - [`CustomerOverride`]: an immutable delta record plus its review state
//! - [`IntakeVersionSnapshot`]: the consistency anchor, written exactly once
//! - [`OverrideStatus`]: `pending_review` resolves one way, never back

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod manager;
mod types;

pub use error::OverrideError;
pub use manager::CustomerOverrideManager;
pub use types::{
    CreateOverrideOutcome, CustomerOverride, IntakeVersionSnapshot, OverrideId, OverrideSection,
    OverrideStatus, ReviewDecision,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
