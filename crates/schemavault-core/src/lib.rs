//! Schemavault Core
//!
//! The placeholder-schema model shared by the version and override managers.
//!
//! # Core Concepts
//!
//! - [`PlaceholderField`] / [`PlaceholderSchema`]: named, typed slots in a
//!   document template, keyed by [`FieldKey`]
//! - [`validate_fields`]: structural validation producing
//!   [`SchemaValidation`] (errors block persistence, warnings do not)
//! - [`PlaceholderDiff`]: typed diff between consecutive template versions,
//!   with best-effort rename detection
//! - [`SchemaDelta`]: per-customer changes and the add → remove → modify
//!   merge law
//! - [`ETag`]: opaque optimistic-concurrency token
//! - [`Clock`] and [`AuditLogger`]: injected collaborators

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod audit;
mod clock;
mod delta;
mod diff;
mod etag;
mod field;
mod validate;

pub use audit::{
    AuditAction, AuditError, AuditEvent, AuditEventId, AuditLogger, NullAuditLogger,
    TracingAuditLogger,
};
pub use clock::{Clock, SystemClock};
pub use delta::SchemaDelta;
pub use diff::{PlaceholderDiff, RenamedField};
pub use etag::ETag;
pub use field::{FieldKey, FieldType, PlaceholderField, PlaceholderSchema, FIELD_KEY_PATTERN};
pub use validate::{validate_fields, SchemaValidation, ValidationIssue};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
