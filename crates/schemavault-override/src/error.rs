//! Override manager error types

use crate::types::OverrideStatus;
use schemavault_core::SchemaValidation;
use schemavault_store::StoreError;

/// Errors surfaced by the customer override manager
///
/// Collisions are not errors: an override whose delta collides with the
/// global schema is routed to manual review, not rejected.
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    /// Override record absent
    #[error("override {override_id} not found for intake {intake_id}")]
    OverrideNotFound {
        /// Owning intake
        intake_id: String,
        /// Requested override
        override_id: String,
    },

    /// Candidate delta failed structural validation; nothing was persisted
    #[error("override validation failed: {0}")]
    ValidationFailed(SchemaValidation),

    /// Override status transitions are one-way from pending review
    #[error("override {override_id} is already {status:?} and cannot be re-reviewed")]
    InvalidTransition {
        /// The override
        override_id: String,
        /// Its current status
        status: OverrideStatus,
    },

    /// Template document absent during freeze resolution
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// A resolved version record is missing from the version collection
    #[error("version {version} not found for template {template_id}")]
    VersionNotFound {
        /// Owning template
        template_id: String,
        /// Resolved version number
        version: u64,
    },

    /// Freeze requested approved versions but the template has none
    #[error("template {template_id} has no approved version")]
    NoApprovedVersion {
        /// The unapproved template
        template_id: String,
    },

    /// Store-level failure
    #[error(transparent)]
    Store(#[from] StoreError),
}
