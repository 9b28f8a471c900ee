//! Version manager error types

use schemavault_core::SchemaValidation;
use schemavault_store::StoreError;

/// Errors surfaced by the template version manager
///
/// Lock outcomes are not errors: "failed to acquire" is an expected result
/// and reported as data (see [`crate::LockOutcome`]).
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    /// Template document absent
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Version record absent
    #[error("version {version} not found for template {template_id}")]
    VersionNotFound {
        /// Owning template
        template_id: String,
        /// Requested version number
        version: u64,
    },

    /// Candidate schema failed structural validation; nothing was persisted
    #[error("schema validation failed: {0}")]
    ValidationFailed(SchemaValidation),

    /// Supplied ETag no longer matches the template (a racing writer won)
    #[error("concurrent modification of template {template_id}")]
    ConcurrentModification {
        /// Contended template
        template_id: String,
    },

    /// Version is already approved; approval never reverts
    #[error("version {version} of template {template_id} is already approved")]
    AlreadyApproved {
        /// Owning template
        template_id: String,
        /// Version number
        version: u64,
    },

    /// Store-level failure
    #[error(transparent)]
    Store(#[from] StoreError),
}
