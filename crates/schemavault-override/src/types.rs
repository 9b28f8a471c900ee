//! Customer override and intake snapshot records

use chrono::{DateTime, Utc};
use schemavault_core::{FieldKey, PlaceholderField, PlaceholderSchema, SchemaDelta, SchemaValidation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ulid::Ulid;

/// Unique override identifier (ULID, so ids sort by creation time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OverrideId(pub Ulid);

impl OverrideId {
    /// Generate a new override id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for OverrideId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OverrideId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Review state of a customer override
///
/// Transitions are one-way: `pending_review` resolves to `active` or
/// `rejected` once, and an active override is replaced by re-creation, not
/// re-activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideStatus {
    /// Collided with the global schema; awaiting a human decision
    PendingReview,
    /// In force; folded into the effective schema
    Active,
    /// Declined by a reviewer; never applied
    Rejected,
}

/// Reviewer decision on a pending override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Activate the override
    Approve,
    /// Reject the override
    Reject,
}

/// An inserted content block that may introduce new placeholders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideSection {
    /// Section heading
    pub title: String,
    /// Section body, when the customer supplied prose
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Structural hint for where the section is inserted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Placeholders introduced by this section
    #[serde(default)]
    pub new_placeholders: Vec<PlaceholderField>,
}

impl OverrideSection {
    /// Create a section introducing the given placeholders
    #[must_use]
    pub fn new(title: impl Into<String>, new_placeholders: Vec<PlaceholderField>) -> Self {
        Self {
            title: title.into(),
            content: None,
            position: None,
            new_placeholders,
        }
    }
}

/// A per-engagement schema delta scoped to one customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerOverride {
    /// Identifier
    pub override_id: OverrideId,
    /// Owning intake
    pub intake_id: String,
    /// Customer the override belongs to
    pub customer_id: String,
    /// Inserted content blocks
    pub sections: Vec<OverrideSection>,
    /// The schema changes this override carries
    pub schema_delta: SchemaDelta,
    /// Review state
    pub status: OverrideStatus,
    /// Keys that collided with the global schema at creation time
    ///
    /// A fixed fact of creation, never recomputed.
    pub collisions: Vec<FieldKey>,
    /// Author
    pub created_by: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Reviewer, once decided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    /// Review time, once decided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Caller-supplied reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The consistency anchor of an intake: exact pinned versions plus the
/// merged schema, written exactly once and never recomputed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeVersionSnapshot {
    /// Exact version number frozen per template
    pub template_versions: BTreeMap<String, u64>,
    /// Fully merged schema at freeze time
    pub effective_schema: PlaceholderSchema,
    /// Active override pinned at freeze time, if one existed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_id: Option<OverrideId>,
    /// When the snapshot was taken
    pub frozen_at: DateTime<Utc>,
}

/// Result of creating an override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOverrideOutcome {
    /// Identifier of the persisted override
    pub override_id: OverrideId,
    /// Status assigned at creation (collisions route to review)
    pub status: OverrideStatus,
    /// Colliding keys, if any
    pub collisions: Vec<FieldKey>,
    /// Structural validation output (warnings survive a successful create)
    pub validation: SchemaValidation,
}
