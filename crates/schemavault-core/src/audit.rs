//! Audit logging contract
//!
//! State transitions are reported fire-and-forget. A failure to record
//! history must never abort the business mutation that produced it, so
//! callers swallow [`AuditError`] (logging it at `warn`) and carry on.

use crate::diff::PlaceholderDiff;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Identifier of a recorded audit event
///
/// Empty when the logger failed internally and the event was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditEventId(String);

impl AuditEventId {
    /// Generate a fresh id
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// The empty id, reported when an event was dropped
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether this id refers to a recorded event
    #[inline]
    #[must_use]
    pub fn is_recorded(&self) -> bool {
        !self.0.is_empty()
    }

    /// Borrow the raw id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Kind of state transition being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A template version was approved
    VersionApproved,
    /// A template was rolled back to an earlier version
    VersionRolledBack,
    /// An expired editor lock was taken over by another user
    LockTakenOver,
    /// A customer override was created
    OverrideCreated,
    /// A pending override was reviewed (activated or rejected)
    OverrideReviewed,
    /// An intake's version snapshot was frozen
    IntakeFrozen,
}

/// A single audit event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// What happened
    pub action: AuditAction,
    /// The template/intake/override the event concerns
    pub resource_id: String,
    /// Who triggered it
    pub actor: String,
    /// Schema diff, when the transition changed a schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<PlaceholderDiff>,
    /// Caller-supplied reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Free-form extra context
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl AuditEvent {
    /// Create an event with no diff, reason, or metadata
    #[must_use]
    pub fn new(action: AuditAction, resource_id: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            action,
            resource_id: resource_id.into(),
            actor: actor.into(),
            diff: None,
            reason: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Attach a reason
    #[must_use]
    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// Attach metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Internal audit logger failure
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The audit sink rejected or lost the event
    #[error("audit sink unavailable: {0}")]
    SinkUnavailable(String),
}

/// Receiver of fire-and-forget state-transition notifications
#[async_trait]
pub trait AuditLogger: Send + Sync + std::fmt::Debug {
    /// Record one event, returning its id
    ///
    /// # Errors
    /// Returns an error only on internal sink failure; callers are expected
    /// to swallow it.
    async fn log_event(&self, event: AuditEvent) -> Result<AuditEventId, AuditError>;
}

/// Logger that emits events as `tracing` records
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

#[async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn log_event(&self, event: AuditEvent) -> Result<AuditEventId, AuditError> {
        let id = AuditEventId::generate();
        tracing::info!(
            audit_event_id = %id.as_str(),
            action = ?event.action,
            resource_id = %event.resource_id,
            actor = %event.actor,
            reason = event.reason.as_deref().unwrap_or(""),
            "audit event"
        );
        Ok(id)
    }
}

/// Logger that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditLogger;

#[async_trait]
impl AuditLogger for NullAuditLogger {
    async fn log_event(&self, _event: AuditEvent) -> Result<AuditEventId, AuditError> {
        Ok(AuditEventId::none())
    }
}
