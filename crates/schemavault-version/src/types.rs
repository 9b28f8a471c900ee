//! Template, version, and lock records

use chrono::{DateTime, Duration, Utc};
use schemavault_core::{ETag, PlaceholderDiff, PlaceholderSchema};
use serde::{Deserialize, Serialize};

/// Default editor lock TTL in seconds
pub const DEFAULT_LOCK_TTL_SECS: i64 = 5 * 60;

/// Version manager configuration
#[derive(Debug, Clone, Copy)]
pub struct VersionManagerConfig {
    /// Editor lock time-to-live
    pub lock_ttl: Duration,
}

impl VersionManagerConfig {
    /// Create the default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a custom lock TTL
    #[inline]
    #[must_use]
    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }
}

impl Default for VersionManagerConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::seconds(DEFAULT_LOCK_TTL_SECS),
        }
    }
}

/// Lifecycle status of a template version
///
/// Transitions only draft → approved, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    /// Saved but not yet approved
    Draft,
    /// Approved for customer-facing use
    Approved,
}

/// Soft mutual-exclusion token embedded in a template
///
/// Advisory only: it reduces the chance of two editors silently overwriting
/// each other's draft, it does not guarantee exclusivity at the data level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorLock {
    /// Holder
    pub user_id: String,
    /// When the lock was granted
    pub acquired_at: DateTime<Utc>,
    /// When the lock lapses; expiry is checked lazily, never swept
    pub expires_at: DateTime<Utc>,
}

impl EditorLock {
    /// Whether the lock is still in force at `now`
    #[inline]
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Whether `user_id` holds this lock (live or not)
    #[inline]
    #[must_use]
    pub fn is_held_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// The mutable template record
///
/// `current_version` only ever increases, by exactly one per save or
/// rollback. The `etag` rotates on those same mutations and on nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Monotonic version counter; 0 means no version saved yet
    pub current_version: u64,
    /// Most recently approved version (latest by approval time, not number)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_approved_version: Option<u64>,
    /// Optimistic-concurrency token
    pub etag: ETag,
    /// Embedded soft lock, overwritten or cleared in place
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_lock: Option<EditorLock>,
    /// Creation time of the template record
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Fresh template record with no versions yet
    #[must_use]
    pub fn bootstrap(now: DateTime<Utc>) -> Self {
        Self {
            current_version: 0,
            latest_approved_version: None,
            etag: ETag::generate(),
            editor_lock: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Rollback provenance of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackInfo {
    /// The version that was current when the rollback happened
    pub rolled_back_from: u64,
    /// The version whose placeholders were restored
    pub rolled_back_to: u64,
}

/// One immutable version record
///
/// Written exactly once by a save or rollback; afterwards only the approval
/// fields may change (draft → approved), never the placeholders or diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVersion {
    /// Version number, assigned from the template counter
    pub version: u64,
    /// Full schema frozen at creation
    pub placeholders: PlaceholderSchema,
    /// Diff relative to the immediately preceding version
    pub diff: PlaceholderDiff,
    /// Lifecycle status
    pub status: VersionStatus,
    /// Author
    pub created_by: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Approver, once approved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    /// Approval time, once approved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    /// Caller-supplied reason for the save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Per-version concurrency token
    pub etag: ETag,
    /// Rollback provenance, present only on versions created by a rollback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackInfo>,
}

impl TemplateVersion {
    /// Whether this version was produced by a rollback
    #[inline]
    #[must_use]
    pub fn is_rollback(&self) -> bool {
        self.rollback.is_some()
    }

    /// Whether this version has been approved
    #[inline]
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == VersionStatus::Approved
    }
}

/// Result of a successful save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveOutcome {
    /// The newly assigned version number
    pub version: u64,
    /// The template's new concurrency token
    pub etag: ETag,
    /// Diff against the previous version
    pub diff: PlaceholderDiff,
}

/// Result of a successful rollback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackOutcome {
    /// The newly created version number
    pub new_version: u64,
    /// The template's new concurrency token
    pub etag: ETag,
}

/// Result of a lock acquisition attempt
///
/// "Not acquired" is an expected outcome, not an error, so callers can
/// branch without exception handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockOutcome {
    /// Whether the caller now holds the lock
    pub acquired: bool,
    /// Expiry of the granted lock, or of the blocking lock when refused
    pub expires_at: Option<DateTime<Utc>>,
    /// Holder of the blocking lock when refused
    pub current_holder: Option<String>,
}

impl LockOutcome {
    /// The lock was granted (or re-entrantly refreshed)
    #[inline]
    #[must_use]
    pub fn granted(expires_at: DateTime<Utc>) -> Self {
        Self {
            acquired: true,
            expires_at: Some(expires_at),
            current_holder: None,
        }
    }

    /// The lock is held by someone else
    #[inline]
    #[must_use]
    pub fn refused(holder: &EditorLock) -> Self {
        Self {
            acquired: false,
            expires_at: Some(holder.expires_at),
            current_holder: Some(holder.user_id.clone()),
        }
    }
}

/// Result of a lock release attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    /// Whether a lock held by the caller was deleted
    pub released: bool,
}

/// Result of a lock refresh attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    /// Whether the caller's live lock was extended
    pub refreshed: bool,
    /// New expiry when refreshed
    pub expires_at: Option<DateTime<Utc>>,
}
