//! Template version manager
//!
//! Owns the lifecycle of a template's placeholder schema: saving new
//! versions, approvals, rollback, and short-lived collaborative editor
//! locks. Every mutation is one store transaction; concurrent writers are
//! serialized by the store's conflict retry, with the optional expected-ETag
//! check as an explicit optimistic-concurrency escape hatch for
//! long-think-time edit flows.

use crate::error::VersionError;
use crate::types::{
    EditorLock, LockOutcome, RefreshOutcome, ReleaseOutcome, RollbackInfo, RollbackOutcome,
    SaveOutcome, Template, TemplateVersion, VersionManagerConfig, VersionStatus,
};
use schemavault_core::{
    validate_fields, AuditAction, AuditEvent, AuditLogger, Clock, ETag, PlaceholderDiff,
    PlaceholderField, PlaceholderSchema,
};
use schemavault_store::{decode, encode, paths, DocumentStore};
use std::sync::Arc;

/// Manager for template schema versions and editor locks
#[derive(Debug)]
pub struct TemplateVersionManager<S> {
    store: Arc<S>,
    audit: Arc<dyn AuditLogger>,
    clock: Arc<dyn Clock>,
    config: VersionManagerConfig,
}

impl<S: DocumentStore> TemplateVersionManager<S> {
    /// Create a manager with the default configuration
    #[must_use]
    pub fn new(store: Arc<S>, audit: Arc<dyn AuditLogger>, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(store, audit, clock, VersionManagerConfig::default())
    }

    /// Create a manager with an explicit configuration
    #[must_use]
    pub fn with_config(
        store: Arc<S>,
        audit: Arc<dyn AuditLogger>,
        clock: Arc<dyn Clock>,
        config: VersionManagerConfig,
    ) -> Self {
        Self {
            store,
            audit,
            clock,
            config,
        }
    }

    /// Save a new draft version of the template's schema
    ///
    /// Validates the candidate fields first (no mutation on failure), then
    /// atomically assigns `current_version + 1`, diffs against the
    /// immediately preceding version, and rotates the template ETag. A
    /// missing template document is bootstrapped inside the same
    /// transaction. Audit logging of saves is the caller's responsibility.
    ///
    /// # Errors
    /// [`VersionError::ValidationFailed`] on structural errors,
    /// [`VersionError::ConcurrentModification`] when `expected_etag` is
    /// stale, or a store failure.
    pub async fn save_version(
        &self,
        template_id: &str,
        placeholders: Vec<PlaceholderField>,
        user_id: &str,
        reason: Option<String>,
        expected_etag: Option<&ETag>,
    ) -> Result<SaveOutcome, VersionError> {
        tracing::debug!(template_id, user_id, "saving new template version");

        let validation = validate_fields(&placeholders);
        if !validation.is_valid() {
            return Err(VersionError::ValidationFailed(validation));
        }
        let schema = PlaceholderSchema::from_fields(placeholders);

        let now = self.clock.now();
        let versions_path = paths::template_versions(template_id);
        let mut outcome = None;

        self.store
            .run_transaction(|txn| {
                outcome = None;

                let template = match txn.get(paths::TEMPLATES, template_id)? {
                    Some(value) => decode::<Template>(value)?,
                    None => Template::bootstrap(now),
                };

                if let Some(expected) = expected_etag {
                    if *expected != template.etag {
                        return Err(VersionError::ConcurrentModification {
                            template_id: template_id.to_string(),
                        });
                    }
                }

                let previous = if template.current_version == 0 {
                    PlaceholderSchema::new()
                } else {
                    let previous_id = template.current_version.to_string();
                    match txn.get(&versions_path, &previous_id)? {
                        Some(value) => decode::<TemplateVersion>(value)?.placeholders,
                        None => PlaceholderSchema::new(),
                    }
                };

                let new_version = template.current_version + 1;
                let diff = PlaceholderDiff::between(&previous, &schema);
                let etag = ETag::generate();

                let record = TemplateVersion {
                    version: new_version,
                    placeholders: schema.clone(),
                    diff: diff.clone(),
                    status: VersionStatus::Draft,
                    created_by: user_id.to_string(),
                    created_at: now,
                    approved_by: None,
                    approved_at: None,
                    reason: reason.clone(),
                    etag: ETag::generate(),
                    rollback: None,
                };
                txn.set(&versions_path, &new_version.to_string(), encode(&record)?);

                let updated = Template {
                    current_version: new_version,
                    etag: etag.clone(),
                    updated_at: now,
                    ..template
                };
                txn.set(paths::TEMPLATES, template_id, encode(&updated)?);

                outcome = Some(SaveOutcome {
                    version: new_version,
                    etag,
                    diff,
                });
                Ok(())
            })
            .await?;

        let outcome = outcome.ok_or_else(|| {
            VersionError::from(schemavault_store::StoreError::internal(
                "save transaction committed without an outcome",
            ))
        })?;
        tracing::info!(template_id, version = outcome.version, "saved template version");
        Ok(outcome)
    }

    /// Approve a version and point the template's approved pointer at it
    ///
    /// The pointer always moves to the just-approved number, even when a
    /// higher version was approved earlier (latest-by-time semantics).
    ///
    /// # Errors
    /// [`VersionError::VersionNotFound`] or [`VersionError::AlreadyApproved`],
    /// or a store failure.
    pub async fn approve_version(
        &self,
        template_id: &str,
        version: u64,
        user_id: &str,
        reason: Option<String>,
    ) -> Result<(), VersionError> {
        let now = self.clock.now();
        let versions_path = paths::template_versions(template_id);

        self.store
            .run_transaction(|txn| {
                let mut template: Template = txn
                    .get(paths::TEMPLATES, template_id)?
                    .map(decode)
                    .transpose()?
                    .ok_or_else(|| VersionError::TemplateNotFound(template_id.to_string()))?;

                let mut record: TemplateVersion = txn
                    .get(&versions_path, &version.to_string())?
                    .map(decode)
                    .transpose()?
                    .ok_or(VersionError::VersionNotFound {
                        template_id: template_id.to_string(),
                        version,
                    })?;

                if record.is_approved() {
                    return Err(VersionError::AlreadyApproved {
                        template_id: template_id.to_string(),
                        version,
                    });
                }

                record.status = VersionStatus::Approved;
                record.approved_by = Some(user_id.to_string());
                record.approved_at = Some(now);
                txn.set(&versions_path, &version.to_string(), encode(&record)?);

                template.latest_approved_version = Some(version);
                template.updated_at = now;
                txn.set(paths::TEMPLATES, template_id, encode(&template)?);
                Ok(())
            })
            .await?;

        tracing::info!(template_id, version, "approved template version");
        self.emit(
            AuditEvent::new(AuditAction::VersionApproved, template_id, user_id)
                .with_reason(reason)
                .with_metadata(serde_json::json!({ "version": version })),
        )
        .await;
        Ok(())
    }

    /// Restore an earlier version's schema as a new draft version
    ///
    /// The version counter never rewinds: rollback creates
    /// `current_version + 1` with placeholders copied verbatim from the
    /// target, an empty diff, and rollback provenance. History is preserved
    /// in full.
    ///
    /// # Errors
    /// [`VersionError::TemplateNotFound`] or
    /// [`VersionError::VersionNotFound`], or a store failure.
    pub async fn rollback_to_version(
        &self,
        template_id: &str,
        target_version: u64,
        user_id: &str,
        reason: impl Into<String>,
    ) -> Result<RollbackOutcome, VersionError> {
        let reason = reason.into();
        let now = self.clock.now();
        let versions_path = paths::template_versions(template_id);
        let mut outcome = None;
        let mut rolled_back_from = 0;

        self.store
            .run_transaction(|txn| {
                outcome = None;

                let template: Template = txn
                    .get(paths::TEMPLATES, template_id)?
                    .map(decode)
                    .transpose()?
                    .ok_or_else(|| VersionError::TemplateNotFound(template_id.to_string()))?;

                let target: TemplateVersion = txn
                    .get(&versions_path, &target_version.to_string())?
                    .map(decode)
                    .transpose()?
                    .ok_or(VersionError::VersionNotFound {
                        template_id: template_id.to_string(),
                        version: target_version,
                    })?;

                let new_version = template.current_version + 1;
                let etag = ETag::generate();
                rolled_back_from = template.current_version;

                let record = TemplateVersion {
                    version: new_version,
                    placeholders: target.placeholders.clone(),
                    diff: PlaceholderDiff::empty(),
                    status: VersionStatus::Draft,
                    created_by: user_id.to_string(),
                    created_at: now,
                    approved_by: None,
                    approved_at: None,
                    reason: Some(reason.clone()),
                    etag: ETag::generate(),
                    rollback: Some(RollbackInfo {
                        rolled_back_from: template.current_version,
                        rolled_back_to: target_version,
                    }),
                };
                txn.set(&versions_path, &new_version.to_string(), encode(&record)?);

                let updated = Template {
                    current_version: new_version,
                    etag: etag.clone(),
                    updated_at: now,
                    ..template
                };
                txn.set(paths::TEMPLATES, template_id, encode(&updated)?);

                outcome = Some(RollbackOutcome { new_version, etag });
                Ok::<(), VersionError>(())
            })
            .await?;

        let outcome = outcome.ok_or_else(|| {
            VersionError::from(schemavault_store::StoreError::internal(
                "rollback transaction committed without an outcome",
            ))
        })?;
        tracing::info!(
            template_id,
            new_version = outcome.new_version,
            target_version,
            "rolled back template"
        );
        self.emit(
            AuditEvent::new(AuditAction::VersionRolledBack, template_id, user_id)
                .with_reason(Some(reason))
                .with_metadata(serde_json::json!({
                    "rolled_back_from": rolled_back_from,
                    "rolled_back_to": target_version,
                    "new_version": outcome.new_version,
                })),
        )
        .await;
        Ok(outcome)
    }

    /// Try to acquire (or re-entrantly refresh) the template's editor lock
    ///
    /// Granted when no lock exists, the existing lock has lapsed, or the
    /// caller already holds it. Refusal is reported as data with the current
    /// holder and expiry, and performs no mutation. Expiry is checked lazily
    /// here; there is no background sweeper.
    ///
    /// # Errors
    /// [`VersionError::TemplateNotFound`], or a store failure.
    pub async fn acquire_lock(
        &self,
        template_id: &str,
        user_id: &str,
    ) -> Result<LockOutcome, VersionError> {
        let now = self.clock.now();
        let expires_at = now + self.config.lock_ttl;
        let mut outcome = None;
        let mut took_over_from = None;

        self.store
            .run_transaction(|txn| {
                outcome = None;
                took_over_from = None;

                let mut template: Template = txn
                    .get(paths::TEMPLATES, template_id)?
                    .map(decode)
                    .transpose()?
                    .ok_or_else(|| VersionError::TemplateNotFound(template_id.to_string()))?;

                if let Some(existing) = &template.editor_lock {
                    if existing.is_live(now) && !existing.is_held_by(user_id) {
                        outcome = Some(LockOutcome::refused(existing));
                        return Ok(());
                    }
                    if !existing.is_live(now) && !existing.is_held_by(user_id) {
                        took_over_from = Some(existing.user_id.clone());
                    }
                }

                template.editor_lock = Some(EditorLock {
                    user_id: user_id.to_string(),
                    acquired_at: now,
                    expires_at,
                });
                template.updated_at = now;
                txn.set(paths::TEMPLATES, template_id, encode(&template)?);

                outcome = Some(LockOutcome::granted(expires_at));
                Ok::<(), VersionError>(())
            })
            .await?;

        if let Some(previous_holder) = took_over_from {
            self.emit(
                AuditEvent::new(AuditAction::LockTakenOver, template_id, user_id)
                    .with_metadata(serde_json::json!({ "previous_holder": previous_holder })),
            )
            .await;
        }
        outcome.ok_or_else(|| {
            VersionError::from(schemavault_store::StoreError::internal(
                "lock transaction committed without an outcome",
            ))
        })
    }

    /// Release the editor lock, if held by the calling user
    ///
    /// A release against someone else's lock (or no lock) is a no-op,
    /// reported via `released: false`.
    ///
    /// # Errors
    /// [`VersionError::TemplateNotFound`], or a store failure.
    pub async fn release_lock(
        &self,
        template_id: &str,
        user_id: &str,
    ) -> Result<ReleaseOutcome, VersionError> {
        let now = self.clock.now();
        let mut released = false;

        self.store
            .run_transaction(|txn| {
                released = false;

                let mut template: Template = txn
                    .get(paths::TEMPLATES, template_id)?
                    .map(decode)
                    .transpose()?
                    .ok_or_else(|| VersionError::TemplateNotFound(template_id.to_string()))?;

                if template
                    .editor_lock
                    .as_ref()
                    .is_some_and(|lock| lock.is_held_by(user_id))
                {
                    template.editor_lock = None;
                    template.updated_at = now;
                    txn.set(paths::TEMPLATES, template_id, encode(&template)?);
                    released = true;
                }
                Ok::<(), VersionError>(())
            })
            .await?;

        Ok(ReleaseOutcome { released })
    }

    /// Extend the editor lock, if held by the calling user and still live
    ///
    /// An expired lock cannot be refreshed, only re-acquired.
    ///
    /// # Errors
    /// [`VersionError::TemplateNotFound`], or a store failure.
    pub async fn refresh_lock(
        &self,
        template_id: &str,
        user_id: &str,
    ) -> Result<RefreshOutcome, VersionError> {
        let now = self.clock.now();
        let expires_at = now + self.config.lock_ttl;
        let mut refreshed = false;

        self.store
            .run_transaction(|txn| {
                refreshed = false;

                let mut template: Template = txn
                    .get(paths::TEMPLATES, template_id)?
                    .map(decode)
                    .transpose()?
                    .ok_or_else(|| VersionError::TemplateNotFound(template_id.to_string()))?;

                if let Some(lock) = &mut template.editor_lock {
                    if lock.is_held_by(user_id) && lock.is_live(now) {
                        lock.expires_at = expires_at;
                        template.updated_at = now;
                        txn.set(paths::TEMPLATES, template_id, encode(&template)?);
                        refreshed = true;
                    }
                }
                Ok::<(), VersionError>(())
            })
            .await?;

        Ok(RefreshOutcome {
            refreshed,
            expires_at: refreshed.then_some(expires_at),
        })
    }

    /// Current live lock on the template, if any
    ///
    /// # Errors
    /// [`VersionError::TemplateNotFound`], or a store failure.
    pub async fn lock_status(&self, template_id: &str) -> Result<Option<EditorLock>, VersionError> {
        let template = self.get_template(template_id).await?;
        let now = self.clock.now();
        Ok(template.editor_lock.filter(|lock| lock.is_live(now)))
    }

    /// Read the template record
    ///
    /// # Errors
    /// [`VersionError::TemplateNotFound`], or a store failure.
    pub async fn get_template(&self, template_id: &str) -> Result<Template, VersionError> {
        self.store
            .get(paths::TEMPLATES, template_id)
            .await?
            .map(decode)
            .transpose()?
            .ok_or_else(|| VersionError::TemplateNotFound(template_id.to_string()))
    }

    /// Read one version record
    ///
    /// # Errors
    /// [`VersionError::VersionNotFound`], or a store failure.
    pub async fn get_version(
        &self,
        template_id: &str,
        version: u64,
    ) -> Result<TemplateVersion, VersionError> {
        self.store
            .get(&paths::template_versions(template_id), &version.to_string())
            .await?
            .map(decode)
            .transpose()?
            .ok_or(VersionError::VersionNotFound {
                template_id: template_id.to_string(),
                version,
            })
    }

    /// List all version records, ordered by version number
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn list_versions(
        &self,
        template_id: &str,
    ) -> Result<Vec<TemplateVersion>, VersionError> {
        let entries = self
            .store
            .list(&paths::template_versions(template_id))
            .await?;
        let mut versions = entries
            .into_iter()
            .map(|(_, value)| decode::<TemplateVersion>(value))
            .collect::<Result<Vec<_>, _>>()?;
        versions.sort_by_key(|record| record.version);
        Ok(versions)
    }

    /// Fire-and-forget audit emission; failures never block the mutation
    async fn emit(&self, event: AuditEvent) {
        if let Err(err) = self.audit.log_event(event).await {
            tracing::warn!(error = %err, "audit logging failed; continuing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use schemavault_core::{FieldKey, FieldType};
    use schemavault_store::MemoryStore;
    use schemavault_test_utils::{field, ManualClock, RecordingAuditLogger};

    fn manager_with(
        clock: Arc<ManualClock>,
        audit: Arc<RecordingAuditLogger>,
    ) -> TemplateVersionManager<MemoryStore> {
        TemplateVersionManager::new(Arc::new(MemoryStore::new()), audit, clock)
    }

    fn manager() -> TemplateVersionManager<MemoryStore> {
        manager_with(
            Arc::new(ManualClock::default()),
            Arc::new(RecordingAuditLogger::default()),
        )
    }

    #[tokio::test]
    async fn first_save_bootstraps_template_at_version_one() {
        let manager = manager();
        let outcome = manager
            .save_version("tpl-1", vec![field("client_name")], "alice", None, None)
            .await
            .unwrap();

        assert_eq!(outcome.version, 1);
        assert_eq!(outcome.diff.added.len(), 1);

        let template = manager.get_template("tpl-1").await.unwrap();
        assert_eq!(template.current_version, 1);
    }

    #[tokio::test]
    async fn invalid_schema_performs_no_mutation() {
        let manager = manager();
        let result = manager
            .save_version(
                "tpl-1",
                vec![field("client_name"), field("client_name")],
                "alice",
                None,
                None,
            )
            .await;

        assert!(matches!(result, Err(VersionError::ValidationFailed(_))));
        assert!(matches!(
            manager.get_template("tpl-1").await,
            Err(VersionError::TemplateNotFound(_))
        ));
    }

    #[tokio::test]
    async fn stale_etag_is_rejected() {
        let manager = manager();
        let first = manager
            .save_version("tpl-1", vec![field("a1")], "alice", None, None)
            .await
            .unwrap();

        // First resubmit with the stale tag wins the slot...
        manager
            .save_version("tpl-1", vec![field("b1")], "bob", None, Some(&first.etag))
            .await
            .unwrap();

        // ...the second loses.
        let result = manager
            .save_version("tpl-1", vec![field("c1")], "carol", None, Some(&first.etag))
            .await;
        assert!(matches!(
            result,
            Err(VersionError::ConcurrentModification { .. })
        ));
    }

    #[tokio::test]
    async fn approve_moves_pointer_and_is_one_way() {
        let audit = Arc::new(RecordingAuditLogger::default());
        let manager = manager_with(Arc::new(ManualClock::default()), Arc::clone(&audit));

        manager
            .save_version("tpl-1", vec![field("a1")], "alice", None, None)
            .await
            .unwrap();
        manager
            .save_version("tpl-1", vec![field("a1"), field("b1")], "alice", None, None)
            .await
            .unwrap();

        manager.approve_version("tpl-1", 2, "ruth", None).await.unwrap();
        manager.approve_version("tpl-1", 1, "ruth", None).await.unwrap();

        // Latest-by-time: approving version 1 after 2 repoints the pointer.
        let template = manager.get_template("tpl-1").await.unwrap();
        assert_eq!(template.latest_approved_version, Some(1));

        let result = manager.approve_version("tpl-1", 1, "ruth", None).await;
        assert!(matches!(result, Err(VersionError::AlreadyApproved { .. })));

        assert_eq!(audit.events().len(), 2);
    }

    #[tokio::test]
    async fn rollback_creates_new_version_with_provenance() {
        let manager = manager();
        manager
            .save_version("tpl-1", vec![field("a1")], "alice", None, None)
            .await
            .unwrap();
        manager
            .save_version("tpl-1", vec![field("b1")], "alice", None, None)
            .await
            .unwrap();

        let outcome = manager
            .rollback_to_version("tpl-1", 1, "alice", "undo bad edit")
            .await
            .unwrap();
        assert_eq!(outcome.new_version, 3);

        let restored = manager.get_version("tpl-1", 3).await.unwrap();
        assert!(restored.is_rollback());
        assert_eq!(
            restored.rollback,
            Some(RollbackInfo {
                rolled_back_from: 2,
                rolled_back_to: 1,
            })
        );
        assert!(restored.diff.is_empty());
        assert!(restored.placeholders.contains(&FieldKey::new("a1")));
        assert_eq!(restored.status, VersionStatus::Draft);
    }

    #[tokio::test]
    async fn lock_is_exclusive_until_expiry() {
        let clock = Arc::new(ManualClock::default());
        let manager = manager_with(Arc::clone(&clock), Arc::new(RecordingAuditLogger::default()));
        manager
            .save_version("tpl-1", vec![field("a1")], "alice", None, None)
            .await
            .unwrap();

        let granted = manager.acquire_lock("tpl-1", "alice").await.unwrap();
        assert!(granted.acquired);

        let refused = manager.acquire_lock("tpl-1", "bob").await.unwrap();
        assert!(!refused.acquired);
        assert_eq!(refused.current_holder.as_deref(), Some("alice"));

        // Re-entrant refresh by the holder is always granted.
        let refreshed = manager.acquire_lock("tpl-1", "alice").await.unwrap();
        assert!(refreshed.acquired);

        clock.advance(Duration::minutes(6));
        let stolen = manager.acquire_lock("tpl-1", "bob").await.unwrap();
        assert!(stolen.acquired);
    }

    #[tokio::test]
    async fn release_requires_ownership() {
        let manager = manager();
        manager
            .save_version("tpl-1", vec![field("a1")], "alice", None, None)
            .await
            .unwrap();
        manager.acquire_lock("tpl-1", "alice").await.unwrap();

        let denied = manager.release_lock("tpl-1", "bob").await.unwrap();
        assert!(!denied.released);

        let released = manager.release_lock("tpl-1", "alice").await.unwrap();
        assert!(released.released);
        assert!(manager.lock_status("tpl-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_lock_cannot_be_refreshed() {
        let clock = Arc::new(ManualClock::default());
        let manager = manager_with(Arc::clone(&clock), Arc::new(RecordingAuditLogger::default()));
        manager
            .save_version("tpl-1", vec![field("a1")], "alice", None, None)
            .await
            .unwrap();
        manager.acquire_lock("tpl-1", "alice").await.unwrap();

        clock.advance(Duration::minutes(6));
        let outcome = manager.refresh_lock("tpl-1", "alice").await.unwrap();
        assert!(!outcome.refreshed);
    }

    #[tokio::test]
    async fn enum_field_requires_options() {
        let manager = manager();
        let bad = schemavault_core::PlaceholderField::new("state", "State", FieldType::Enum);
        let result = manager
            .save_version("tpl-1", vec![bad], "alice", None, None)
            .await;
        assert!(matches!(result, Err(VersionError::ValidationFailed(_))));
    }
}
