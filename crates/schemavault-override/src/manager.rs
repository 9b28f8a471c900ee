//! Customer override manager
//!
//! Owns per-customer schema deltas and the freeze operation that pins an
//! intake to exact template versions. Reads templates and versions as an
//! upstream dependency but never mutates them.

use crate::error::OverrideError;
use crate::types::{
    CreateOverrideOutcome, CustomerOverride, IntakeVersionSnapshot, OverrideId, OverrideSection,
    OverrideStatus, ReviewDecision,
};
use schemavault_core::{
    validate_fields, AuditAction, AuditEvent, AuditLogger, Clock, PlaceholderField,
    PlaceholderSchema, SchemaDelta,
};
use schemavault_store::{decode, encode, paths, DocumentStore};
use schemavault_version::{Template, TemplateVersion};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Field on the intake document holding the frozen snapshot
const SNAPSHOT_FIELD: &str = "version_snapshot";

/// Manager for customer overrides and intake version snapshots
#[derive(Debug)]
pub struct CustomerOverrideManager<S> {
    store: Arc<S>,
    audit: Arc<dyn AuditLogger>,
    clock: Arc<dyn Clock>,
}

impl<S: DocumentStore> CustomerOverrideManager<S> {
    /// Create a manager
    #[must_use]
    pub fn new(store: Arc<S>, audit: Arc<dyn AuditLogger>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            audit,
            clock,
        }
    }

    /// Create an override from inserted sections
    ///
    /// Collects every `new_placeholders` entry across the sections into one
    /// candidate delta, validates it, and scans for collisions against the
    /// intake's frozen effective schema (empty when the intake has not been
    /// frozen — valid but degenerate). Collisions route the override to
    /// `pending_review`; a collision-free delta activates immediately.
    /// Collisions are stored as a fact of creation time, never recomputed.
    ///
    /// # Errors
    /// [`OverrideError::ValidationFailed`] on structural errors, or a store
    /// failure.
    pub async fn create_override(
        &self,
        intake_id: &str,
        customer_id: &str,
        sections: Vec<OverrideSection>,
        created_by: &str,
        reason: Option<String>,
    ) -> Result<CreateOverrideOutcome, OverrideError> {
        let candidate: Vec<PlaceholderField> = sections
            .iter()
            .flat_map(|section| section.new_placeholders.iter().cloned())
            .collect();

        let validation = validate_fields(&candidate);
        if !validation.is_valid() {
            return Err(OverrideError::ValidationFailed(validation));
        }

        let base = self
            .frozen_snapshot(intake_id)
            .await?
            .map(|snapshot| snapshot.effective_schema)
            .unwrap_or_default();

        let delta = SchemaDelta::from_added(candidate);
        let collisions = delta.collisions_against(&base);
        let status = if collisions.is_empty() {
            OverrideStatus::Active
        } else {
            OverrideStatus::PendingReview
        };

        let override_id = OverrideId::new();
        let record = CustomerOverride {
            override_id,
            intake_id: intake_id.to_string(),
            customer_id: customer_id.to_string(),
            sections,
            schema_delta: delta,
            status,
            collisions: collisions.clone(),
            created_by: created_by.to_string(),
            created_at: self.clock.now(),
            reviewed_by: None,
            reviewed_at: None,
            reason: reason.clone(),
        };
        self.store
            .set(
                &paths::intake_overrides(intake_id),
                &override_id.to_string(),
                encode(&record)?,
            )
            .await?;

        tracing::info!(
            intake_id,
            override_id = %override_id,
            ?status,
            collision_count = collisions.len(),
            "created customer override"
        );
        self.emit(
            AuditEvent::new(AuditAction::OverrideCreated, intake_id, created_by)
                .with_reason(reason)
                .with_metadata(serde_json::json!({
                    "override_id": override_id.to_string(),
                    "customer_id": customer_id,
                    "collisions": collisions.clone(),
                })),
        )
        .await;

        Ok(CreateOverrideOutcome {
            override_id,
            status,
            collisions,
            validation,
        })
    }

    /// Resolve a pending override to active or rejected
    ///
    /// Status transitions are strictly one-way: anything other than
    /// `pending_review` cannot be re-reviewed, only replaced by a new
    /// override.
    ///
    /// # Errors
    /// [`OverrideError::OverrideNotFound`] or
    /// [`OverrideError::InvalidTransition`], or a store failure.
    pub async fn review_override(
        &self,
        intake_id: &str,
        override_id: OverrideId,
        decision: ReviewDecision,
        reviewed_by: &str,
    ) -> Result<OverrideStatus, OverrideError> {
        let now = self.clock.now();
        let overrides_path = paths::intake_overrides(intake_id);
        let next_status = match decision {
            ReviewDecision::Approve => OverrideStatus::Active,
            ReviewDecision::Reject => OverrideStatus::Rejected,
        };

        self.store
            .run_transaction(|txn| {
                let mut record: CustomerOverride = txn
                    .get(&overrides_path, &override_id.to_string())?
                    .map(decode)
                    .transpose()?
                    .ok_or_else(|| OverrideError::OverrideNotFound {
                        intake_id: intake_id.to_string(),
                        override_id: override_id.to_string(),
                    })?;

                if record.status != OverrideStatus::PendingReview {
                    return Err(OverrideError::InvalidTransition {
                        override_id: override_id.to_string(),
                        status: record.status,
                    });
                }

                record.status = next_status;
                record.reviewed_by = Some(reviewed_by.to_string());
                record.reviewed_at = Some(now);
                txn.set(&overrides_path, &override_id.to_string(), encode(&record)?);
                Ok(())
            })
            .await?;

        tracing::info!(intake_id, override_id = %override_id, ?next_status, "reviewed override");
        self.emit(
            AuditEvent::new(AuditAction::OverrideReviewed, intake_id, reviewed_by).with_metadata(
                serde_json::json!({
                    "override_id": override_id.to_string(),
                    "decision": decision,
                }),
            ),
        )
        .await;
        Ok(next_status)
    }

    /// Apply one override's delta on top of the intake's frozen schema
    ///
    /// Pure read: nothing is persisted. The merge follows the fixed
    /// add → remove → modify order.
    ///
    /// # Errors
    /// [`OverrideError::OverrideNotFound`], or a store failure.
    pub async fn apply_override(
        &self,
        intake_id: &str,
        override_id: OverrideId,
    ) -> Result<PlaceholderSchema, OverrideError> {
        let base = self
            .frozen_snapshot(intake_id)
            .await?
            .map(|snapshot| snapshot.effective_schema)
            .unwrap_or_default();
        let record = self.get_override(intake_id, override_id).await?;
        Ok(record.schema_delta.apply_to(&base))
    }

    /// The fully merged schema visible to this intake right now
    ///
    /// Layers every `active` override, in creation order, on top of the
    /// frozen snapshot (empty when never frozen). Recomputed on every call;
    /// the snapshot itself is never rewritten.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn get_effective_schema(
        &self,
        intake_id: &str,
    ) -> Result<PlaceholderSchema, OverrideError> {
        let base = self
            .frozen_snapshot(intake_id)
            .await?
            .map(|snapshot| snapshot.effective_schema)
            .unwrap_or_default();

        let mut schema = base;
        for record in self.active_overrides(intake_id).await? {
            schema = record.schema_delta.apply_to(&schema);
        }
        Ok(schema)
    }

    /// Freeze the intake's version snapshot, exactly once
    ///
    /// Resolves each template independently (this is deliberately not one
    /// cross-template transaction): the approved pointer when
    /// `use_approved_versions`, otherwise the current counter. Placeholders
    /// are merged across templates first-template-wins. Only the final
    /// snapshot write is transactional, and it re-checks absence: a second
    /// freeze returns the stored snapshot unchanged, no matter how the
    /// templates have moved on since.
    ///
    /// # Errors
    /// [`OverrideError::TemplateNotFound`],
    /// [`OverrideError::NoApprovedVersion`], or a store failure.
    pub async fn freeze_intake_version(
        &self,
        intake_id: &str,
        template_ids: &[&str],
        use_approved_versions: bool,
    ) -> Result<IntakeVersionSnapshot, OverrideError> {
        let mut template_versions = BTreeMap::new();
        let mut effective = PlaceholderSchema::new();

        for template_id in template_ids {
            let template: Template = self
                .store
                .get(paths::TEMPLATES, template_id)
                .await?
                .map(decode)
                .transpose()?
                .ok_or_else(|| OverrideError::TemplateNotFound((*template_id).to_string()))?;

            let version = if use_approved_versions {
                template
                    .latest_approved_version
                    .ok_or_else(|| OverrideError::NoApprovedVersion {
                        template_id: (*template_id).to_string(),
                    })?
            } else {
                template.current_version
            };

            if version > 0 {
                let record: TemplateVersion = self
                    .store
                    .get(&paths::template_versions(template_id), &version.to_string())
                    .await?
                    .map(decode)
                    .transpose()?
                    .ok_or(OverrideError::VersionNotFound {
                        template_id: (*template_id).to_string(),
                        version,
                    })?;
                for field in record.placeholders.fields() {
                    // First template wins ties on field_key.
                    effective.insert(field.clone());
                }
            }
            template_versions.insert((*template_id).to_string(), version);
        }

        let pinned_override = self
            .active_overrides(intake_id)
            .await?
            .last()
            .map(|record| record.override_id);

        let snapshot = IntakeVersionSnapshot {
            template_versions,
            effective_schema: effective,
            override_id: pinned_override,
            frozen_at: self.clock.now(),
        };

        let mut stored = None;
        let mut froze = false;
        self.store
            .run_transaction::<_, OverrideError>(|txn| {
                stored = None;
                froze = false;

                let intake = txn
                    .get(paths::INTAKES, intake_id)?
                    .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

                if let Some(existing) = intake.get(SNAPSHOT_FIELD) {
                    if !existing.is_null() {
                        stored = Some(decode::<IntakeVersionSnapshot>(existing.clone())?);
                        return Ok(());
                    }
                }

                let mut fields = match intake {
                    serde_json::Value::Object(map) => map,
                    _ => serde_json::Map::new(),
                };
                fields.insert(SNAPSHOT_FIELD.to_string(), encode(&snapshot)?);
                txn.set(paths::INTAKES, intake_id, serde_json::Value::Object(fields));
                stored = Some(snapshot.clone());
                froze = true;
                Ok(())
            })
            .await?;

        let stored = stored.ok_or_else(|| {
            OverrideError::from(schemavault_store::StoreError::internal(
                "freeze transaction committed without an outcome",
            ))
        })?;
        if froze {
            tracing::info!(intake_id, "froze intake version snapshot");
            self.emit(
                AuditEvent::new(AuditAction::IntakeFrozen, intake_id, "system").with_metadata(
                    serde_json::json!({
                        "template_versions": stored.template_versions,
                        "use_approved_versions": use_approved_versions,
                    }),
                ),
            )
            .await;
        } else {
            tracing::debug!(intake_id, "intake already frozen; returning stored snapshot");
        }
        Ok(stored)
    }

    /// Read one override record
    ///
    /// # Errors
    /// [`OverrideError::OverrideNotFound`], or a store failure.
    pub async fn get_override(
        &self,
        intake_id: &str,
        override_id: OverrideId,
    ) -> Result<CustomerOverride, OverrideError> {
        self.store
            .get(&paths::intake_overrides(intake_id), &override_id.to_string())
            .await?
            .map(decode)
            .transpose()?
            .ok_or_else(|| OverrideError::OverrideNotFound {
                intake_id: intake_id.to_string(),
                override_id: override_id.to_string(),
            })
    }

    /// The intake's frozen snapshot, if it has been frozen
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn frozen_snapshot(
        &self,
        intake_id: &str,
    ) -> Result<Option<IntakeVersionSnapshot>, OverrideError> {
        let Some(intake) = self.store.get(paths::INTAKES, intake_id).await? else {
            return Ok(None);
        };
        match intake.get(SNAPSHOT_FIELD) {
            Some(value) if !value.is_null() => Ok(Some(decode(value.clone())?)),
            _ => Ok(None),
        }
    }

    /// All active overrides for the intake, in creation order
    async fn active_overrides(
        &self,
        intake_id: &str,
    ) -> Result<Vec<CustomerOverride>, OverrideError> {
        let entries = self.store.list(&paths::intake_overrides(intake_id)).await?;
        let mut records = entries
            .into_iter()
            .map(|(_, value)| decode::<CustomerOverride>(value))
            .collect::<Result<Vec<_>, _>>()?;
        records.retain(|record| record.status == OverrideStatus::Active);
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.override_id.cmp(&b.override_id))
        });
        Ok(records)
    }

    /// Fire-and-forget audit emission; failures never block the mutation
    async fn emit(&self, event: AuditEvent) {
        if let Err(err) = self.audit.log_event(event).await {
            tracing::warn!(error = %err, "audit logging failed; continuing");
        }
    }
}
