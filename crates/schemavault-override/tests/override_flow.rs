//! End-to-end override and freeze tests sharing one in-memory store with
//! the version manager.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use schemavault_core::{AuditAction, FieldKey, FieldType};
use schemavault_override::{
    CustomerOverrideManager, OverrideError, OverrideSection, OverrideStatus, ReviewDecision,
};
use schemavault_store::MemoryStore;
use schemavault_test_utils::{field, ManualClock, RecordingAuditLogger};
use schemavault_version::TemplateVersionManager;

struct Harness {
    versions: TemplateVersionManager<MemoryStore>,
    overrides: CustomerOverrideManager<MemoryStore>,
    audit: Arc<RecordingAuditLogger>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAuditLogger::default());
    let clock = Arc::new(ManualClock::default());
    Harness {
        versions: TemplateVersionManager::new(
            Arc::clone(&store),
            Arc::clone(&audit) as Arc<dyn schemavault_core::AuditLogger>,
            Arc::clone(&clock) as Arc<dyn schemavault_core::Clock>,
        ),
        overrides: CustomerOverrideManager::new(
            store,
            Arc::clone(&audit) as Arc<dyn schemavault_core::AuditLogger>,
            clock,
        ),
        audit,
    }
}

fn section(keys: &[&str]) -> OverrideSection {
    OverrideSection::new(
        "Custom clauses",
        keys.iter().map(|key| field(key)).collect(),
    )
}

#[tokio::test]
async fn freeze_pins_approved_versions_and_never_moves() {
    let h = harness();
    h.versions
        .save_version("nda", vec![field("client_name")], "alice", None, None)
        .await
        .unwrap();
    h.versions.approve_version("nda", 1, "ruth", None).await.unwrap();

    let snapshot = h
        .overrides
        .freeze_intake_version("intake-1", &["nda"], true)
        .await
        .unwrap();
    assert_eq!(snapshot.template_versions.get("nda"), Some(&1));
    assert_eq!(snapshot.effective_schema.len(), 1);

    // The template moves on; the intake does not.
    h.versions
        .save_version(
            "nda",
            vec![field("client_name"), field("effective_date")],
            "alice",
            None,
            None,
        )
        .await
        .unwrap();
    h.versions.approve_version("nda", 2, "ruth", None).await.unwrap();

    let stored = h.overrides.frozen_snapshot("intake-1").await.unwrap().unwrap();
    assert_eq!(stored, snapshot);

    // A second freeze is a read, not a write.
    let again = h
        .overrides
        .freeze_intake_version("intake-1", &["nda"], true)
        .await
        .unwrap();
    assert_eq!(again, snapshot);

    let frozen_events = h
        .audit
        .events()
        .into_iter()
        .filter(|event| event.action == AuditAction::IntakeFrozen)
        .count();
    assert_eq!(frozen_events, 1);
}

#[tokio::test]
async fn freeze_without_approval_requires_current_mode() {
    let h = harness();
    h.versions
        .save_version("nda", vec![field("client_name")], "alice", None, None)
        .await
        .unwrap();

    let result = h
        .overrides
        .freeze_intake_version("intake-1", &["nda"], true)
        .await;
    assert!(matches!(result, Err(OverrideError::NoApprovedVersion { .. })));

    let snapshot = h
        .overrides
        .freeze_intake_version("intake-1", &["nda"], false)
        .await
        .unwrap();
    assert_eq!(snapshot.template_versions.get("nda"), Some(&1));
}

#[tokio::test]
async fn freeze_of_unknown_template_fails() {
    let h = harness();
    let result = h
        .overrides
        .freeze_intake_version("intake-1", &["ghost"], false)
        .await;
    assert!(matches!(result, Err(OverrideError::TemplateNotFound(_))));
}

#[tokio::test]
async fn freeze_merges_templates_first_wins() {
    let h = harness();
    let shared = schemavault_core::PlaceholderField::new("client_name", "Client", FieldType::String)
        .with_locations(vec!["header".to_string()]);
    h.versions
        .save_version("nda", vec![shared], "alice", None, None)
        .await
        .unwrap();
    h.versions
        .save_version(
            "msa",
            vec![field("client_name"), field("term_months")],
            "alice",
            None,
            None,
        )
        .await
        .unwrap();

    let snapshot = h
        .overrides
        .freeze_intake_version("intake-1", &["nda", "msa"], false)
        .await
        .unwrap();
    assert_eq!(snapshot.effective_schema.len(), 2);

    // The first-listed template's definition of the shared key survives.
    let winner = snapshot
        .effective_schema
        .get(&FieldKey::new("client_name"))
        .unwrap();
    assert_eq!(winner.label, "Client");
}

#[tokio::test]
async fn collision_routes_to_review_and_approval_folds_in() {
    let h = harness();
    h.versions
        .save_version("nda", vec![field("client_name")], "alice", None, None)
        .await
        .unwrap();
    h.overrides
        .freeze_intake_version("intake-1", &["nda"], false)
        .await
        .unwrap();

    let outcome = h
        .overrides
        .create_override(
            "intake-1",
            "cust-1",
            vec![section(&["client_name", "custom_clause"])],
            "opal",
            None,
        )
        .await
        .unwrap();
    assert_eq!(outcome.status, OverrideStatus::PendingReview);
    assert_eq!(outcome.collisions, vec![FieldKey::new("client_name")]);

    // Pending overrides are invisible to the effective schema.
    let schema = h.overrides.get_effective_schema("intake-1").await.unwrap();
    assert_eq!(schema.len(), 1);

    h.overrides
        .review_override("intake-1", outcome.override_id, ReviewDecision::Approve, "ruth")
        .await
        .unwrap();

    // The colliding key keeps the frozen definition; the new key lands.
    let schema = h.overrides.get_effective_schema("intake-1").await.unwrap();
    assert_eq!(schema.len(), 2);
    assert_eq!(
        schema.get(&FieldKey::new("client_name")).unwrap().label,
        field("client_name").label
    );
    assert!(schema.contains(&FieldKey::new("custom_clause")));
}

#[tokio::test]
async fn overrides_fold_in_creation_order() {
    let h = harness();
    let first = h
        .overrides
        .create_override("intake-1", "cust-1", vec![section(&["alpha_field"])], "opal", None)
        .await
        .unwrap();
    // Ids tie-break on the ULID timestamp; give it a fresh millisecond.
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let second = h
        .overrides
        .create_override("intake-1", "cust-1", vec![section(&["beta_field"])], "opal", None)
        .await
        .unwrap();
    assert!(first.override_id < second.override_id);

    let schema = h.overrides.get_effective_schema("intake-1").await.unwrap();
    assert_eq!(
        schema.keys().cloned().collect::<Vec<_>>(),
        vec![FieldKey::new("alpha_field"), FieldKey::new("beta_field")]
    );
}

#[tokio::test]
async fn apply_override_is_a_pure_read() {
    let h = harness();
    h.versions
        .save_version("nda", vec![field("client_name")], "alice", None, None)
        .await
        .unwrap();
    h.overrides
        .freeze_intake_version("intake-1", &["nda"], false)
        .await
        .unwrap();
    let outcome = h
        .overrides
        .create_override("intake-1", "cust-1", vec![section(&["custom_clause"])], "opal", None)
        .await
        .unwrap();

    let merged = h
        .overrides
        .apply_override("intake-1", outcome.override_id)
        .await
        .unwrap();
    assert_eq!(merged.len(), 2);

    // Nothing was persisted by the merge.
    let stored = h.overrides.frozen_snapshot("intake-1").await.unwrap().unwrap();
    assert_eq!(stored.effective_schema.len(), 1);
}
