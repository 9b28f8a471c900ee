//! End-to-end version lifecycle tests against the in-memory store.

use std::collections::BTreeSet;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use schemavault_core::FieldKey;
use schemavault_store::MemoryStore;
use schemavault_test_utils::{field, located_field, ManualClock, RecordingAuditLogger};
use schemavault_version::{TemplateVersionManager, VersionStatus};

fn manager() -> TemplateVersionManager<MemoryStore> {
    TemplateVersionManager::new(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingAuditLogger::default()),
        Arc::new(ManualClock::default()),
    )
}

#[tokio::test]
async fn save_approve_rollback_lifecycle() {
    let manager = manager();

    let v1 = manager
        .save_version("nda", vec![field("client_name")], "alice", None, None)
        .await
        .unwrap();
    assert_eq!(v1.version, 1);

    let v2 = manager
        .save_version(
            "nda",
            vec![field("client_name"), field("effective_date")],
            "alice",
            Some("added effective date".to_string()),
            Some(&v1.etag),
        )
        .await
        .unwrap();
    assert_eq!(v2.version, 2);
    assert_eq!(v2.diff.added.len(), 1);
    assert_eq!(v2.diff.added[0].field_key, FieldKey::new("effective_date"));
    assert!(v2.diff.removed.is_empty());

    manager.approve_version("nda", 2, "ruth", None).await.unwrap();
    let template = manager.get_template("nda").await.unwrap();
    assert_eq!(template.latest_approved_version, Some(2));
    assert_eq!(template.current_version, 2);

    // Rollback never rewinds the counter and never touches approval.
    let rollback = manager
        .rollback_to_version("nda", 1, "alice", "drop the date")
        .await
        .unwrap();
    assert_eq!(rollback.new_version, 3);

    let template = manager.get_template("nda").await.unwrap();
    assert_eq!(template.current_version, 3);
    assert_eq!(template.latest_approved_version, Some(2));

    let history = manager.list_versions("nda").await.unwrap();
    assert_eq!(
        history.iter().map(|v| v.version).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(history[1].status, VersionStatus::Approved);
    assert!(history[2].is_rollback());
}

#[tokio::test]
async fn renames_are_detected_by_location() {
    let manager = manager();
    manager
        .save_version(
            "nda",
            vec![located_field("client_name", &["header", "signature"])],
            "alice",
            None,
            None,
        )
        .await
        .unwrap();

    let outcome = manager
        .save_version(
            "nda",
            vec![located_field("customer_name", &["signature", "header"])],
            "alice",
            None,
            None,
        )
        .await
        .unwrap();

    // Rename reporting is advisory; the key-set diff stands on its own.
    assert_eq!(outcome.diff.added.len(), 1);
    assert_eq!(outcome.diff.added[0].field_key, FieldKey::new("customer_name"));
    assert_eq!(outcome.diff.removed.len(), 1);
    assert_eq!(outcome.diff.removed[0].field_key, FieldKey::new("client_name"));
    assert_eq!(outcome.diff.renamed.len(), 1);
    assert_eq!(outcome.diff.renamed[0].from, FieldKey::new("client_name"));
    assert_eq!(outcome.diff.renamed[0].to, FieldKey::new("customer_name"));
}

#[tokio::test]
async fn racing_saves_assign_contiguous_versions() {
    let manager = Arc::new(manager());

    let mut handles = Vec::new();
    for writer in 0..8 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            let user = format!("user-{writer}");
            manager
                .save_version("nda", vec![field("client_name")], &user, None, None)
                .await
                .map(|outcome| outcome.version)
        }));
    }

    let mut versions = BTreeSet::new();
    for handle in handles {
        versions.insert(handle.await.unwrap().unwrap());
    }

    // No gaps, no duplicates: each writer got a distinct slot.
    assert_eq!(versions, (1..=8).collect::<BTreeSet<u64>>());

    let template = manager.get_template("nda").await.unwrap();
    assert_eq!(template.current_version, 8);
    assert_eq!(manager.list_versions("nda").await.unwrap().len(), 8);
}

#[tokio::test]
async fn each_save_rotates_the_etag() {
    let manager = manager();
    let first = manager
        .save_version("nda", vec![field("a1")], "alice", None, None)
        .await
        .unwrap();
    let second = manager
        .save_version("nda", vec![field("b1")], "alice", None, None)
        .await
        .unwrap();
    assert_ne!(first.etag, second.etag);

    let template = manager.get_template("nda").await.unwrap();
    assert_eq!(template.etag, second.etag);
}
