//! Schema diffing between consecutive template versions
//!
//! The diff is structural, not textual: three typed lists instead of a
//! free-form patch. Rename detection is a best-effort heuristic keyed on
//! location signatures and can both under- and over-detect.

use crate::field::{FieldKey, PlaceholderField, PlaceholderSchema};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A detected rename: the same physical location changed its field key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamedField {
    /// Key in the previous schema
    pub from: FieldKey,
    /// Key in the new schema
    pub to: FieldKey,
}

/// Structural difference between two placeholder schemas
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaceholderDiff {
    /// Fields present in the new schema only
    pub added: Vec<PlaceholderField>,
    /// Fields present in the old schema only
    pub removed: Vec<PlaceholderField>,
    /// Likely renames, detected by location signature
    pub renamed: Vec<RenamedField>,
}

impl PlaceholderDiff {
    /// The empty diff (used for rollback versions)
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the diff records no changes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.renamed.is_empty()
    }

    /// Compute the diff from `old` to `new`
    ///
    /// `added`/`removed` are decided purely by key-set membership. `renamed`
    /// pairs an old key with a new key when both occupy the same location
    /// signature; it is advisory and independent of the other two lists.
    #[must_use]
    pub fn between(old: &PlaceholderSchema, new: &PlaceholderSchema) -> Self {
        let added = new
            .fields()
            .filter(|field| !old.contains(&field.field_key))
            .cloned()
            .collect();
        let removed = old
            .fields()
            .filter(|field| !new.contains(&field.field_key))
            .cloned()
            .collect();

        let old_by_location: HashMap<String, &FieldKey> = old
            .fields()
            .filter_map(|field| {
                field
                    .location_signature()
                    .map(|sig| (sig, &field.field_key))
            })
            .collect();

        let mut renamed = Vec::new();
        for field in new.fields() {
            let Some(signature) = field.location_signature() else {
                continue;
            };
            if let Some(old_key) = old_by_location.get(&signature) {
                if **old_key != field.field_key {
                    renamed.push(RenamedField {
                        from: (*old_key).clone(),
                        to: field.field_key.clone(),
                    });
                }
            }
        }

        Self {
            added,
            removed,
            renamed,
        }
    }
}
