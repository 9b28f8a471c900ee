//! Customer schema deltas and the merge law
//!
//! A [`SchemaDelta`] carries per-customer changes relative to a base schema.
//! Application order is fixed (add, then remove, then modify) so that the
//! merged result is unambiguous no matter how the delta was assembled.

use crate::field::{FieldKey, PlaceholderField, PlaceholderSchema};
use serde::{Deserialize, Serialize};

/// Per-customer changes relative to a base schema
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaDelta {
    /// Fields to add; an add never replaces an existing field of the same key
    #[serde(default)]
    pub added: Vec<PlaceholderField>,
    /// Fields to replace in place; absent keys are silently dropped
    #[serde(default)]
    pub modified: Vec<PlaceholderField>,
    /// Keys to remove
    #[serde(default)]
    pub removed: Vec<FieldKey>,
}

impl SchemaDelta {
    /// The empty delta
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A delta consisting only of additions
    #[must_use]
    pub fn from_added(added: Vec<PlaceholderField>) -> Self {
        Self {
            added,
            ..Self::default()
        }
    }

    /// Whether the delta records no changes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// Keys introduced by this delta that already exist in `base`
    ///
    /// Collisions are computed over the `added` list only: an add that would
    /// shadow an existing global field is the ambiguity a human reviewer has
    /// to resolve.
    #[must_use]
    pub fn collisions_against(&self, base: &PlaceholderSchema) -> Vec<FieldKey> {
        self.added
            .iter()
            .filter(|field| base.contains(&field.field_key))
            .map(|field| field.field_key.clone())
            .collect()
    }

    /// Apply this delta to `base` under the fixed add → remove → modify order
    ///
    /// - add: first-writer-wins, never replaces an existing field
    /// - remove: drops the key if present
    /// - modify: replaces in place; a modify whose key is absent is a no-op
    #[must_use]
    pub fn apply_to(&self, base: &PlaceholderSchema) -> PlaceholderSchema {
        let mut merged = base.clone();
        for field in &self.added {
            merged.insert(field.clone());
        }
        for key in &self.removed {
            merged.remove(key);
        }
        for field in &self.modified {
            merged.replace(field.clone());
        }
        merged
    }
}
