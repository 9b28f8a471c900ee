//! Opaque optimistic-concurrency tokens

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque concurrency token, rotated on every schema-changing mutation
///
/// An `ETag` compares only with other `ETag`s; it carries no ordering and no
/// relation to version numbers. Callers hold the tag they read and present it
/// on save to detect a racing writer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ETag(String);

impl ETag {
    /// Generate a fresh token
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the raw token
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ETag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
