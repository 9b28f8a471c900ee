//! Store error types

/// Errors surfaced by the document store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Document absent where one was required
    #[error("document not found: {collection}/{id}")]
    NotFound {
        /// Collection path
        collection: String,
        /// Document id
        id: String,
    },

    /// A transaction kept losing the commit race and gave up
    #[error("transaction contention: gave up after {attempts} attempts")]
    TransactionContention {
        /// Number of commit attempts made
        attempts: u32,
    },

    /// Document payload failed to encode or decode
    #[error("document codec failure: {0}")]
    Codec(#[from] serde_json::Error),

    /// Store-internal invariant violation
    #[error("internal store failure: {0}")]
    Internal(String),
}

impl StoreError {
    /// Create a not-found error
    #[inline]
    #[must_use]
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Create an internal error
    #[inline]
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
