//! Document store contract
//!
//! A keyed document database with atomic read-modify-write transactions.
//! Documents are addressed by `(collection path, id)` and carried as
//! [`serde_json::Value`] payloads; typed records go through [`encode`] and
//! [`decode`].

use crate::error::StoreError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Operations available inside a transaction
///
/// Reads are tracked for conflict validation at commit; writes are buffered
/// and become visible to later reads within the same transaction.
pub trait TransactionOps {
    /// Read a document
    ///
    /// # Errors
    /// Propagates store-level read failures.
    fn get(&mut self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Replace (or create) a document
    fn set(&mut self, collection: &str, id: &str, value: Value);

    /// Shallow-merge fields into an existing document
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the document does not exist.
    fn update(&mut self, collection: &str, id: &str, fields: Map<String, Value>)
        -> Result<(), StoreError>;

    /// Delete a document (no-op if absent)
    fn delete(&mut self, collection: &str, id: &str);
}

/// Transactional keyed document database
///
/// `run_transaction` retries commit-time conflicts automatically; an error
/// returned by the closure aborts without retry. The trait is not
/// object-safe (the transaction closure is generic over the caller's error
/// type), so consumers stay generic over their store.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Read one document
    ///
    /// # Errors
    /// Propagates store-level failures.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Replace (or create) one document
    ///
    /// # Errors
    /// Propagates store-level failures.
    async fn set(&self, collection: &str, id: &str, value: Value) -> Result<(), StoreError>;

    /// Shallow-merge fields into one existing document
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the document does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Delete one document (no-op if absent)
    ///
    /// # Errors
    /// Propagates store-level failures.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// List all documents of a collection, sorted by id
    ///
    /// # Errors
    /// Propagates store-level failures.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError>;

    /// Run one atomic read-modify-write transaction
    ///
    /// The closure may run more than once: it is re-executed from scratch
    /// whenever the commit loses a conflict race. Results must therefore be
    /// captured by overwriting, not accumulating.
    ///
    /// # Errors
    /// Returns the closure's error unchanged (no retry), or
    /// [`StoreError::TransactionContention`] converted into `E` when the
    /// retry budget is exhausted.
    async fn run_transaction<F, E>(&self, f: F) -> Result<(), E>
    where
        F: FnMut(&mut dyn TransactionOps) -> Result<(), E> + Send,
        E: From<StoreError> + Send;
}

/// Encode a typed record into a document payload
///
/// # Errors
/// Returns [`StoreError::Codec`] on serialization failure.
pub fn encode<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(record)?)
}

/// Decode a document payload into a typed record
///
/// # Errors
/// Returns [`StoreError::Codec`] on deserialization failure.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(value)?)
}

/// Collection path layout
///
/// `templates/{templateId}` holds the template record with its embedded
/// lock; `templates/{templateId}/versions/{version}` holds one immutable
/// record per version number; `intakes/{intakeId}` embeds the frozen
/// snapshot; `intakes/{intakeId}/overrides/{overrideId}` holds customer
/// overrides.
pub mod paths {
    /// Top-level template collection
    pub const TEMPLATES: &str = "templates";

    /// Top-level intake collection
    pub const INTAKES: &str = "intakes";

    /// Version subcollection of one template
    #[must_use]
    pub fn template_versions(template_id: &str) -> String {
        format!("{TEMPLATES}/{template_id}/versions")
    }

    /// Override subcollection of one intake
    #[must_use]
    pub fn intake_overrides(intake_id: &str) -> String {
        format!("{INTAKES}/{intake_id}/overrides")
    }
}
