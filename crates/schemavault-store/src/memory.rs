//! Optimistic in-memory document store
//!
//! Reference implementation of [`DocumentStore`] used by tests and local
//! tooling. Transactions are optimistic: reads record the revision they
//! observed, writes are buffered, and commit validates the read set under a
//! single write lock. Revisions come from one global counter so a
//! delete-and-recreate can never masquerade as the document a transaction
//! originally read.

use crate::error::StoreError;
use crate::store::{DocumentStore, TransactionOps};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

const MAX_COMMIT_ATTEMPTS: u32 = 32;

type DocKey = (String, String);

#[derive(Debug, Clone)]
struct StoredDoc {
    value: Value,
    revision: u64,
}

/// In-memory transactional document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<DocKey, StoredDoc>>,
    next_revision: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_revision(&self) -> u64 {
        self.next_revision.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn key(collection: &str, id: &str) -> DocKey {
        (collection.to_string(), id.to_string())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let docs = self.docs.read();
        Ok(docs.get(&Self::key(collection, id)).map(|doc| doc.value.clone()))
    }

    async fn set(&self, collection: &str, id: &str, value: Value) -> Result<(), StoreError> {
        let revision = self.bump_revision();
        let mut docs = self.docs.write();
        docs.insert(Self::key(collection, id), StoredDoc { value, revision });
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let revision = self.bump_revision();
        let mut docs = self.docs.write();
        let doc = docs
            .get_mut(&Self::key(collection, id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        merge_fields(&mut doc.value, fields);
        doc.revision = revision;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut docs = self.docs.write();
        docs.remove(&Self::key(collection, id));
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let docs = self.docs.read();
        let mut entries: Vec<(String, Value)> = docs
            .iter()
            .filter(|((coll, _), _)| coll == collection)
            .map(|((_, id), doc)| (id.clone(), doc.value.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    async fn run_transaction<F, E>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&mut dyn TransactionOps) -> Result<(), E> + Send,
        E: From<StoreError> + Send,
    {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let committed = {
                let mut txn = MemoryTransaction::new(self);
                f(&mut txn)?;
                txn.commit()
            };
            if committed {
                return Ok(());
            }
            tracing::debug!(attempt, "transaction lost commit race, retrying");
            tokio::task::yield_now().await;
        }
        Err(E::from(StoreError::TransactionContention {
            attempts: MAX_COMMIT_ATTEMPTS,
        }))
    }
}

fn merge_fields(target: &mut Value, fields: Map<String, Value>) {
    if let Value::Object(obj) = target {
        for (key, value) in fields {
            obj.insert(key, value);
        }
    } else {
        *target = Value::Object(fields);
    }
}

#[derive(Debug)]
enum WriteOp {
    Set(Value),
    Delete,
}

/// One in-flight optimistic transaction
///
/// Reads cache both the observed revision and the observed value so repeated
/// reads within the transaction stay consistent even if the store moves on
/// underneath (the commit will fail in that case anyway).
#[derive(Debug)]
struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    reads: HashMap<DocKey, (Option<u64>, Option<Value>)>,
    writes: Vec<(DocKey, WriteOp)>,
}

impl<'a> MemoryTransaction<'a> {
    fn new(store: &'a MemoryStore) -> Self {
        Self {
            store,
            reads: HashMap::new(),
            writes: Vec::new(),
        }
    }

    fn buffered(&self, key: &DocKey) -> Option<&WriteOp> {
        self.writes
            .iter()
            .rev()
            .find(|(written, _)| written == key)
            .map(|(_, op)| op)
    }

    /// Validate the read set and apply buffered writes. Returns `false` on a
    /// conflict, in which case nothing was applied.
    fn commit(self) -> bool {
        let mut docs = self.store.docs.write();
        for (key, (observed_revision, _)) in &self.reads {
            let current = docs.get(key).map(|doc| doc.revision);
            if current != *observed_revision {
                return false;
            }
        }
        for (key, op) in self.writes {
            match op {
                WriteOp::Set(value) => {
                    let revision = self.store.bump_revision();
                    docs.insert(key, StoredDoc { value, revision });
                }
                WriteOp::Delete => {
                    docs.remove(&key);
                }
            }
        }
        true
    }
}

impl TransactionOps for MemoryTransaction<'_> {
    fn get(&mut self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let key = MemoryStore::key(collection, id);
        if let Some(op) = self.buffered(&key) {
            return Ok(match op {
                WriteOp::Set(value) => Some(value.clone()),
                WriteOp::Delete => None,
            });
        }
        if let Some((_, cached)) = self.reads.get(&key) {
            return Ok(cached.clone());
        }
        let observed = {
            let docs = self.store.docs.read();
            docs.get(&key).cloned()
        };
        let (revision, value) = match observed {
            Some(doc) => (Some(doc.revision), Some(doc.value)),
            None => (None, None),
        };
        self.reads.insert(key, (revision, value.clone()));
        Ok(value)
    }

    fn set(&mut self, collection: &str, id: &str, value: Value) {
        self.writes
            .push((MemoryStore::key(collection, id), WriteOp::Set(value)));
    }

    fn update(
        &mut self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let mut current = self
            .get(collection, id)?
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        merge_fields(&mut current, fields);
        self.set(collection, id, current);
        Ok(())
    }

    fn delete(&mut self, collection: &str, id: &str) {
        self.writes
            .push((MemoryStore::key(collection, id), WriteOp::Delete));
    }
}
