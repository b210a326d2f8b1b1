//! Record store abstraction.

use crate::error::CoreResult;
use crate::record::FlatRecord;
use entimap_codec::{KeyId, RecordKey, Value};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// A store of flat records keyed by [`RecordKey`].
///
/// The mapper only needs these three operations. Stores decide what
/// indexing means; the mapper only tells them which properties should be
/// indexed.
///
/// # Implementors
///
/// - [`MemoryStore`] - For tests and embedding
pub trait RecordStore: Send + Sync {
    /// Stores a record, replacing any record with the same key.
    ///
    /// A record without an identifier gets a fresh numeric one. Returns the
    /// key the record was stored under.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the record.
    fn put(&self, record: FlatRecord) -> CoreResult<RecordKey>;

    /// Loads a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, key: &RecordKey) -> CoreResult<Option<FlatRecord>>;

    /// Deletes a record. Deleting a missing record is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn delete(&self, key: &RecordKey) -> CoreResult<()>;
}

/// An in-memory record store.
///
/// Equality filters only see indexed properties, like a real datastore
/// whose unindexed properties are invisible to queries.
///
/// # Example
///
/// ```rust
/// use entimap_core::{FlatRecord, MemoryStore, RecordStore, Value};
///
/// let store = MemoryStore::new();
/// let mut record = FlatRecord::new("Note");
/// record.set("title", Value::Text("hello".into()), true);
/// let key = store.put(record).unwrap();
/// assert!(store.get(&key).unwrap().is_some());
/// assert_eq!(store.filter_eq("Note", "title", &Value::Text("hello".into())).len(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<RecordKey, FlatRecord>>,
    next_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Records of `kind` whose indexed property `path` equals `value`.
    ///
    /// A multi-valued property matches when any of its elements does.
    #[must_use]
    pub fn filter_eq(&self, kind: &str, path: &str, value: &Value) -> Vec<FlatRecord> {
        self.records
            .read()
            .values()
            .filter(|record| record.kind() == kind)
            .filter(|record| {
                record
                    .get(path)
                    .is_some_and(|p| p.indexed && p.value.matches_filter(value))
            })
            .cloned()
            .collect()
    }

    fn allocate_id(&self) -> KeyId {
        KeyId::Id(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl RecordStore for MemoryStore {
    fn put(&self, mut record: FlatRecord) -> CoreResult<RecordKey> {
        let id = match record.id() {
            Some(id) => id.clone(),
            None => {
                let id = self.allocate_id();
                record.set_id(Some(id.clone()));
                id
            }
        };
        let key = match record.parent() {
            Some(parent) => RecordKey::with_parent(parent.clone(), record.kind(), id),
            None => RecordKey::new(record.kind(), id),
        };
        tracing::debug!(%key, properties = record.len(), "put record");
        self.records.write().insert(key.clone(), record);
        Ok(key)
    }

    fn get(&self, key: &RecordKey) -> CoreResult<Option<FlatRecord>> {
        Ok(self.records.read().get(key).cloned())
    }

    fn delete(&self, key: &RecordKey) -> CoreResult<()> {
        if self.records.write().remove(key).is_some() {
            tracing::debug!(%key, "deleted record");
        }
        Ok(())
    }
}
