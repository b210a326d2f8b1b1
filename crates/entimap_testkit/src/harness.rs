//! Round-trip harness over a mapper and an in-memory store.
//!
//! Entities are compared through their flattened records, so transient
//! fields and unsaved values never cause false mismatches.

use entimap_core::{Config, FlatRecord, Mapped, Mapper, MemoryStore, RecordKey, RecordStore, Registry};
use std::collections::HashMap;
use std::fmt::Debug;

/// A test harness that tracks what it stored and checks it reads back.
pub struct MappingHarness {
    /// The mapper under test.
    pub mapper: Mapper<MemoryStore>,
    records: HashMap<RecordKey, FlatRecord>,
}

impl MappingHarness {
    /// Creates a harness with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a harness with its own configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            mapper: Mapper::with_config(MemoryStore::new(), config),
            records: HashMap::new(),
        }
    }

    /// Puts an entity, then loads it back and compares flattened state.
    pub fn put_and_verify<T: Mapped + Debug>(&mut self, entity: &mut T) -> RecordKey {
        let key = self.mapper.put(entity).expect("Failed to put entity");
        let expected = self.mapper.flatten(entity).expect("Failed to flatten entity");

        let loaded: T = self
            .mapper
            .get(&key)
            .expect("Failed to get entity")
            .unwrap_or_else(|| panic!("Entity {key} missing after put"));
        let actual = self.mapper.flatten(&loaded).expect("Failed to flatten loaded entity");
        assert_eq!(actual, expected, "Record mismatch for {key}");

        self.records.insert(key.clone(), expected);
        key
    }

    /// Deletes an entity and checks it is gone.
    pub fn delete_and_verify(&mut self, key: &RecordKey) {
        self.mapper.delete(key).expect("Failed to delete entity");
        let stored = self.mapper.store().get(key).expect("Failed to get record");
        assert!(stored.is_none(), "Record {key} still present after delete");
        self.records.remove(key);
    }

    /// Verifies every tracked record is still stored unchanged.
    pub fn verify_all(&self) {
        for (key, expected) in &self.records {
            let actual = self.mapper.store().get(key).expect("Failed to get record");
            assert_eq!(actual.as_ref(), Some(expected), "Record mismatch for {key}");
        }
    }

    /// Returns the record tracked under `key`.
    pub fn record(&self, key: &RecordKey) -> Option<&FlatRecord> {
        self.records.get(key)
    }

    /// Returns the count of tracked records.
    pub fn tracked_count(&self) -> usize {
        self.records.len()
    }
}

impl Default for MappingHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Flattens `entity`, rebuilds it and checks the rebuilt entity flattens
/// to the same record. Returns the rebuilt entity.
pub fn assert_round_trip<T: Mapped + Debug>(registry: &Registry, entity: &T) -> T {
    let record = registry.flatten(entity).expect("Failed to flatten entity");
    let rebuilt: T = registry.rebuild(&record).expect("Failed to rebuild entity");
    let again = registry.flatten(&rebuilt).expect("Failed to flatten rebuilt entity");
    assert_eq!(again, record, "Round trip changed {entity:?}");
    rebuilt
}
