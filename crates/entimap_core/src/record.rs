//! Flat property records.
//!
//! A [`FlatRecord`] is what the store sees: a kind, an optional identifier and
//! parent, and a map of dotted property paths to values. Each property is
//! either indexed (visible to filters) or unindexed.

use crate::error::{CoreError, CoreResult};
use crate::types::null_index_path;
use entimap_codec::{KeyId, RecordKey, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;

/// One stored property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// The stored value. Multi-valued properties hold a [`Value::Array`].
    pub value: Value,
    /// Whether the store indexes this property.
    pub indexed: bool,
}

/// A flattened entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord {
    kind: String,
    id: Option<KeyId>,
    parent: Option<RecordKey>,
    properties: BTreeMap<String, Property>,
}

impl FlatRecord {
    /// Creates an empty record of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            parent: None,
            properties: BTreeMap::new(),
        }
    }

    /// Store kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Identifier, if allocated.
    #[must_use]
    pub fn id(&self) -> Option<&KeyId> {
        self.id.as_ref()
    }

    /// Sets the identifier.
    pub fn set_id(&mut self, id: Option<KeyId>) {
        self.id = id;
    }

    /// Parent key, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&RecordKey> {
        self.parent.as_ref()
    }

    /// Sets the parent key.
    pub fn set_parent(&mut self, parent: Option<RecordKey>) {
        self.parent = parent;
    }

    /// The full key of this record, once it has an identifier.
    #[must_use]
    pub fn key(&self) -> Option<RecordKey> {
        let id = self.id.clone()?;
        Some(match &self.parent {
            Some(parent) => RecordKey::with_parent(parent.clone(), self.kind.clone(), id),
            None => RecordKey::new(self.kind.clone(), id),
        })
    }

    /// Sets a property, replacing any previous value.
    pub fn set(&mut self, path: impl Into<String>, value: Value, indexed: bool) {
        self.properties
            .insert(path.into(), Property { value, indexed });
    }

    /// Appends a value to a multi-valued property, creating it if absent.
    pub fn append(&mut self, path: &str, value: Value, indexed: bool) {
        match self.properties.get_mut(path) {
            Some(property) => match &mut property.value {
                Value::Array(items) => items.push(value),
                single => {
                    let first = std::mem::replace(single, Value::Null);
                    *single = Value::Array(vec![first, value]);
                }
            },
            None => self.set(path, Value::Array(vec![value]), indexed),
        }
    }

    /// Removes a property.
    pub fn remove(&mut self, path: &str) -> Option<Property> {
        self.properties.remove(path)
    }

    /// Returns a property.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Property> {
        self.properties.get(path)
    }

    /// Returns a property's value.
    #[must_use]
    pub fn value(&self, path: &str) -> Option<&Value> {
        self.properties.get(path).map(|p| &p.value)
    }

    /// Returns true if the property exists.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.properties.contains_key(path)
    }

    /// Returns true if any property path starts with `prefix`.
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.properties
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .next()
            .is_some_and(|(path, _)| path.starts_with(prefix))
    }

    /// Null positions recorded for the embedded collection at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TypeMismatch`] if the sideband does not hold
    /// non-negative integers.
    pub fn null_indexes(&self, path: &str) -> CoreResult<Option<Vec<usize>>> {
        let sideband = null_index_path(path);
        let Some(value) = self.value(&sideband) else {
            return Ok(None);
        };
        let items = match value {
            Value::Array(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };
        items
            .iter()
            .map(|item| {
                item.as_integer()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| CoreError::TypeMismatch {
                        path: sideband.clone(),
                        expected: "index",
                        found: item.type_name(),
                    })
            })
            .collect::<CoreResult<Vec<_>>>()
            .map(Some)
    }

    /// Records one more null position for the collection at `path`.
    pub fn push_null_index(&mut self, path: &str, index: usize) {
        self.append(&null_index_path(path), index_value(index), false);
    }

    /// Replaces the null positions of the collection at `path`.
    pub fn set_null_indexes(&mut self, path: &str, indexes: &[usize]) {
        let items = indexes.iter().copied().map(index_value).collect();
        self.set(null_index_path(path), Value::Array(items), false);
    }

    /// Marks the embedded object at `path` as present even though it wrote
    /// no properties. Shares the `^null` sideband, holding `false`.
    pub fn mark_present(&mut self, path: &str) {
        self.set(null_index_path(path), Value::Bool(false), false);
    }

    /// Returns true if [`mark_present`](Self::mark_present) was applied to `path`.
    #[must_use]
    pub fn is_marked_present(&self, path: &str) -> bool {
        matches!(self.value(&null_index_path(path)), Some(Value::Bool(false)))
    }

    /// All properties, ordered by path.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Indexed properties, ordered by path.
    pub fn indexed(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties()
            .filter(|(_, p)| p.indexed)
            .map(|(k, p)| (k, &p.value))
    }

    /// Unindexed properties, ordered by path.
    pub fn unindexed(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties()
            .filter(|(_, p)| !p.indexed)
            .map(|(k, p)| (k, &p.value))
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns true if the record has no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

fn index_value(index: usize) -> Value {
    Value::Integer(i64::try_from(index).unwrap_or(i64::MAX))
}
