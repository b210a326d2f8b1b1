//! Record keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The identifier part of a record key.
///
/// Stores address records either by a numeric id (usually allocated by the
/// store) or by a caller-chosen name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyId {
    /// Numeric identifier.
    Id(i64),
    /// String identifier.
    Name(String),
}

impl KeyId {
    /// Returns the numeric id, if this is one.
    #[must_use]
    pub fn as_id(&self) -> Option<i64> {
        match self {
            KeyId::Id(id) => Some(*id),
            KeyId::Name(_) => None,
        }
    }

    /// Returns the name, if this is one.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            KeyId::Id(_) => None,
            KeyId::Name(name) => Some(name),
        }
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Id(id) => write!(f, "{id}"),
            KeyId::Name(name) => write!(f, "{name:?}"),
        }
    }
}

impl From<i64> for KeyId {
    fn from(id: i64) -> Self {
        KeyId::Id(id)
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        KeyId::Name(name.to_string())
    }
}

impl From<String> for KeyId {
    fn from(name: String) -> Self {
        KeyId::Name(name)
    }
}

/// A complete record key: kind, identifier and optional parent.
///
/// Keys with a parent form an ancestor path; two keys are equal only if
/// their whole paths are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    kind: String,
    id: KeyId,
    parent: Option<Box<RecordKey>>,
}

impl RecordKey {
    /// Creates a root key.
    pub fn new(kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            parent: None,
        }
    }

    /// Creates a key below `parent`.
    pub fn with_parent(parent: RecordKey, kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            parent: Some(Box::new(parent)),
        }
    }

    /// Returns the kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the identifier.
    #[must_use]
    pub fn id(&self) -> &KeyId {
        &self.id
    }

    /// Returns the parent key, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&RecordKey> {
        self.parent.as_deref()
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{parent}/")?;
        }
        write!(f, "{}({})", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_ancestors() {
        let parent = RecordKey::new("Trivial", 7_i64);
        let child = RecordKey::with_parent(parent, "Child", "cry");
        assert_eq!(child.to_string(), "Trivial(7)/Child(\"cry\")");
    }

    #[test]
    fn keys_with_different_parents_differ() {
        let a = RecordKey::with_parent(RecordKey::new("P", 1_i64), "C", 5_i64);
        let b = RecordKey::with_parent(RecordKey::new("P", 2_i64), "C", 5_i64);
        assert_ne!(a, b);
        assert_eq!(a.parent().map(RecordKey::id), Some(&KeyId::Id(1)));
    }

    #[test]
    fn key_id_accessors() {
        assert_eq!(KeyId::from(3).as_id(), Some(3));
        assert_eq!(KeyId::from("x").as_name(), Some("x"));
        assert_eq!(KeyId::from("x").as_id(), None);
    }
}
