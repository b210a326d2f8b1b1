//! Core type definitions for EntiMap.

use std::fmt;

/// Statically declared kind of a field's value.
///
/// Conditions declare the kind they apply to and are checked against the
/// field's kind at registration. Nullable fields (`Option<T>`) share the kind
/// of `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `bool`.
    Bool,
    /// Any integer width.
    Integer,
    /// `f32` or `f64`.
    Float,
    /// `String`.
    Text,
    /// `Vec<u8>`.
    Bytes,
    /// A record key.
    Key,
    /// A collection or array.
    List,
    /// An embedded object.
    Object,
    /// An opaque serialized value.
    Opaque,
    /// Accepts every kind; only meaningful on conditions.
    Any,
}

impl ValueKind {
    /// Returns true if a condition declared for `self` can test a field of `field`.
    #[must_use]
    pub fn accepts(self, field: ValueKind) -> bool {
        self == ValueKind::Any || self == field
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Bytes => "bytes",
            ValueKind::Key => "key",
            ValueKind::List => "list",
            ValueKind::Object => "object",
            ValueKind::Opaque => "opaque",
            ValueKind::Any => "any",
        };
        f.write_str(name)
    }
}

/// Extends a property path with one more segment.
///
/// Returns `name` unchanged when `prefix` is empty.
#[must_use]
pub fn extend_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Suffix of the sideband property listing null positions.
pub const NULL_INDEX_SUFFIX: &str = "^null";

/// Returns the sideband path holding the null indices for `path`.
#[must_use]
pub fn null_index_path(path: &str) -> String {
    format!("{path}{NULL_INDEX_SUFFIX}")
}
