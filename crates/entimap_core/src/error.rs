//! Error types for EntiMap core.

use crate::types::ValueKind;
use entimap_codec::CodecError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while describing, flattening or rebuilding entities.
///
/// Configuration errors are raised while a type is registered and make the
/// type unusable until its schema is fixed; see [`CoreError::is_config`].
/// Everything else is a per-operation mapping error.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Opaque blob codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The concrete type has no zero-argument constructor.
    #[error("there must be a no-arg constructor for {type_name}")]
    MissingConstructor {
        /// Type lacking the constructor.
        type_name: String,
    },

    /// An entity type declares no identifier field.
    #[error("entity type {type_name} has no identifier field")]
    MissingIdField {
        /// The entity type.
        type_name: String,
    },

    /// An alternate (load-only) name is empty or blank.
    #[error("illegal alternate name {name:?} for {field}")]
    InvalidAlternateName {
        /// Field or hook carrying the name.
        field: String,
        /// The offending name.
        name: String,
    },

    /// A field is tagged as both embedded and serialized.
    #[error("cannot embed and serialize the same field: {field}")]
    EmbeddedAndSerialized {
        /// The offending field.
        field: String,
    },

    /// Both `indexed` and `unindexed` were declared on the same target.
    #[error("cannot be both indexed and unindexed: {target}")]
    ConflictingIndexTags {
        /// Field or type name.
        target: String,
    },

    /// A condition class could not be instantiated for a field.
    #[error("cannot construct condition {condition} for {field}")]
    ConditionConstructor {
        /// Condition class name.
        condition: &'static str,
        /// The field it was attached to.
        field: String,
    },

    /// A condition does not apply to the field's value kind.
    #[error("cannot use condition {condition} on {field}: it applies to {expected}, the field holds {found}")]
    ConditionType {
        /// Condition class name.
        condition: &'static str,
        /// The field it was attached to.
        field: String,
        /// Kind the condition applies to.
        expected: ValueKind,
        /// Kind of the field.
        found: ValueKind,
    },

    /// A value-dependent condition was placed inside an embedded collection.
    #[error("cannot use unsaved condition {condition} within an embedded collection; check {field}")]
    ConditionInCollection {
        /// Condition class name.
        condition: &'static str,
        /// The offending field.
        field: String,
    },

    /// A collection nested in an embedded collection.
    #[error("collections cannot be nested inside an embedded collection; check {field}")]
    NestedCollection {
        /// The offending field.
        field: String,
    },

    /// Two fields flatten to the same property path.
    #[error("duplicate property path {path} in {type_name}")]
    DuplicatePath {
        /// Type being described.
        type_name: String,
        /// The colliding path.
        path: String,
    },

    /// A type embeds itself, directly or through other embedded types.
    #[error("recursive embedding of {type_name} through {field}")]
    RecursiveEmbedding {
        /// The type that recurs.
        type_name: String,
        /// Field that closes the cycle.
        field: String,
    },

    /// The record carries no identifier.
    #[error("record of kind {kind} has no identifier")]
    MissingIdentifier {
        /// Kind of the record.
        kind: String,
    },

    /// The record's kind is not the kind of the requested type.
    #[error("expected a record of kind {expected}, got {found}")]
    KindMismatch {
        /// Kind of the requested type.
        expected: String,
        /// Kind on the record.
        found: String,
    },

    /// A stored value has the wrong shape for its field.
    #[error("property {path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Property path.
        path: String,
        /// Expected kind.
        expected: &'static str,
        /// Found kind.
        found: &'static str,
    },

    /// A stored integer does not fit the declared field type.
    #[error("property {path}: {value} does not fit in {target}")]
    ValueOutOfRange {
        /// Property path.
        path: String,
        /// Stored value.
        value: i64,
        /// Declared Rust type.
        target: &'static str,
    },

    /// An instance handed to the engine is not of the described type.
    #[error("instance is not a {expected}")]
    WrongInstance {
        /// Expected type name.
        expected: &'static str,
    },
}

impl CoreError {
    /// Returns true for errors raised while registering a type.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::MissingConstructor { .. }
                | Self::MissingIdField { .. }
                | Self::InvalidAlternateName { .. }
                | Self::EmbeddedAndSerialized { .. }
                | Self::ConflictingIndexTags { .. }
                | Self::ConditionConstructor { .. }
                | Self::ConditionType { .. }
                | Self::ConditionInCollection { .. }
                | Self::NestedCollection { .. }
                | Self::DuplicatePath { .. }
                | Self::RecursiveEmbedding { .. }
        )
    }

    /// Creates a missing identifier error.
    pub fn missing_identifier(kind: impl Into<String>) -> Self {
        Self::MissingIdentifier { kind: kind.into() }
    }

    /// Creates an invalid alternate name error.
    pub fn invalid_alternate_name(field: impl Into<String>, name: impl Into<String>) -> Self {
        Self::InvalidAlternateName {
            field: field.into(),
            name: name.into(),
        }
    }

    /// Attaches a property path to a value conversion failure.
    pub fn value_at(path: impl Into<String>, err: crate::atomic::ValueError) -> Self {
        use crate::atomic::ValueError;

        match err {
            ValueError::Mismatch { expected, found } => Self::TypeMismatch {
                path: path.into(),
                expected,
                found,
            },
            ValueError::OutOfRange { value, target } => Self::ValueOutOfRange {
                path: path.into(),
                value,
                target,
            },
        }
    }
}
