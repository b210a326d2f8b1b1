//! Atomic field values and their coercion rules.

use crate::types::ValueKind;
use entimap_codec::{KeyId, RecordKey, Value};

/// Why a stored value could not be assigned to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The stored value has a different shape.
    Mismatch {
        /// Expected value name.
        expected: &'static str,
        /// Found value name.
        found: &'static str,
    },
    /// The stored integer does not fit the field's width.
    OutOfRange {
        /// Stored integer.
        value: i64,
        /// Rust type of the field.
        target: &'static str,
    },
}

impl ValueError {
    fn mismatch(expected: &'static str, found: &Value) -> Self {
        Self::Mismatch {
            expected,
            found: found.type_name(),
        }
    }
}

/// A field type stored as a single property value.
///
/// Implemented for `bool`, the integer types up to 64 bits, `f32` and `f64`
/// (stored as a double), `String`,
/// `Vec<u8>` (stored as bytes), [`RecordKey`] and `Option` of any of these.
/// `Option<T>` maps `None` to a null property.
pub trait Atomic: Sized + Send + Sync + 'static {
    /// Kind used to check unsaved conditions against this type.
    const KIND: ValueKind;

    /// Converts the field value into a property value.
    fn to_value(&self) -> Value;

    /// Converts a stored property value back into the field type.
    ///
    /// # Errors
    ///
    /// Fails when the value has another shape or does not fit.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl Atomic for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(ValueError::mismatch("bool", &other)),
        }
    }
}

// Every stored integer is an i64; narrower fields accept it when it fits.
macro_rules! impl_atomic_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Atomic for $ty {
                const KIND: ValueKind = ValueKind::Integer;

                fn to_value(&self) -> Value {
                    Value::Integer(i64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    match value {
                        Value::Integer(n) => <$ty>::try_from(n).map_err(|_| ValueError::OutOfRange {
                            value: n,
                            target: stringify!($ty),
                        }),
                        other => Err(ValueError::mismatch("integer", &other)),
                    }
                }
            }
        )*
    };
}

impl_atomic_integer!(i8, i16, i32, i64, u8, u16, u32);

impl Atomic for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(n) => Ok(n),
            other => Err(ValueError::mismatch("float", &other)),
        }
    }
}

// Saved widened to a double. Loading narrows back, so values written from an
// `f32` field come back exactly.
impl Atomic for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(n) => Ok(n as f32),
            other => Err(ValueError::mismatch("float", &other)),
        }
    }
}

impl Atomic for String {
    const KIND: ValueKind = ValueKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(ValueError::mismatch("text", &other)),
        }
    }
}

impl Atomic for Vec<u8> {
    const KIND: ValueKind = ValueKind::Bytes;

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => Err(ValueError::mismatch("bytes", &other)),
        }
    }
}

impl Atomic for RecordKey {
    const KIND: ValueKind = ValueKind::Key;

    fn to_value(&self) -> Value {
        Value::Key(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Key(k) => Ok(k),
            other => Err(ValueError::mismatch("key", &other)),
        }
    }
}

impl<T: Atomic> Atomic for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, Atomic::to_value)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// A field type usable as an entity identifier.
///
/// `Option` identifiers start out as `None` and are filled in when a store
/// allocates an id.
pub trait IdValue: Sized + Send + Sync + 'static {
    /// Returns the identifier, or `None` if it is not allocated yet.
    fn to_key_id(&self) -> Option<KeyId>;

    /// Converts a record identifier into the field type.
    ///
    /// # Errors
    ///
    /// Fails when a numeric field receives a name or vice versa.
    fn from_key_id(id: KeyId) -> Result<Self, ValueError>;
}

fn key_id_name(id: &KeyId) -> &'static str {
    match id {
        KeyId::Id(_) => "numeric id",
        KeyId::Name(_) => "name",
    }
}

impl IdValue for i64 {
    fn to_key_id(&self) -> Option<KeyId> {
        Some(KeyId::Id(*self))
    }

    fn from_key_id(id: KeyId) -> Result<Self, ValueError> {
        match id {
            KeyId::Id(n) => Ok(n),
            other => Err(ValueError::Mismatch {
                expected: "numeric id",
                found: key_id_name(&other),
            }),
        }
    }
}

impl IdValue for String {
    fn to_key_id(&self) -> Option<KeyId> {
        Some(KeyId::Name(self.clone()))
    }

    fn from_key_id(id: KeyId) -> Result<Self, ValueError> {
        match id {
            KeyId::Name(name) => Ok(name),
            other => Err(ValueError::Mismatch {
                expected: "name",
                found: key_id_name(&other),
            }),
        }
    }
}

impl<I: IdValue> IdValue for Option<I> {
    fn to_key_id(&self) -> Option<KeyId> {
        self.as_ref().and_then(IdValue::to_key_id)
    }

    fn from_key_id(id: KeyId) -> Result<Self, ValueError> {
        I::from_key_id(id).map(Some)
    }
}
