//! # EntiMap Codec
//!
//! Value model shared by EntiMap and the stores it talks to.
//!
//! This crate provides:
//! - [`Value`], the atomic property value of a flat record
//! - [`RecordKey`] and [`KeyId`], the addresses of records
//! - opaque CBOR blobs for fields stored with serialized (opaque) storage
//!
//! ## Usage
//!
//! ```
//! use entimap_codec::{from_cbor, to_cbor, Value};
//!
//! let value = Value::Array(vec![Value::Integer(42), Value::Null]);
//! let bytes = to_cbor(&value).unwrap();
//!
//! let decoded: Value = from_cbor(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod key;
mod value;

pub use error::{CodecError, CodecResult};
pub use key::{KeyId, RecordKey};
pub use value::Value;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode any serde value into a CBOR blob.
///
/// # Errors
///
/// Returns an error if the value's `Serialize` implementation fails.
pub fn to_cbor<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(bytes)
}

/// Decode a CBOR blob produced by [`to_cbor`].
///
/// # Errors
///
/// Returns an error if the bytes are not valid CBOR for `T`.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

/// Decode a serialized blob stored as a property value.
///
/// # Errors
///
/// Returns an error if `value` is not a byte string or fails to decode.
pub fn from_blob<T: DeserializeOwned>(value: &Value) -> CodecResult<T> {
    let bytes = value
        .as_bytes()
        .ok_or_else(|| CodecError::unexpected("bytes", value.type_name()))?;
    from_cbor(bytes)
}
