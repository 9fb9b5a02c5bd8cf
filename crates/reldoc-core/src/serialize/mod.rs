//! Document serialization.
//!
//! Documents are stored as canonical JSON: the value is first lowered to a
//! `serde_json::Value` tree (object keys sorted), then written out. Equal
//! documents therefore produce equal bytes and equal content hashes, even
//! when the Rust type holds unordered maps.
mod hash;
mod json;

pub use hash::ContentHash;

use crate::error::{Error, ErrorCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error as ThisError;

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("document could not be encoded as json: {0}")]
    Encode(String),

    #[error("stored bytes are not a valid document: {0}")]
    Decode(String),

    #[error("stored document is {len} bytes, over the {limit} byte limit")]
    TooLarge { len: usize, limit: usize },
}

impl SerializeError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Encode(_) => ErrorCode::Serialize,
            Self::Decode(_) => ErrorCode::Deserialize,
            Self::TooLarge { .. } => ErrorCode::DeserializeSizeLimitExceeded,
        }
    }
}

impl From<SerializeError> for Error {
    fn from(err: SerializeError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

/// Serialize a value to canonical bytes.
pub fn serialize<T>(value: &T) -> Result<Vec<u8>, SerializeError>
where
    T: Serialize + ?Sized,
{
    json::serialize(value)
}

/// Deserialize a value produced by [`serialize`].
pub fn deserialize<T>(bytes: &[u8]) -> Result<T, SerializeError>
where
    T: DeserializeOwned,
{
    json::deserialize_bounded(bytes, crate::MAX_DOCUMENT_BYTES)
}

/// Lower a value to the generic nested tree the encoder walks.
pub fn to_tree<T>(value: &T) -> Result<Value, SerializeError>
where
    T: Serialize + ?Sized,
{
    json::to_tree(value)
}

/// Decode stored bytes straight into the generic nested tree.
pub fn decode_tree(bytes: &[u8]) -> Result<Value, SerializeError> {
    deserialize(bytes)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_map_to_serialize_codes() {
        let err: Error = decode_tree(b"not json").unwrap_err().into();
        assert_eq!(err.code, ErrorCode::Deserialize);
        assert!(err.message.starts_with("stored bytes are not a valid document"));

        let oversized = vec![b' '; crate::MAX_DOCUMENT_BYTES + 1];
        let err: Error = decode_tree(&oversized).unwrap_err().into();
        assert_eq!(err.code, ErrorCode::DeserializeSizeLimitExceeded);

        assert_eq!(
            SerializeError::Encode("x".into()).code(),
            ErrorCode::Serialize
        );
    }
}
