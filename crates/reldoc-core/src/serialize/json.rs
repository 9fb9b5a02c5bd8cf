use crate::serialize::SerializeError;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

pub(super) fn to_tree<T>(value: &T) -> Result<Value, SerializeError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_value(value).map_err(|e| SerializeError::Encode(e.to_string()))
}

/// Serialize via the sorted tree so output bytes are canonical.
pub(super) fn serialize<T>(value: &T) -> Result<Vec<u8>, SerializeError>
where
    T: Serialize + ?Sized,
{
    let tree = to_tree(value)?;

    serde_json::to_vec(&tree).map_err(|e| SerializeError::Encode(e.to_string()))
}

pub(super) fn deserialize_bounded<T>(bytes: &[u8], max_bytes: usize) -> Result<T, SerializeError>
where
    T: DeserializeOwned,
{
    if bytes.len() > max_bytes {
        return Err(SerializeError::TooLarge {
            len: bytes.len(),
            limit: max_bytes,
        });
    }

    serde_json::from_slice(bytes).map_err(|e| SerializeError::Decode(e.to_string()))
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn unordered_maps_serialize_canonically() {
        let mut left = HashMap::new();
        let mut right = HashMap::new();
        for (k, v) in [("z", 1), ("a", 2), ("m", 3)] {
            left.insert(k.to_string(), v);
        }
        for (k, v) in [("m", 3), ("z", 1), ("a", 2)] {
            right.insert(k.to_string(), v);
        }

        let left = serialize(&left).expect("serialize");
        let right = serialize(&right).expect("serialize");

        assert_eq!(left, right);
        assert_eq!(left, br#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn oversized_payload_is_rejected_before_decode() {
        let err = deserialize_bounded::<Value>(b"[1,2,3]", 4).unwrap_err();

        assert!(matches!(
            err,
            SerializeError::TooLarge { len: 7, limit: 4 }
        ));
    }

    #[test]
    fn malformed_payload_is_a_deserialize_error() {
        let err = deserialize_bounded::<Value>(b"{", 64).unwrap_err();

        assert!(matches!(err, SerializeError::Decode(_)));
    }
}
