//! Relational encoder.
//!
//! Flattens a decoded document tree into narrow index entries, one per
//! reachable scalar leaf, and the matching per-path counter deltas.
//! Nothing here touches the store: a failure leaves no partial writes.
pub mod canonical;

#[cfg(test)]
mod tests;

use crate::{
    error::{Error, ErrorCode},
    key::{self, FieldPath, INDEX_TAG, IndexKey, KeyDecodeError},
    model::KindTag,
    schema::SchemaDescriptor,
    serialize::ContentHash,
};
use canonical::{CanonicalError, canonical_text, value_kind};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// EncodeError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum EncodeError {
    #[error("document must encode as an object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("current depth {depth} at '{shape}' not found in depth-kind map")]
    DepthMismatch { depth: usize, shape: String },

    #[error("'{path}' expects {expected}, found {found}")]
    KindMismatch {
        path: String,
        expected: KindTag,
        found: &'static str,
    },

    #[error("integer overflow at '{path}': number with {digits} digits")]
    IntegerOverflow { path: String, digits: usize },

    #[error("text at '{path}' contains U+10FFFF, which bounds index scans")]
    SentinelText { path: String },

    #[error("index key could not be decoded: {0}")]
    CorruptKey(#[from] KeyDecodeError),
}

impl EncodeError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotAnObject { .. } => ErrorCode::EncodeUnsupportedValue,
            Self::DepthMismatch { .. } => ErrorCode::EncodeDepthMismatch,
            Self::KindMismatch { .. } => ErrorCode::EncodeKindMismatch,
            Self::IntegerOverflow { .. } => ErrorCode::EncodeIntegerOverflow,
            Self::SentinelText { .. } => ErrorCode::EncodeSentinelText,
            Self::CorruptKey(_) => ErrorCode::EncodeCorruptKey,
        }
    }

    fn at(path: &FieldPath, err: CanonicalError) -> Self {
        match err {
            CanonicalError::KindMismatch { expected, found } => Self::KindMismatch {
                path: path.to_string(),
                expected,
                found,
            },
            CanonicalError::IntegerOverflow { digits } => Self::IntegerOverflow {
                path: path.to_string(),
                digits,
            },
            CanonicalError::SentinelText => Self::SentinelText {
                path: path.to_string(),
            },
        }
    }
}

impl From<EncodeError> for Error {
    fn from(err: EncodeError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

///
/// EncodeMode
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EncodeMode {
    /// Value embedded in the key; payload is the content hash.
    #[default]
    Combined,
    /// Key stops at the path; payload is the canonical value text.
    Separate,
}

/// Scalar leaves of a document keyed by their instance path.
pub type LeafSet = BTreeMap<FieldPath, Value>;

///
/// EncodedState
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EncodedState {
    /// Store key -> payload.
    pub entries: BTreeMap<String, Vec<u8>>,
    /// Per-path counter deltas, +1 per leaf.
    pub counters: BTreeMap<FieldPath, i64>,
}

impl EncodedState {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn counter_total(&self) -> i64 {
        self.counters.values().sum()
    }
}

///
/// Encoder
///

#[derive(Clone, Copy, Debug)]
pub struct Encoder<'a> {
    descriptor: &'a SchemaDescriptor,
    mode: EncodeMode,
}

impl<'a> Encoder<'a> {
    #[must_use]
    pub const fn new(descriptor: &'a SchemaDescriptor) -> Self {
        Self {
            descriptor,
            mode: EncodeMode::Combined,
        }
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: EncodeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Encode every leaf of `tree`.
    pub fn encode_state(
        &self,
        tree: &Value,
        primary: &str,
        hash: Option<&ContentHash>,
    ) -> Result<EncodedState, EncodeError> {
        let leaves = self.collect_leaves(tree)?;

        self.encode_leaves(&leaves, primary, hash)
    }

    /// Walk `tree` and gather its scalar leaves, checking every level
    /// against the depth-kind map. `null` leaves are skipped.
    pub fn collect_leaves(&self, tree: &Value) -> Result<LeafSet, EncodeError> {
        let Value::Object(fields) = tree else {
            return Err(EncodeError::NotAnObject {
                found: value_kind(tree),
            });
        };

        let mut leaves = LeafSet::new();
        for (field, value) in fields {
            if field == self.descriptor.primary_field() {
                continue;
            }
            self.walk(&FieldPath::new(field.as_str()), value, &mut leaves)?;
        }

        Ok(leaves)
    }

    fn walk(&self, path: &FieldPath, value: &Value, leaves: &mut LeafSet) -> Result<(), EncodeError> {
        let expected = self.expected_kind(path)?;
        let mismatch = || EncodeError::KindMismatch {
            path: path.to_string(),
            expected,
            found: value_kind(value),
        };

        match value {
            Value::Null => {}
            Value::Array(items) => {
                if expected != KindTag::List {
                    return Err(mismatch());
                }
                for (i, item) in items.iter().enumerate() {
                    self.walk(&path.index(i), item, leaves)?;
                }
            }
            Value::Object(entries) => {
                if expected != KindTag::Map {
                    return Err(mismatch());
                }
                for (k, v) in entries {
                    self.walk(&path.key(k.as_str()), v, leaves)?;
                }
            }
            scalar => {
                if !expected.is_scalar() {
                    return Err(mismatch());
                }
                leaves.insert(path.clone(), scalar.clone());
            }
        }

        Ok(())
    }

    /// Encode an already-collected leaf set (a whole document or one side
    /// of a difference).
    pub fn encode_leaves(
        &self,
        leaves: &LeafSet,
        primary: &str,
        hash: Option<&ContentHash>,
    ) -> Result<EncodedState, EncodeError> {
        let entity = self.descriptor.name();
        let payload = hash.map(ContentHash::to_hex).unwrap_or_default();
        let mut state = EncodedState::default();

        for (path, value) in leaves {
            if value.is_null() || path.field() == self.descriptor.primary_field() {
                continue;
            }

            let kind = self.expected_kind(path)?;
            let text = canonical_text(kind, value).map_err(|err| EncodeError::at(path, err))?;

            let (key, bytes) = match self.mode {
                EncodeMode::Combined => {
                    let key = IndexKey {
                        entity: entity.to_string(),
                        path: path.clone(),
                        value: text,
                        primary: primary.to_string(),
                    };
                    (key.encode(), payload.clone().into_bytes())
                }
                EncodeMode::Separate => (
                    key::value_prefix(INDEX_TAG, entity, path),
                    text.into_bytes(),
                ),
            };

            state.entries.insert(key, bytes);
            *state.counters.entry(path.clone()).or_insert(0) += 1;
        }

        Ok(state)
    }

    fn expected_kind(&self, path: &FieldPath) -> Result<KindTag, EncodeError> {
        let shape = path.shape();

        self.descriptor
            .depth_kind(&shape)
            .ok_or(EncodeError::DepthMismatch {
                depth: path.depth(),
                shape,
            })
    }
}
