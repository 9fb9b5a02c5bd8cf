//! Structural differencer.
//!
//! Compares two decoded document trees leaf by leaf. A leaf is identified by
//! its instance path and value, so a changed value shows up once in each set:
//! the old leaf in `delete`, the new one in `upsert`.
use crate::{
    encode::{LeafSet, canonical::value_kind},
    error::{Error, ErrorCode},
    key::FieldPath,
};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use thiserror::Error as ThisError;

///
/// DiffError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum DiffError {
    #[error("find difference: unsupported kind, expected object, found {source_kind} and {target_kind}")]
    UnsupportedKind {
        source_kind: &'static str,
        target_kind: &'static str,
    },

    #[error("find slice difference: '{path}' is {source_kind} in source and {target_kind} in target")]
    SliceMismatch {
        path: String,
        source_kind: &'static str,
        target_kind: &'static str,
    },

    #[error("find map difference: '{path}' is {source_kind} in source and {target_kind} in target")]
    MapMismatch {
        path: String,
        source_kind: &'static str,
        target_kind: &'static str,
    },

    #[error("find difference: '{path}' is {source_kind} in source and {target_kind} in target")]
    ScalarMismatch {
        path: String,
        source_kind: &'static str,
        target_kind: &'static str,
    },

    #[error("update: found no change")]
    NoEffectiveChange,
}

impl DiffError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedKind { .. } => ErrorCode::DiffUnsupportedKind,
            Self::SliceMismatch { .. } => ErrorCode::DiffSliceMismatch,
            Self::MapMismatch { .. } => ErrorCode::DiffMapMismatch,
            Self::ScalarMismatch { .. } => ErrorCode::DiffScalarMismatch,
            Self::NoEffectiveChange => ErrorCode::DiffNoEffectiveChange,
        }
    }
}

impl From<DiffError> for Error {
    fn from(err: DiffError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

///
/// Difference
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Difference {
    /// Target leaves that are new or carry a new value.
    pub upsert: LeafSet,
    /// Source leaves that are gone or were replaced.
    pub delete: LeafSet,
}

impl Difference {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upsert.is_empty() && self.delete.is_empty()
    }

    /// Fail with [`DiffError::NoEffectiveChange`] when nothing differs.
    pub fn require_change(self) -> Result<Self, DiffError> {
        if self.is_empty() {
            Err(DiffError::NoEffectiveChange)
        } else {
            Ok(self)
        }
    }
}

/// Diff two document trees. Both must be objects.
pub fn find_difference(source: &Value, target: &Value) -> Result<Difference, DiffError> {
    let (Value::Object(source_fields), Value::Object(target_fields)) = (source, target) else {
        return Err(DiffError::UnsupportedKind {
            source_kind: value_kind(source),
            target_kind: value_kind(target),
        });
    };

    let mut diff = Difference::default();
    for field in union_keys(source_fields, target_fields) {
        diff_value(
            &FieldPath::new(field),
            source_fields.get(field),
            target_fields.get(field),
            &mut diff,
        )?;
    }

    Ok(diff)
}

fn union_keys<'a>(a: &'a Map<String, Value>, b: &'a Map<String, Value>) -> BTreeSet<&'a str> {
    a.keys().chain(b.keys()).map(String::as_str).collect()
}

// null counts as absent on either side
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn diff_value(
    path: &FieldPath,
    source: Option<&Value>,
    target: Option<&Value>,
    diff: &mut Difference,
) -> Result<(), DiffError> {
    match (present(source), present(target)) {
        (None, None) => {}
        (Some(s), None) => collect_leaves(path, s, &mut diff.delete),
        (None, Some(t)) => collect_leaves(path, t, &mut diff.upsert),
        (Some(s), Some(t)) => match (s, t) {
            (Value::Array(s_items), Value::Array(t_items)) => {
                find_slice_difference(path, s_items, t_items, diff)?;
            }
            (Value::Array(_), _) | (_, Value::Array(_)) => {
                return Err(DiffError::SliceMismatch {
                    path: path.to_string(),
                    source_kind: value_kind(s),
                    target_kind: value_kind(t),
                });
            }
            (Value::Object(s_map), Value::Object(t_map)) => {
                find_map_difference(path, s_map, t_map, diff)?;
            }
            (Value::Object(_), _) | (_, Value::Object(_)) => {
                return Err(DiffError::MapMismatch {
                    path: path.to_string(),
                    source_kind: value_kind(s),
                    target_kind: value_kind(t),
                });
            }
            _ => find_scalar_difference(path, s, t, diff)?,
        },
    }

    Ok(())
}

/// Positional: element `i` of source is compared with element `i` of target.
fn find_slice_difference(
    path: &FieldPath,
    source: &[Value],
    target: &[Value],
    diff: &mut Difference,
) -> Result<(), DiffError> {
    for i in 0..source.len().max(target.len()) {
        diff_value(&path.index(i), source.get(i), target.get(i), diff)?;
    }

    Ok(())
}

fn find_map_difference(
    path: &FieldPath,
    source: &Map<String, Value>,
    target: &Map<String, Value>,
    diff: &mut Difference,
) -> Result<(), DiffError> {
    for key in union_keys(source, target) {
        diff_value(&path.key(key), source.get(key), target.get(key), diff)?;
    }

    Ok(())
}

fn find_scalar_difference(
    path: &FieldPath,
    source: &Value,
    target: &Value,
    diff: &mut Difference,
) -> Result<(), DiffError> {
    let (source_kind, target_kind) = (value_kind(source), value_kind(target));
    if source_kind != target_kind {
        return Err(DiffError::ScalarMismatch {
            path: path.to_string(),
            source_kind,
            target_kind,
        });
    }

    if source != target {
        diff.delete.insert(path.clone(), source.clone());
        diff.upsert.insert(path.clone(), target.clone());
    }

    Ok(())
}

fn collect_leaves(path: &FieldPath, value: &Value, out: &mut LeafSet) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_leaves(&path.index(i), item, out);
            }
        }
        Value::Object(entries) => {
            for (k, v) in entries {
                collect_leaves(&path.key(k.as_str()), v, out);
            }
        }
        scalar => {
            out.insert(path.clone(), scalar.clone());
        }
    }
}

///
/// TESTS
///
