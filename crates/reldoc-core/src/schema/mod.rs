//! Schema descriptor: everything the engine derives from a [`DocumentModel`].
//!
//! Built once per document type and read-only afterwards.
#[cfg(test)]
mod tests;

use crate::{
    MAX_NESTING_DEPTH,
    encode::canonical::value_kind,
    error::{Error, ErrorCode},
    key::{self, KEY_MAX_CHAR, SEP},
    model::{Document, DocumentModel, FieldKind, KindTag},
    serialize,
};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// SchemaError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("name tag missing for field at position {position} of {path}")]
    NameMissing { path: &'static str, position: usize },

    #[error("document name missing for {path}")]
    DocumentNameMissing { path: &'static str },

    #[error("primary field missing for {path}")]
    PrimaryMissing { path: &'static str },

    #[error("more than one primary field in {path}: '{first}' and '{second}'")]
    PrimaryDuplicate {
        path: &'static str,
        first: &'static str,
        second: &'static str,
    },

    #[error("unsupported kind at '{shape}': {kind}")]
    UnsupportedKind { shape: String, kind: KindTag },

    #[error("field nesting at '{shape}' exceeds {max} levels")]
    NestingTooDeep { shape: String, max: usize },

    #[error("duplicate field name '{field}' in {path}")]
    DuplicateField {
        path: &'static str,
        field: &'static str,
    },

    #[error("name '{name}' contains reserved characters")]
    ReservedName { name: String },

    #[error("serialized field '{field}' of {path} has no name tag in the model")]
    UntaggedField { path: &'static str, field: String },

    #[error("model field '{field}' is not serialized by {path}")]
    FieldNotSerialized {
        path: &'static str,
        field: &'static str,
    },

    #[error("zero value of {path} cannot be inspected: {reason}")]
    ZeroValue { path: &'static str, reason: String },

    #[error("primary field '{field}' is empty or invalid: {reason}")]
    PrimaryKeyInvalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl SchemaError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NameMissing { .. }
            | Self::DocumentNameMissing { .. }
            | Self::UntaggedField { .. }
            | Self::FieldNotSerialized { .. } => ErrorCode::SchemaNameMissing,
            Self::PrimaryMissing { .. } => ErrorCode::SchemaPrimaryMissing,
            Self::PrimaryDuplicate { .. } => ErrorCode::SchemaPrimaryDuplicate,
            Self::UnsupportedKind { .. }
            | Self::NestingTooDeep { .. }
            | Self::ZeroValue { .. } => ErrorCode::SchemaUnsupportedKind,
            Self::DuplicateField { .. } => ErrorCode::SchemaDuplicateField,
            Self::ReservedName { .. } => ErrorCode::SchemaReservedName,
            Self::PrimaryKeyInvalid { .. } => ErrorCode::PrimaryKeyInvalid,
        }
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

///
/// SchemaDescriptor
///
/// Per-type index plan.
///
/// `depth_kinds` is keyed by shape path (`Tags`, `Tags[]`, `Meta{}`) and
/// holds the kind expected at every level reachable from the model.
/// `map_key_kinds` is keyed by the shape path of the map itself.
///

#[derive(Clone, Debug)]
pub struct SchemaDescriptor {
    path: &'static str,
    name: &'static str,
    field_positions: BTreeMap<&'static str, usize>,
    field_kinds: BTreeMap<&'static str, KindTag>,
    map_key_kinds: BTreeMap<String, KindTag>,
    depth_kinds: BTreeMap<String, KindTag>,
    primary_position: usize,
    primary_field: &'static str,
}

impl SchemaDescriptor {
    /// Build the descriptor for `D` and check its model against the fields
    /// `D::default()` actually serializes.
    pub fn of<D: Document>() -> Result<Self, SchemaError> {
        let descriptor = Self::build(D::MODEL)?;
        let zero = serialize::to_tree(&D::default()).map_err(|err| SchemaError::ZeroValue {
            path: D::MODEL.path,
            reason: err.to_string(),
        })?;
        descriptor.check_fields(&zero)?;

        Ok(descriptor)
    }

    // every serialized top-level name must be modelled, and the reverse
    fn check_fields(&self, zero: &Value) -> Result<(), SchemaError> {
        let Value::Object(fields) = zero else {
            return Err(SchemaError::ZeroValue {
                path: self.path,
                reason: format!("serializes as {}, not an object", value_kind(zero)),
            });
        };

        if let Some(field) = fields
            .keys()
            .find(|name| !self.field_positions.contains_key(name.as_str()))
        {
            return Err(SchemaError::UntaggedField {
                path: self.path,
                field: field.clone(),
            });
        }
        if let Some(field) = self
            .field_positions
            .keys()
            .find(|name| !fields.contains_key(**name))
        {
            return Err(SchemaError::FieldNotSerialized {
                path: self.path,
                field: *field,
            });
        }

        Ok(())
    }

    pub fn build(model: &'static DocumentModel) -> Result<Self, SchemaError> {
        if model.name.is_empty() {
            return Err(SchemaError::DocumentNameMissing { path: model.path });
        }
        check_name(model.name)?;

        let mut field_positions = BTreeMap::new();
        let mut field_kinds = BTreeMap::new();
        let mut map_key_kinds = BTreeMap::new();
        let mut depth_kinds = BTreeMap::new();
        let mut primary: Option<(usize, &'static str)> = None;

        for (position, field) in model.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(SchemaError::NameMissing {
                    path: model.path,
                    position,
                });
            }
            check_name(field.name)?;

            if field_positions.insert(field.name, position).is_some() {
                return Err(SchemaError::DuplicateField {
                    path: model.path,
                    field: field.name,
                });
            }
            field_kinds.insert(field.name, field.kind.tag());

            if field.primary {
                if let Some((_, first)) = primary {
                    return Err(SchemaError::PrimaryDuplicate {
                        path: model.path,
                        first,
                        second: field.name,
                    });
                }
                if !matches!(field.kind, FieldKind::Text | FieldKind::Int | FieldKind::Uint) {
                    return Err(SchemaError::UnsupportedKind {
                        shape: field.name.to_string(),
                        kind: field.kind.tag(),
                    });
                }
                primary = Some((position, field.name));
            }

            walk_kind(
                field.name.to_string(),
                &field.kind,
                0,
                &mut depth_kinds,
                &mut map_key_kinds,
            )?;
        }

        let Some((primary_position, primary_field)) = primary else {
            return Err(SchemaError::PrimaryMissing { path: model.path });
        };

        Ok(Self {
            path: model.path,
            name: model.name,
            field_positions,
            field_kinds,
            map_key_kinds,
            depth_kinds,
            primary_position,
            primary_field,
        })
    }

    /// Rust type path of the described document.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        self.path
    }

    /// External document name used in keys.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn primary_field(&self) -> &'static str {
        self.primary_field
    }

    #[must_use]
    pub const fn primary_position(&self) -> usize {
        self.primary_position
    }

    #[must_use]
    pub fn field_position(&self, field: &str) -> Option<usize> {
        self.field_positions.get(field).copied()
    }

    #[must_use]
    pub fn field_kind(&self, field: &str) -> Option<KindTag> {
        self.field_kinds.get(field).copied()
    }

    #[must_use]
    pub fn map_key_kind(&self, shape: &str) -> Option<KindTag> {
        self.map_key_kinds.get(shape).copied()
    }

    #[must_use]
    pub fn depth_kind(&self, shape: &str) -> Option<KindTag> {
        self.depth_kinds.get(shape).copied()
    }

    #[must_use]
    pub const fn depth_kinds(&self) -> &BTreeMap<String, KindTag> {
        &self.depth_kinds
    }

    /// Indexed top-level fields (every field but the primary), in model order.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        let mut fields: Vec<(usize, &'static str)> = self
            .field_positions
            .iter()
            .filter(|(name, _)| **name != self.primary_field)
            .map(|(name, position)| (*position, *name))
            .collect();
        fields.sort_unstable();

        fields.into_iter().map(|(_, name)| name)
    }

    /// Extract the primary key from a document tree.
    ///
    /// Text keys are used verbatim, integer keys in decimal form.
    pub fn primary_key(&self, tree: &Value) -> Result<String, SchemaError> {
        let invalid = |reason| SchemaError::PrimaryKeyInvalid {
            field: self.primary_field,
            reason,
        };

        let key = match tree.get(self.primary_field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n.to_string(),
            Some(Value::Null) | None => return Err(invalid("value is missing")),
            Some(_) => return Err(invalid("value is not text or integer")),
        };

        if key.is_empty() {
            return Err(invalid("value is empty"));
        }
        // index keys live under a leading separator
        if key.starts_with(SEP) {
            return Err(invalid("value starts with a reserved character"));
        }
        // scan bounds end in KEY_MAX_CHAR
        if key.contains(KEY_MAX_CHAR) {
            return Err(invalid("value contains the scan sentinel U+10FFFF"));
        }

        Ok(key)
    }
}

fn check_name(name: &str) -> Result<(), SchemaError> {
    if key::contains_reserved(name) {
        return Err(SchemaError::ReservedName {
            name: name.to_string(),
        });
    }

    Ok(())
}

fn walk_kind(
    shape: String,
    kind: &FieldKind,
    depth: usize,
    depth_kinds: &mut BTreeMap<String, KindTag>,
    map_key_kinds: &mut BTreeMap<String, KindTag>,
) -> Result<(), SchemaError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(SchemaError::NestingTooDeep {
            shape,
            max: MAX_NESTING_DEPTH,
        });
    }

    match kind {
        FieldKind::Unsupported => {
            return Err(SchemaError::UnsupportedKind {
                shape,
                kind: KindTag::Unsupported,
            });
        }
        FieldKind::List(inner) => {
            depth_kinds.insert(shape.clone(), KindTag::List);
            walk_kind(
                format!("{shape}[]"),
                inner,
                depth + 1,
                depth_kinds,
                map_key_kinds,
            )?;
        }
        FieldKind::Map { key, value } => {
            if !matches!(key, FieldKind::Text | FieldKind::Int | FieldKind::Uint) {
                return Err(SchemaError::UnsupportedKind {
                    shape: format!("{shape}{{}}"),
                    kind: key.tag(),
                });
            }
            map_key_kinds.insert(shape.clone(), key.tag());
            depth_kinds.insert(shape.clone(), KindTag::Map);
            walk_kind(
                format!("{shape}{{}}"),
                value,
                depth + 1,
                depth_kinds,
                map_key_kinds,
            )?;
        }
        scalar => {
            depth_kinds.insert(shape, scalar.tag());
        }
    }

    Ok(())
}
