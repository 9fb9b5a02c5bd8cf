use std::fmt::{self, Display};

///
/// FieldModel
///

#[derive(Debug)]
pub struct FieldModel {
    /// External (serialized) field name.
    pub name: &'static str,
    pub kind: FieldKind,
    /// Exactly one field per document is primary.
    pub primary: bool,
}

impl FieldModel {
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            primary: false,
        }
    }

    #[must_use]
    pub const fn primary(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            primary: true,
        }
    }
}

///
/// FieldKind
///
/// Shape of a field as the engine sees it after serialization.
/// Optional fields use the kind of their inner value; `null` is never indexed.
///

#[derive(Debug)]
pub enum FieldKind {
    Bool,
    Int,
    Uint,
    Float,
    Text,

    List(&'static Self),
    Map {
        key: &'static Self,
        value: &'static Self,
    },

    /// Marker for shapes the engine cannot index (blobs, tagged unions, ...).
    Unsupported,
}

impl FieldKind {
    #[must_use]
    pub const fn tag(&self) -> KindTag {
        match self {
            Self::Bool => KindTag::Bool,
            Self::Int => KindTag::Int,
            Self::Uint => KindTag::Uint,
            Self::Float => KindTag::Float,
            Self::Text => KindTag::Text,
            Self::List(_) => KindTag::List,
            Self::Map { .. } => KindTag::Map,
            Self::Unsupported => KindTag::Unsupported,
        }
    }

    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        self.tag().is_scalar()
    }
}

///
/// KindTag
/// Flat, copyable projection of [`FieldKind`] stored in descriptor maps.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KindTag {
    Bool,
    Int,
    Uint,
    Float,
    Text,
    List,
    Map,
    Unsupported,
}

impl KindTag {
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Int | Self::Uint | Self::Float | Self::Text
        )
    }
}

impl Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::Text => "text",
            Self::List => "list",
            Self::Map => "map",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{label}")
    }
}
