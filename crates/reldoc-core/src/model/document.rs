use crate::model::field::FieldModel;
use serde::{Serialize, de::DeserializeOwned};

///
/// DocumentModel
/// Static, hand-written or generated description of one document type.
///

#[derive(Debug)]
pub struct DocumentModel {
    /// Fully-qualified Rust type path (diagnostics and registry checks).
    pub path: &'static str,
    /// Stable external name used in every index key.
    pub name: &'static str,
    /// Ordered field list; positions are taken from this order.
    pub fields: &'static [FieldModel],
}

impl DocumentModel {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldModel> {
        self.fields.iter().find(|f| f.name == name)
    }
}

///
/// Document
///
/// A typed value stored under one primary key.
/// Field names in `MODEL` must match the serialized field names; the
/// default value is what the schema builder checks them against.
///

pub trait Document: Serialize + DeserializeOwned + Clone + Default {
    const MODEL: &'static DocumentModel;
}
