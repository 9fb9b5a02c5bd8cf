//! Static document descriptors.
//!
//! A document type describes its own shape once, as `const` data, through
//! [`Document::MODEL`]. Everything the engine knows about a type is derived
//! from that model when a collection is built; nothing is inspected per call.
pub mod document;
pub mod field;

pub use document::{Document, DocumentModel};
pub use field::{FieldKind, FieldModel, KindTag};
