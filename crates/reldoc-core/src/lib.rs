//! Core runtime for reldoc: typed nested documents stored as one record
//! plus one ordered index entry per leaf, on top of any ordered
//! key-value store.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod cache;
pub mod compact;
pub mod config;
pub mod db;
pub mod diff;
pub mod encode;
pub mod error;
pub mod key;
pub mod model;
pub mod obs;
pub mod query;
pub mod schema;
pub mod serialize;
pub mod store;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// CONSTANTS
///

/// Deepest container nesting a field kind may declare.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Largest stored document accepted by the decoder.
pub const MAX_DOCUMENT_BYTES: usize = 4 * 1024 * 1024;

///
/// Prelude
///
/// Domain vocabulary only. Errors, stores and engine internals stay at
/// their module paths.
///

pub mod prelude {
    pub use crate::{
        db::Collection,
        key::FieldPath,
        model::{Document, DocumentModel, FieldKind, FieldModel},
    };
}
