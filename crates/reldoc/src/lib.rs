//! ## Crate layout
//! - `core`: schema descriptors, encoder, differencer, collections, cache,
//!   compaction, queries and observability.
//! - `store`: the ordered key-value contract and the in-memory store.
//!
//! The `prelude` module carries what application code needs to declare a
//! document type and drive a collection.

pub use reldoc_core as core;
pub use reldoc_core::{error::Error, store};

/// re-exports
///
/// document types derive through these so callers need not list serde
/// in their own Cargo.toml
pub mod __reexports {
    pub use serde;
}

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        config::Options,
        db::{Collection, Registry},
        error::{Error, ErrorClass, ErrorCode},
        key::FieldPath,
        model::{Document, DocumentModel, FieldKind, FieldModel},
        obs::{MemorySink, MetricsReport, MetricsSink},
        store::{KvStore, MemoryStore},
    };
}

///
/// TESTS
///
