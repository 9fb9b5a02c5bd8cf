//! Ordered key-value store contract.
//!
//! The engine needs nothing more than point reads, point writes, deletes,
//! and an ordered range scan. Transactions and durability belong to the
//! implementor.
mod memory;

pub use memory::MemoryStore;

use thiserror::Error as ThisError;

///
/// StoreError
///
/// Failure reported by a [`KvStore`] implementation.
/// Wrapped by the engine into a step-specific error code.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a backend error, keeping it as the source.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One scanned `(key, value)` pair.
pub type KvEntry = (String, Vec<u8>);

/// Ordered iterator returned by [`KvStore::range_scan`].
pub type KvIter<'a> = Box<dyn Iterator<Item = Result<KvEntry, StoreError>> + 'a>;

///
/// KvStore
///
/// Minimal ordered key-value contract.
///
/// `range_scan` yields keys in ascending byte order, start inclusive and
/// end exclusive. Callers build `end` as `start` plus `char::MAX` to cover
/// every key sharing a prefix; the encoder keeps that character out of the
/// positions that follow a scanned prefix.
///

pub trait KvStore {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Deleting an absent key is not an error.
    fn delete(&mut self, key: &str) -> Result<(), StoreError>;

    fn range_scan<'a>(&'a self, start: &str, end: &str) -> Result<KvIter<'a>, StoreError>;
}

impl<T: KvStore + ?Sized> KvStore for Box<T> {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).put(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }

    fn range_scan<'a>(&'a self, start: &str, end: &str) -> Result<KvIter<'a>, StoreError> {
        (**self).range_scan(start, end)
    }
}
