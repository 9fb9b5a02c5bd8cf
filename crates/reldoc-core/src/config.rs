use crate::db::DbError;
use serde::{Deserialize, Serialize};

/// Default number of decoded documents kept per collection.
pub const DEFAULT_CACHE_SIZE: usize = 1024;

/// Default number of index keys folded per compaction batch.
pub const DEFAULT_COMPACTION_SIZE: usize = 100;

///
/// Options
///
/// Per-collection tuning. Deserializable so a host can load it from its own
/// configuration format; missing fields take their defaults.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub cache_size: usize,
    pub compaction_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            compaction_size: DEFAULT_COMPACTION_SIZE,
        }
    }
}

impl Options {
    #[must_use]
    pub const fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    #[must_use]
    pub const fn with_compaction_size(mut self, compaction_size: usize) -> Self {
        self.compaction_size = compaction_size;
        self
    }

    pub const fn validate(&self) -> Result<(), DbError> {
        if self.cache_size == 0 {
            return Err(DbError::InvalidOptions {
                reason: "cache_size must be at least 1",
            });
        }
        if self.compaction_size == 0 {
            return Err(DbError::InvalidOptions {
                reason: "compaction_size must be at least 1",
            });
        }

        Ok(())
    }
}

///
/// TESTS
///
