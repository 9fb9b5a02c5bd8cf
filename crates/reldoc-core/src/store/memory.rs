use crate::store::{KvIter, KvStore, StoreError};
use std::{collections::BTreeMap, ops::Bound};

///
/// MemoryStore
///
/// `BTreeMap`-backed [`KvStore`]. Byte-ordered like any real ordered store,
/// so it doubles as the reference implementation for tests.
///

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    map: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl KvStore for MemoryStore {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.map.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.map.get(key).cloned())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.map.remove(key);
        Ok(())
    }

    fn range_scan<'a>(&'a self, start: &str, end: &str) -> Result<KvIter<'a>, StoreError> {
        // BTreeMap::range panics on inverted bounds
        if start >= end {
            return Ok(Box::new(std::iter::empty()));
        }

        let range = self
            .map
            .range::<str, _>((Bound::Included(start), Bound::Excluded(end)))
            .map(|(k, v)| Ok((k.clone(), v.clone())));

        Ok(Box::new(range))
    }
}

///
/// TESTS
///
