//! Index compactor.
//!
//! Folds narrow index entries (`value -> one primary key`) into compacted
//! records (`value -> {primary key -> content hash}`) so that a value shared
//! by many documents occupies one store key.
//!
//! Per indexed field the original namespace is scanned in bounded batches.
//! Each batch is grouped by compacted key, merged into the stored record,
//! written only if the merge changed it, and the folded originals deleted.
//! A second run with no intervening writes finds nothing left to fold.

use crate::{
    error::{Error, ErrorCode},
    key::{self, INDEX_TAG, IndexKey, SEP},
    schema::SchemaDescriptor,
    serialize::{self, SerializeError},
    store::{KvEntry, KvStore},
};
use derive_more::{Deref, DerefMut};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, btree_map::Entry};
use tracing::{debug, warn};

///
/// CompactedRecord
///
/// Stored payload of a compacted key: primary key -> content hash (hex) of
/// the document version the entry was folded from.
///

#[repr(transparent)]
#[derive(Clone, Debug, Default, Deref, DerefMut, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CompactedRecord(BTreeMap<String, String>);

impl CompactedRecord {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn encode(&self) -> Result<Vec<u8>, SerializeError> {
        serialize::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SerializeError> {
        serialize::deserialize(bytes)
    }

    /// Hash recorded for `primary`, if it was folded in.
    #[must_use]
    pub fn hash_for(&self, primary: &str) -> Option<&str> {
        self.0.get(primary).map(String::as_str)
    }
}

///
/// CompactionReport
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CompactionReport {
    /// Indexed top-level fields visited.
    pub fields: usize,
    /// Non-empty scan batches.
    pub batches: usize,
    /// Original keys returned by the scans.
    pub scanned: usize,
    /// Original keys merged into a compacted record.
    pub folded: usize,
    pub records_written: usize,
    pub originals_deleted: usize,
    /// Keys that failed to decode and were left in place.
    pub skipped: usize,
}

impl CompactionReport {
    /// True when the run changed nothing in the store.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.records_written == 0 && self.originals_deleted == 0
    }
}

///
/// Compactor
///

#[derive(Clone, Copy, Debug)]
pub struct Compactor<'a> {
    descriptor: &'a SchemaDescriptor,
    batch_size: usize,
}

impl<'a> Compactor<'a> {
    /// A zero batch size is treated as one.
    #[must_use]
    pub fn new(descriptor: &'a SchemaDescriptor, batch_size: usize) -> Self {
        Self {
            descriptor,
            batch_size: batch_size.max(1),
        }
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn run<S>(&self, store: &mut S) -> Result<CompactionReport, Error>
    where
        S: KvStore + ?Sized,
    {
        let mut report = CompactionReport::default();
        // compacted records already read or written during this run
        let mut records = BTreeMap::<String, CompactedRecord>::new();

        for field in self.descriptor.indexed_fields() {
            report.fields += 1;
            self.compact_field(store, field, &mut records, &mut report)?;
        }

        Ok(report)
    }

    fn compact_field<S>(
        &self,
        store: &mut S,
        field: &str,
        records: &mut BTreeMap<String, CompactedRecord>,
        report: &mut CompactionReport,
    ) -> Result<(), Error>
    where
        S: KvStore + ?Sized,
    {
        let entity = self.descriptor.name();
        let start = key::field_prefix(INDEX_TAG, entity, field);
        let end = key::upper_bound(&start);
        let mut cursor = start;

        loop {
            let batch = self.scan_batch(store, &cursor, &end)?;
            let Some((last, _)) = batch.last() else {
                break;
            };

            // smallest key strictly after `last`
            cursor = format!("{last}{SEP}");
            report.batches += 1;
            report.scanned += batch.len();

            let groups = group_batch(batch, report);
            let mut folded = Vec::new();

            for (compact_key, entries) in groups {
                let record = match records.entry(compact_key.clone()) {
                    Entry::Occupied(slot) => slot.into_mut(),
                    Entry::Vacant(slot) => slot.insert(load_record(store, &compact_key)?),
                };

                let mut merged = record.clone();
                for (original, primary, hash) in entries {
                    merged.insert(primary, hash);
                    folded.push(original);
                }

                if merged != *record {
                    let bytes = merged.encode()?;
                    store
                        .put(&compact_key, &bytes)
                        .map_err(|err| Error::store(ErrorCode::CompactPut, err))?;
                    report.records_written += 1;
                    *record = merged;
                }
            }

            for original in &folded {
                store
                    .delete(original)
                    .map_err(|err| Error::store(ErrorCode::CompactDelete, err))?;
            }
            report.folded += folded.len();
            report.originals_deleted += folded.len();

            debug!(
                entity,
                field,
                batch = report.batches,
                folded = folded.len(),
                "compacted index batch"
            );
        }

        Ok(())
    }

    fn scan_batch<S>(&self, store: &S, start: &str, end: &str) -> Result<Vec<KvEntry>, Error>
    where
        S: KvStore + ?Sized,
    {
        store
            .range_scan(start, end)
            .map_err(|err| Error::store(ErrorCode::CompactScan, err))?
            .take(self.batch_size)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| Error::store(ErrorCode::CompactScan, err))
    }
}

// (original key, primary key, hash) grouped by encoded compacted key
type Groups = BTreeMap<String, Vec<(String, String, String)>>;

fn group_batch(batch: Vec<KvEntry>, report: &mut CompactionReport) -> Groups {
    let mut groups = Groups::new();

    for (original, payload) in batch {
        let decoded = match IndexKey::decode(&original) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(key = ?original, error = %err, "skipping malformed index key");
                report.skipped += 1;
                continue;
            }
        };
        let Ok(hash) = String::from_utf8(payload) else {
            warn!(key = ?original, "skipping index key with non-utf8 payload");
            report.skipped += 1;
            continue;
        };

        groups
            .entry(decoded.compact_key().encode())
            .or_default()
            .push((original, decoded.primary, hash));
    }

    groups
}

fn load_record<S>(store: &S, compact_key: &str) -> Result<CompactedRecord, Error>
where
    S: KvStore + ?Sized,
{
    let bytes = store
        .get(compact_key)
        .map_err(|err| Error::store(ErrorCode::CompactGet, err))?;

    match bytes {
        Some(bytes) => Ok(CompactedRecord::decode(&bytes)?),
        None => Ok(CompactedRecord::new()),
    }
}
