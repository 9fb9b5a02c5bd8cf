//! CRUD orchestrator.
//!
//! A [`Collection`] owns everything derived for one document type: the
//! schema descriptor, the index counters and the document cache. The store
//! is never held; each operation borrows it for the duration of the call.
//!
//! Store failures abort the call at once. Writes already issued in the same
//! call are not rolled back; hosts needing atomicity wrap the store in their
//! own transaction.
mod counters;
mod registry;


pub use counters::Counters;
pub use registry::Registry;

use crate::{
    cache::{CacheStats, CachedDocument, DocumentCache},
    compact::{CompactionReport, Compactor},
    config::Options,
    diff::find_difference,
    encode::{EncodeMode, Encoder},
    error::{Error, ErrorCode},
    key::{self, FieldPath, INDEX_TAG},
    model::Document,
    obs::{
        MetricsEvent, MetricsSink, NoopSink, OpKind,
        sink::Span as MetricsSpan,
    },
    query::{CompactedMatch, Predicate},
    schema::SchemaDescriptor,
    serialize::{self, ContentHash},
    store::KvStore,
};
use serde_json::Value;
use std::{collections::BTreeMap, fmt, num::NonZeroUsize, sync::Arc};
use thiserror::Error as ThisError;
use tracing::{Span, debug, instrument};

///
/// DbError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum DbError {
    #[error("{entity} '{primary}' already exists")]
    AlreadyExists { entity: &'static str, primary: String },

    #[error("document type mismatch for '{name}': registered {expected}, requested {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("document type '{name}' not registered")]
    NotRegistered { name: String },

    #[error("document type '{name}' already registered")]
    AlreadyRegistered { name: String },

    #[error("invalid options: {reason}")]
    InvalidOptions { reason: &'static str },
}

impl DbError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::NotRegistered { .. } => ErrorCode::NotRegistered,
            Self::AlreadyRegistered { .. } => ErrorCode::AlreadyRegistered,
            Self::InvalidOptions { .. } => ErrorCode::InvalidOptions,
        }
    }
}

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

///
/// Prepared
/// A document lowered to everything a write needs.
///

struct Prepared {
    primary: String,
    tree: Value,
    bytes: Vec<u8>,
    hash: ContentHash,
}

///
/// Collection
///

pub struct Collection<D: Document> {
    descriptor: SchemaDescriptor,
    options: Options,
    counters: Counters,
    cache: DocumentCache<D>,
    sink: Arc<dyn MetricsSink>,
}

impl<D: Document> Collection<D> {
    /// Derive the descriptor for `D` and size the cache.
    pub fn new(options: Options) -> Result<Self, Error> {
        options.validate()?;
        let descriptor = SchemaDescriptor::of::<D>()?;
        let capacity = NonZeroUsize::new(options.cache_size).ok_or(DbError::InvalidOptions {
            reason: "cache_size must be at least 1",
        })?;

        Ok(Self {
            descriptor,
            options,
            counters: Counters::new(),
            cache: DocumentCache::new(capacity),
            sink: Arc::new(NoopSink),
        })
    }

    /// Route metrics events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub const fn descriptor(&self) -> &SchemaDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// Snapshot of every index counter.
    #[must_use]
    pub fn counters(&self) -> BTreeMap<FieldPath, i64> {
        self.counters.snapshot()
    }

    #[must_use]
    pub fn counter(&self, path: &FieldPath) -> i64 {
        self.counters.get(path)
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    const fn entity(&self) -> &'static str {
        self.descriptor.name()
    }

    fn encoder(&self) -> Encoder<'_> {
        Encoder::new(&self.descriptor)
    }

    fn prepare(&self, document: &D) -> Result<Prepared, Error> {
        let tree = serialize::to_tree(document)?;
        let primary = self.descriptor.primary_key(&tree)?;
        let bytes = serialize::serialize(&tree)?;
        let hash = ContentHash::of(&bytes);

        Span::current().record("primary", primary.as_str());

        Ok(Prepared {
            primary,
            tree,
            bytes,
            hash,
        })
    }

    fn install(&self, document: &D, prepared: Prepared) {
        self.cache.insert(
            prepared.primary,
            Arc::new(CachedDocument {
                document: document.clone(),
                bytes: prepared.bytes,
                hash: prepared.hash,
            }),
        );
    }

    ///
    /// CREATE
    ///

    /// Write `document` and all of its index entries.
    ///
    /// No existence check: an existing record under the same primary key is
    /// overwritten and its old index entries are left behind. Use
    /// [`Self::insert`] to reject duplicates or [`Self::update`] to replace.
    #[instrument(skip_all, fields(entity = D::MODEL.name, primary = tracing::field::Empty))]
    pub fn create<S>(&self, store: &mut S, document: &D) -> Result<(), Error>
    where
        S: KvStore + ?Sized,
    {
        let mut span = MetricsSpan::new(&*self.sink, OpKind::Create, self.entity());
        let prepared = self.prepare(document)?;

        self.create_prepared(store, document, prepared, ErrorCode::CreatePut)?;

        span.set_rows(1);
        span.succeed();
        Ok(())
    }

    /// Create `document`, failing if its primary key is already taken.
    #[instrument(skip_all, fields(entity = D::MODEL.name, primary = tracing::field::Empty))]
    pub fn insert<S>(&self, store: &mut S, document: &D) -> Result<(), Error>
    where
        S: KvStore + ?Sized,
    {
        let mut span = MetricsSpan::new(&*self.sink, OpKind::Insert, self.entity());
        let prepared = self.prepare(document)?;

        let existing = store
            .get(&prepared.primary)
            .map_err(|err| Error::store(ErrorCode::InsertGet, err))?;
        if existing.is_some() {
            return Err(DbError::AlreadyExists {
                entity: self.entity(),
                primary: prepared.primary,
            }
            .into());
        }

        self.create_prepared(store, document, prepared, ErrorCode::CreatePut)?;

        span.set_rows(1);
        span.succeed();
        Ok(())
    }

    fn create_prepared<S>(
        &self,
        store: &mut S,
        document: &D,
        prepared: Prepared,
        put_code: ErrorCode,
    ) -> Result<(), Error>
    where
        S: KvStore + ?Sized,
    {
        let state =
            self.encoder()
                .encode_state(&prepared.tree, &prepared.primary, Some(&prepared.hash))?;

        for (key, value) in &state.entries {
            store
                .put(key, value)
                .map_err(|err| Error::store(put_code, err))?;
        }
        store
            .put(&prepared.primary, &prepared.bytes)
            .map_err(|err| Error::store(put_code, err))?;

        self.counters.apply(&state.counters, 1);
        self.sink.record(MetricsEvent::IndexDelta {
            entity: self.entity(),
            inserts: state.len() as u64,
            removes: 0,
        });
        debug!(entries = state.len(), "created document");

        self.install(document, prepared);
        Ok(())
    }

    ///
    /// READ
    ///

    /// Fetch and decode the document under `primary`.
    ///
    /// Always reads the store; an absent key is `Ok(None)`.
    #[instrument(skip_all, fields(entity = D::MODEL.name, primary = %primary))]
    pub fn read<S>(&self, store: &S, primary: &str) -> Result<Option<D>, Error>
    where
        S: KvStore + ?Sized,
    {
        let mut span = MetricsSpan::new(&*self.sink, OpKind::Read, self.entity());

        let bytes = store
            .get(primary)
            .map_err(|err| Error::store(ErrorCode::ReadGet, err))?;
        let document = bytes
            .map(|bytes| serialize::deserialize::<D>(&bytes))
            .transpose()?;

        span.set_rows(u64::from(document.is_some()));
        span.succeed();
        Ok(document)
    }

    ///
    /// UPDATE
    ///

    /// Replace the stored version of `document`, touching only the index
    /// entries whose leaves changed.
    ///
    /// A missing record is created. An update that changes nothing fails
    /// with [`ErrorCode::DiffNoEffectiveChange`].
    #[instrument(skip_all, fields(entity = D::MODEL.name, primary = tracing::field::Empty))]
    pub fn update<S>(&self, store: &mut S, document: &D) -> Result<(), Error>
    where
        S: KvStore + ?Sized,
    {
        let mut span = MetricsSpan::new(&*self.sink, OpKind::Update, self.entity());
        let prepared = self.prepare(document)?;

        let prior = store
            .get(&prepared.primary)
            .map_err(|err| Error::store(ErrorCode::UpdateGet, err))?;
        let Some(prior) = prior else {
            debug!("no prior record, creating");
            self.create_prepared(store, document, prepared, ErrorCode::UpdatePut)?;
            span.set_rows(1);
            span.succeed();
            return Ok(());
        };

        let prior_tree = serialize::decode_tree(&prior)?;
        let diff = find_difference(&prior_tree, &prepared.tree)?.require_change()?;

        // the new version must fit the schema as a whole, not only its changes
        let encoder = self.encoder();
        encoder.collect_leaves(&prepared.tree)?;
        let removed = encoder.encode_leaves(&diff.delete, &prepared.primary, None)?;
        let added = encoder.encode_leaves(&diff.upsert, &prepared.primary, Some(&prepared.hash))?;

        // stale entries go first so a re-added key is not deleted afterwards
        for key in removed.entries.keys() {
            store
                .delete(key)
                .map_err(|err| Error::store(ErrorCode::UpdateDelete, err))?;
        }
        for (key, value) in &added.entries {
            store
                .put(key, value)
                .map_err(|err| Error::store(ErrorCode::UpdatePut, err))?;
        }
        store
            .put(&prepared.primary, &prepared.bytes)
            .map_err(|err| Error::store(ErrorCode::UpdatePut, err))?;

        self.counters.apply(&removed.counters, -1);
        self.counters.apply(&added.counters, 1);
        self.sink.record(MetricsEvent::IndexDelta {
            entity: self.entity(),
            inserts: added.len() as u64,
            removes: removed.len() as u64,
        });
        debug!(
            removed = removed.len(),
            added = added.len(),
            "updated document"
        );

        self.install(document, prepared);
        span.set_rows(1);
        span.succeed();
        Ok(())
    }

    ///
    /// DELETE
    ///

    /// Remove the document under `primary` and every index entry it owns.
    ///
    /// Returns `false`, without touching the store, when nothing is stored
    /// under `primary`. The cache entry is evicted either way.
    #[instrument(skip_all, fields(entity = D::MODEL.name, primary = %primary))]
    pub fn delete<S>(&self, store: &mut S, primary: &str) -> Result<bool, Error>
    where
        S: KvStore + ?Sized,
    {
        let mut span = MetricsSpan::new(&*self.sink, OpKind::Delete, self.entity());

        let bytes = store
            .get(primary)
            .map_err(|err| Error::store(ErrorCode::DeleteGet, err))?;
        let Some(bytes) = bytes else {
            self.cache.remove(&primary.to_string());
            span.succeed();
            return Ok(false);
        };

        let tree = serialize::decode_tree(&bytes)?;
        let state = self.encoder().encode_state(&tree, primary, None)?;

        for key in state.entries.keys() {
            store
                .delete(key)
                .map_err(|err| Error::store(ErrorCode::DeleteDelete, err))?;
        }
        store
            .delete(primary)
            .map_err(|err| Error::store(ErrorCode::DeleteDelete, err))?;

        self.counters.apply(&state.counters, -1);
        self.cache.remove(&primary.to_string());
        self.sink.record(MetricsEvent::IndexDelta {
            entity: self.entity(),
            inserts: 0,
            removes: state.len() as u64,
        });
        debug!(entries = state.len(), "deleted document");

        span.set_rows(1);
        span.succeed();
        Ok(true)
    }

    ///
    /// COMPACT
    ///

    /// Fold narrow index entries into compacted records, using the
    /// configured batch size.
    pub fn compact<S>(&self, store: &mut S) -> Result<CompactionReport, Error>
    where
        S: KvStore + ?Sized,
    {
        self.compact_with(store, self.options.compaction_size)
    }

    #[instrument(skip_all, fields(entity = D::MODEL.name, batch_size))]
    pub fn compact_with<S>(&self, store: &mut S, batch_size: usize) -> Result<CompactionReport, Error>
    where
        S: KvStore + ?Sized,
    {
        let mut span = MetricsSpan::new(&*self.sink, OpKind::Compact, self.entity());

        let report = Compactor::new(&self.descriptor, batch_size).run(store)?;

        self.sink.record(MetricsEvent::Compaction {
            entity: self.entity(),
            scanned: report.scanned as u64,
            folded: report.folded as u64,
            records_written: report.records_written as u64,
        });
        debug!(
            batches = report.batches,
            folded = report.folded,
            records_written = report.records_written,
            skipped = report.skipped,
            "compaction finished"
        );

        span.set_rows(report.folded as u64);
        span.succeed();
        Ok(report)
    }

    ///
    /// QUERY
    ///

    /// Evaluate a `<path> <op> <literal>` predicate; matches come back in
    /// primary-key order.
    #[instrument(skip_all, fields(entity = D::MODEL.name, predicate = %predicate))]
    pub fn query<S>(&self, store: &S, predicate: &str) -> Result<Vec<D>, Error>
    where
        S: KvStore + ?Sized,
    {
        let mut span = MetricsSpan::new(&*self.sink, OpKind::Query, self.entity());

        let predicate = Predicate::parse(predicate, &self.descriptor)?;
        let candidates = predicate.candidates(store, &self.descriptor)?;

        let mut documents = Vec::with_capacity(candidates.len());
        for (primary, candidate) in &candidates {
            let Some(cached) = self.load(store, primary)? else {
                continue;
            };
            if candidate.confirmed || self.verify(&cached, primary, &candidate.checks)? {
                documents.push(cached.document.clone());
            }
        }
        debug!(
            candidates = candidates.len(),
            matched = documents.len(),
            "query evaluated"
        );

        span.set_rows(documents.len() as u64);
        span.succeed();
        Ok(documents)
    }

    // cached document for `primary`, loading it from the store on a miss
    fn load<S>(&self, store: &S, primary: &str) -> Result<Option<Arc<CachedDocument<D>>>, Error>
    where
        S: KvStore + ?Sized,
    {
        let mut missed = false;
        let cached = self.cache.get_or_load::<Error, _>(&primary.to_string(), || {
            missed = true;
            let Some(bytes) = store
                .get(primary)
                .map_err(|err| Error::store(ErrorCode::QueryRead, err))?
            else {
                return Ok(None);
            };

            let document = serialize::deserialize::<D>(&bytes)?;
            let hash = ContentHash::of(&bytes);

            Ok(Some(Arc::new(CachedDocument {
                document,
                bytes,
                hash,
            })))
        })?;

        self.sink.record(MetricsEvent::CacheAccess {
            entity: self.entity(),
            hit: !missed,
        });

        Ok(cached)
    }

    // a compacted match holds if the document is unchanged since it was
    // folded, or still carries the value at that path
    fn verify(
        &self,
        cached: &CachedDocument<D>,
        primary: &str,
        checks: &[CompactedMatch],
    ) -> Result<bool, Error> {
        let hash = cached.hash.to_hex();
        if checks.iter().any(|check| check.hash == hash) {
            return Ok(true);
        }

        let tree = serialize::decode_tree(&cached.bytes)?;
        let current = self
            .encoder()
            .with_mode(EncodeMode::Separate)
            .encode_state(&tree, primary, None)?;

        Ok(checks.iter().any(|check| {
            let key = key::value_prefix(INDEX_TAG, self.entity(), &check.path);
            current
                .entries
                .get(&key)
                .is_some_and(|value| value.as_slice() == check.value.as_bytes())
        }))
    }
}

impl<D: Document> fmt::Debug for Collection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("entity", &self.entity())
            .field("options", &self.options)
            .field("counters", &self.counters)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
