use crate::obs::sink::{MetricsEvent, OpKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// MetricsReport
/// Ephemeral, in-memory counters aggregated from metrics events.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MetricsReport {
    pub ops: OpCounters,
    pub entities: BTreeMap<String, EntityCounters>,
}

///
/// OpCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct OpCounters {
    // Collection entrypoints
    pub create_calls: u64,
    pub insert_calls: u64,
    pub read_calls: u64,
    pub update_calls: u64,
    pub delete_calls: u64,
    pub compact_calls: u64,
    pub query_calls: u64,
    pub failures: u64,

    // Rows touched
    pub rows_read: u64,
    pub rows_written: u64,
    pub rows_deleted: u64,

    // Index maintenance
    pub index_inserts: u64,
    pub index_removes: u64,

    // Cache
    pub cache_hits: u64,
    pub cache_misses: u64,

    // Compaction
    pub compaction_scanned: u64,
    pub compaction_folded: u64,
    pub compaction_records_written: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityCounters {
    pub calls: u64,
    pub failures: u64,
    pub index_inserts: u64,
    pub index_removes: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl MetricsReport {
    pub(crate) fn apply(&mut self, event: MetricsEvent) {
        match event {
            MetricsEvent::OpStart { kind, entity } => {
                let calls = match kind {
                    OpKind::Create => &mut self.ops.create_calls,
                    OpKind::Insert => &mut self.ops.insert_calls,
                    OpKind::Read => &mut self.ops.read_calls,
                    OpKind::Update => &mut self.ops.update_calls,
                    OpKind::Delete => &mut self.ops.delete_calls,
                    OpKind::Compact => &mut self.ops.compact_calls,
                    OpKind::Query => &mut self.ops.query_calls,
                };
                *calls = calls.saturating_add(1);

                let entry = self.entity(entity);
                entry.calls = entry.calls.saturating_add(1);
            }

            MetricsEvent::OpFinish {
                kind,
                entity,
                rows_touched,
                ok,
            } => {
                if !ok {
                    self.ops.failures = self.ops.failures.saturating_add(1);
                    let entry = self.entity(entity);
                    entry.failures = entry.failures.saturating_add(1);
                    return;
                }

                let rows = match kind {
                    OpKind::Read | OpKind::Query => &mut self.ops.rows_read,
                    OpKind::Create | OpKind::Insert | OpKind::Update => {
                        &mut self.ops.rows_written
                    }
                    OpKind::Delete => &mut self.ops.rows_deleted,
                    OpKind::Compact => return,
                };
                *rows = rows.saturating_add(rows_touched);
            }

            MetricsEvent::IndexDelta {
                entity,
                inserts,
                removes,
            } => {
                self.ops.index_inserts = self.ops.index_inserts.saturating_add(inserts);
                self.ops.index_removes = self.ops.index_removes.saturating_add(removes);
                let entry = self.entity(entity);
                entry.index_inserts = entry.index_inserts.saturating_add(inserts);
                entry.index_removes = entry.index_removes.saturating_add(removes);
            }

            MetricsEvent::CacheAccess { entity, hit } => {
                if hit {
                    self.ops.cache_hits = self.ops.cache_hits.saturating_add(1);
                    let entry = self.entity(entity);
                    entry.cache_hits = entry.cache_hits.saturating_add(1);
                } else {
                    self.ops.cache_misses = self.ops.cache_misses.saturating_add(1);
                    let entry = self.entity(entity);
                    entry.cache_misses = entry.cache_misses.saturating_add(1);
                }
            }

            MetricsEvent::Compaction {
                entity: _,
                scanned,
                folded,
                records_written,
            } => {
                self.ops.compaction_scanned = self.ops.compaction_scanned.saturating_add(scanned);
                self.ops.compaction_folded = self.ops.compaction_folded.saturating_add(folded);
                self.ops.compaction_records_written = self
                    .ops
                    .compaction_records_written
                    .saturating_add(records_written);
            }
        }
    }

    fn entity(&mut self, entity: &str) -> &mut EntityCounters {
        self.entities.entry(entity.to_string()).or_default()
    }
}
