//! Metrics sink boundary.
//!
//! Sinks are owned per collection and injected at construction; there is
//! no process-wide state.
use crate::obs::metrics::MetricsReport;
use parking_lot::Mutex;

///
/// OpKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OpKind {
    Create,
    Insert,
    Read,
    Update,
    Delete,
    Compact,
    Query,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    OpStart {
        kind: OpKind,
        entity: &'static str,
    },
    OpFinish {
        kind: OpKind,
        entity: &'static str,
        rows_touched: u64,
        ok: bool,
    },
    IndexDelta {
        entity: &'static str,
        inserts: u64,
        removes: u64,
    },
    CacheAccess {
        entity: &'static str,
        hit: bool,
    },
    Compaction {
        entity: &'static str,
        scanned: u64,
        folded: u64,
        records_written: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}

///
/// NoopSink
/// Default sink; drops every event.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&self, _: MetricsEvent) {}
}

///
/// MemorySink
/// Aggregates events into an in-memory [`MetricsReport`].
///

#[derive(Debug, Default)]
pub struct MemorySink {
    report: Mutex<MetricsReport>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn report(&self) -> MetricsReport {
        self.report.lock().clone()
    }

    pub fn reset(&self) {
        *self.report.lock() = MetricsReport::default();
    }
}

impl MetricsSink for MemorySink {
    fn record(&self, event: MetricsEvent) {
        self.report.lock().apply(event);
    }
}

///
/// Span
/// RAII guard that emits start/finish events for one collection call.
/// Finish is recorded on every exit path, including early `?` returns.
///

pub(crate) struct Span<'a> {
    sink: &'a dyn MetricsSink,
    kind: OpKind,
    entity: &'static str,
    rows: u64,
    ok: bool,
}

impl<'a> Span<'a> {
    #[must_use]
    pub(crate) fn new(sink: &'a dyn MetricsSink, kind: OpKind, entity: &'static str) -> Self {
        sink.record(MetricsEvent::OpStart { kind, entity });

        Self {
            sink,
            kind,
            entity,
            rows: 0,
            ok: false,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }

    /// Mark the call as successful; unmarked spans finish as failed.
    pub(crate) const fn succeed(&mut self) {
        self.ok = true;
    }
}

impl Drop for Span<'_> {
    fn drop(&mut self) {
        self.sink.record(MetricsEvent::OpFinish {
            kind: self.kind,
            entity: self.entity,
            rows_touched: self.rows,
            ok: self.ok,
        });
    }
}

///
/// TESTS
///
