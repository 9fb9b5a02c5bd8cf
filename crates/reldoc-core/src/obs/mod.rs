//! Observability: operation metrics and the sink abstraction.
//!
//! Engine code never touches a report directly. Every measurement flows
//! through a [`MetricsEvent`] handed to the collection's [`MetricsSink`].

pub mod metrics;
pub mod sink;

// re-exports
pub use metrics::{EntityCounters, MetricsReport, OpCounters};
pub use sink::{MemorySink, MetricsEvent, MetricsSink, NoopSink, OpKind};
