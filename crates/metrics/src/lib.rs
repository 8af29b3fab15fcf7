//! In-memory usage metrics buffering and snapshot persistence.
//!
//! Counter updates are merged into per-category pending buckets and
//! periodically flushed as immutable, timestamped snapshots to an
//! append-only store.

pub mod aggregator;
pub mod store;

pub use aggregator::{MetricsAggregator, MetricsConfig, MetricsError};
pub use store::{MetricCategory, MetricsSnapshot, SnapshotStore};
