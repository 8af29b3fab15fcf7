//! Metric categories, snapshot shape, and the persistence seam.

use serde::Serialize;
use serde_json::{Map, Value};

use palette_core::types::Timestamp;

use crate::aggregator::MetricsError;

/// Category a metrics bucket accumulates under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricCategory {
    /// Per-command cool-down bookkeeping.
    Cooldown,
    /// Server join/leave/total counts.
    Guilds,
    /// User population counts.
    Users,
    /// Chat model and tone usage.
    Chat,
    /// Image generation actions and ratings.
    Image,
}

impl MetricCategory {
    /// Lowercase name used in persisted snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::Cooldown => "cooldown",
            MetricCategory::Guilds => "guilds",
            MetricCategory::Users => "users",
            MetricCategory::Chat => "chat",
            MetricCategory::Image => "image",
        }
    }
}

/// One flushed metrics bucket, immutable once produced.
///
/// Serialized as `{"type": .., "time": .., "data": ..}` with an
/// ISO-8601 timestamp, and appended to the snapshot collection —
/// never updated in place.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    #[serde(rename = "type")]
    pub category: MetricCategory,
    pub time: Timestamp,
    pub data: Map<String, Value>,
}

/// Append-only persistence for flushed snapshots.
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Append one flush cycle's snapshots to the collection.
    async fn append(&self, snapshots: &[MetricsSnapshot]) -> Result<(), MetricsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_with_type_and_iso_time() {
        let mut data = Map::new();
        data.insert("generation".into(), Value::from(3));

        let snapshot = MetricsSnapshot {
            category: MetricCategory::Image,
            time: "2024-05-01T12:00:00Z".parse().unwrap(),
            data,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["time"], "2024-05-01T12:00:00Z");
        assert_eq!(json["data"]["generation"], 3);
    }
}
