//! Pending metrics buffer: merge rules, strict delta parsing, flush.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::{Map, Number, Value};
use tokio::sync::Mutex;

use crate::store::{MetricCategory, MetricsSnapshot, SnapshotStore};

/// Errors from the metrics layer.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// A delta string was not a sign followed by a plain numeric
    /// literal. Only the offending field is dropped.
    #[error("Invalid metric delta {raw:?} for field {field:?}")]
    InvalidDelta { field: String, raw: String },

    /// The snapshot store rejected a flush.
    #[error("Snapshot store error: {0}")]
    Store(String),
}

/// Metrics collection configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether snapshots are persisted at all. When disabled, `flush`
    /// is a no-op and the buffer keeps accumulating.
    pub enabled: bool,
}

impl MetricsConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var           | Default |
    /// |-------------------|---------|
    /// | `METRICS_ENABLED` | `true`  |
    pub fn from_env() -> Self {
        let enabled = std::env::var("METRICS_ENABLED")
            .map(|raw| !matches!(raw.trim(), "false" | "0" | "no"))
            .unwrap_or(true);
        Self { enabled }
    }
}

/// Process-wide buffer of pending metric updates.
///
/// Shared via `Arc` across all concurrent dispatches. The internal
/// mutex serializes updates so that two concurrent increments to the
/// same field never lose one another.
pub struct MetricsAggregator {
    enabled: bool,
    pending: Mutex<HashMap<MetricCategory, Map<String, Value>>>,
}

impl MetricsAggregator {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            enabled: config.enabled,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Merge `updates` into the pending bucket for `category` and
    /// return the bucket's new contents.
    ///
    /// Each field is one of:
    /// - a literal (string / number / bool) — replaces the field;
    /// - a signed delta string (`"+2"`, `"-0.5"`) — applied against
    ///   the current value, baseline 0 when absent;
    /// - a nested mapping — merged recursively with the same rules.
    ///
    /// A malformed delta fails only its own field; siblings in the
    /// same batch still apply, and the first offender is surfaced as
    /// [`MetricsError::InvalidDelta`].
    pub async fn change(
        &self,
        category: MetricCategory,
        updates: Map<String, Value>,
    ) -> Result<Map<String, Value>, MetricsError> {
        let mut pending = self.pending.lock().await;
        let bucket = pending.entry(category).or_default();

        let mut first_error = None;
        merge_updates(bucket, &updates, &mut first_error);

        match first_error {
            Some(error) => Err(error),
            None => Ok(bucket.clone()),
        }
    }

    /// Snapshot and persist every non-empty bucket, then clear the
    /// buffer. No-op while metrics collection is disabled.
    ///
    /// Buckets are taken out under the lock before the store call, so
    /// updates arriving mid-flush land in the next cycle.
    pub async fn flush(
        &self,
        store: &dyn SnapshotStore,
    ) -> Result<Vec<MetricsSnapshot>, MetricsError> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let drained = {
            let mut pending = self.pending.lock().await;
            std::mem::take(&mut *pending)
        };

        let time = Utc::now();
        let snapshots: Vec<MetricsSnapshot> = drained
            .into_iter()
            .filter(|(_, data)| !data.is_empty())
            .map(|(category, data)| MetricsSnapshot {
                category,
                time,
                data,
            })
            .collect();

        if snapshots.is_empty() {
            return Ok(snapshots);
        }

        store.append(&snapshots).await?;
        tracing::debug!(count = snapshots.len(), "Flushed metric snapshots");
        Ok(snapshots)
    }

    /// Current pending data for a category, if any. Test and
    /// introspection helper; does not create the bucket.
    pub async fn pending(&self, category: MetricCategory) -> Option<Map<String, Value>> {
        self.pending.lock().await.get(&category).cloned()
    }
}

/// Apply one batch of updates onto an existing bucket, recursing into
/// nested mappings. Invalid deltas are skipped; the first one seen is
/// reported through `first_error`.
fn merge_updates(
    existing: &mut Map<String, Value>,
    updates: &Map<String, Value>,
    first_error: &mut Option<MetricsError>,
) {
    for (field, update) in updates {
        match update {
            Value::String(raw) if raw.starts_with('+') || raw.starts_with('-') => {
                match parse_delta(raw) {
                    Ok(delta) => {
                        let next = delta.apply(existing.get(field));
                        existing.insert(field.clone(), next);
                    }
                    Err(()) => {
                        if first_error.is_none() {
                            *first_error = Some(MetricsError::InvalidDelta {
                                field: field.clone(),
                                raw: raw.clone(),
                            });
                        }
                    }
                }
            }
            Value::Object(nested_updates) => {
                let entry = existing
                    .entry(field.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                if let Value::Object(nested) = entry {
                    merge_updates(nested, nested_updates, first_error);
                }
            }
            literal => {
                existing.insert(field.clone(), literal.clone());
            }
        }
    }
}

/// A strictly-parsed signed numeric delta.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Delta {
    Int(i64),
    Float(f64),
}

impl Delta {
    /// `previous ± delta`, with a baseline of 0 for absent or
    /// non-numeric previous values. Integer arithmetic is kept as long
    /// as both sides are integers.
    fn apply(self, previous: Option<&Value>) -> Value {
        let previous = previous.and_then(Value::as_number);
        match self {
            Delta::Int(delta) => match previous.and_then(Number::as_i64) {
                Some(prev) => Value::from(prev.saturating_add(delta)),
                None => {
                    let prev = previous.and_then(Number::as_f64).unwrap_or(0.0);
                    Value::from(prev + delta as f64)
                }
            },
            Delta::Float(delta) => {
                let prev = previous.and_then(Number::as_f64).unwrap_or(0.0);
                Value::from(prev + delta)
            }
        }
    }
}

/// Parse a `+`/`-` prefixed numeric literal.
///
/// Accepts only ASCII digits with at most one decimal point after the
/// sign. Everything else — words, exponents, embedded signs, empty
/// literals — is rejected.
fn parse_delta(raw: &str) -> Result<Delta, ()> {
    let (sign, literal) = match raw.split_at(1) {
        ("+", rest) => (1.0, rest),
        ("-", rest) => (-1.0, rest),
        _ => return Err(()),
    };

    if literal.is_empty()
        || !literal.chars().all(|c| c.is_ascii_digit() || c == '.')
        || literal.chars().filter(|c| *c == '.').count() > 1
    {
        return Err(());
    }

    if !literal.contains('.') {
        if let Ok(value) = literal.parse::<i64>() {
            return Ok(Delta::Int(if sign < 0.0 { -value } else { value }));
        }
    }

    match literal.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Delta::Float(sign * value)),
        _ => Err(()),
    }
}
