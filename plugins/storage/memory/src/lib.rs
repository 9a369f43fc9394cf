use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use metrics_api::{DataKind, DataPoint, MetricsStorage, StorageError, WriteRequest};

// ═══════════════════════════════════════════════════════════════
//  MemoryStorage
// ═══════════════════════════════════════════════════════════════

struct Entry {
    values: BTreeMap<DataKind, f64>,
    expires_at: Instant,
}

/// Series are keyed by `(bucket, id)`, points within a series by timestamp.
type Series = BTreeMap<i64, Entry>;

/// In-memory time-series storage. Honours per-point TTL on reads; expired
/// points are reclaimed by `purge_expired`.
///
/// Each series keeps at most `max_points_per_series` points, evicting the
/// oldest timestamp first.
pub struct MemoryStorage {
    series: RwLock<HashMap<(String, String), Series>>,
    max_points_per_series: usize,
}

impl MemoryStorage {
    pub fn new(max_points_per_series: usize) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            max_points_per_series: max_points_per_series.max(1),
        }
    }

    /// Drop expired points and emptied series. Returns the number of points removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut series = self.series.write().await;
        let mut removed = 0;
        series.retain(|_, points| {
            let before = points.len();
            points.retain(|_, entry| entry.expires_at > now);
            removed += before - points.len();
            !points.is_empty()
        });
        if removed > 0 {
            tracing::debug!(removed, series = series.len(), "purged expired points");
        }
        removed
    }
}

impl MetricsStorage for MemoryStorage {
    fn insert_data_point(
        &self,
        request: WriteRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>> {
        Box::pin(async move {
            if request.values.is_empty() {
                return Err(StorageError::logic(format!(
                    "no values for {}/{}@{}",
                    request.bucket, request.id, request.timestamp
                )));
            }
            let expires_at = Instant::now() + Duration::from_secs(u64::from(request.ttl_seconds));

            let mut series = self.series.write().await;
            let points = series.entry((request.bucket.clone(), request.id.clone())).or_default();
            match points.get_mut(&request.timestamp) {
                // Same cell written again: values merge, TTL restarts.
                Some(entry) => {
                    entry.values.extend(request.values);
                    entry.expires_at = expires_at;
                }
                None => {
                    if points.len() >= self.max_points_per_series {
                        // Older than everything kept: it would be the one evicted.
                        let oldest = points.first_key_value().map(|(&ts, _)| ts);
                        if oldest.is_some_and(|oldest| request.timestamp < oldest) {
                            tracing::debug!(
                                bucket = %request.bucket,
                                id = %request.id,
                                timestamp = request.timestamp,
                                "series full, dropped point older than retained window"
                            );
                            return Ok(());
                        }
                        points.pop_first();
                    }
                    points.insert(
                        request.timestamp,
                        Entry {
                            values: request.values,
                            expires_at,
                        },
                    );
                }
            }
            Ok(())
        })
    }

    fn read_range(
        &self,
        bucket: &str,
        id: &str,
        start: i64,
        end: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DataPoint>, StorageError>> + Send + '_>> {
        let key = (bucket.to_string(), id.to_string());
        Box::pin(async move {
            if start >= end {
                return Ok(Vec::new());
            }
            let now = Instant::now();
            let series = self.series.read().await;
            let Some(points) = series.get(&key) else {
                return Ok(Vec::new());
            };
            let result = points
                .range(start..end)
                .filter(|(_, entry)| entry.expires_at > now)
                .map(|(ts, entry)| DataPoint {
                    bucket: key.0.clone(),
                    id: key.1.clone(),
                    timestamp: *ts,
                    values: entry.values.clone(),
                })
                .collect();
            Ok(result)
        })
    }
}
