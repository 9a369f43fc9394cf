use std::future::Future;
use std::pin::Pin;

use crate::error::StorageError;
use crate::point::{DataPoint, RawDataPoint};

/// Public face of the metrics store: batch ingestion plus reads.
pub trait MetricsService: Send + Sync {
    /// Store a batch of raw points.
    ///
    /// Resolves once every point has either been written or has failed.
    /// Individual write failures are logged, never returned.
    fn add_data<'a>(
        &'a self,
        data: &'a [RawDataPoint],
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

    /// Points of `bucket`/`id` in `[start, end)`, straight from storage.
    fn find_data(
        &self,
        bucket: &str,
        id: &str,
        start: i64,
        end: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DataPoint>, StorageError>> + Send + '_>>;

    /// Points of `id` across all buckets in `[start, end)`.
    fn find_data_by_id(&self, id: &str, start: i64, end: i64) -> Vec<DataPoint>;

    /// Whether any series with this id has been stored.
    fn id_exists(&self, id: &str) -> bool;
}
