use std::future::Future;
use std::pin::Pin;

use crate::error::StorageError;
use crate::point::{DataPoint, WriteRequest};

/// Storage collaborator trait.
///
/// The ingestion engine doesn't know concrete backends; for the engine the
/// time-series store is just these two operations. Implementations must be
/// safe to call from many tasks at once.
pub trait MetricsStorage: Send + Sync {
    /// Insert one point. The point becomes unreadable after `request.ttl_seconds`.
    fn insert_data_point(
        &self,
        request: WriteRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>>;

    /// Read the points of one series with `start <= timestamp < end`,
    /// ordered by timestamp.
    fn read_range(
        &self,
        bucket: &str,
        id: &str,
        start: i64,
        end: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DataPoint>, StorageError>> + Send + '_>>;
}
