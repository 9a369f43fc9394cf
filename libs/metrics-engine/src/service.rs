use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use metrics_api::{DataPoint, MetricsService, MetricsStorage, RawDataPoint, StorageError};

use crate::admission::AdmissionController;
use crate::config::IngestConfig;
use crate::error::EngineError;
use crate::writer::BatchWriter;

/// The metrics service: rate-limited batch ingestion over a storage
/// backend, plus read delegation.
pub struct IngestService {
    storage: Arc<dyn MetricsStorage>,
    writer: BatchWriter,
    interrupt: CancellationToken,
}

impl std::fmt::Debug for IngestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestService")
            .field("writer", &self.writer)
            .field("interrupted", &self.interrupt.is_cancelled())
            .finish()
    }
}

impl IngestService {
    pub fn new(
        storage: Arc<dyn MetricsStorage>,
        limiter: Arc<AdmissionController>,
        workers: Handle,
    ) -> Self {
        Self {
            writer: BatchWriter::new(Arc::clone(&storage), limiter, workers),
            storage,
            interrupt: CancellationToken::new(),
        }
    }

    /// Build the service from the `[ingest]` config section.
    pub fn from_config(
        config: &IngestConfig,
        storage: Arc<dyn MetricsStorage>,
        workers: Handle,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let limiter = AdmissionController::new(config.request_limit, config.warmup())?;
        tracing::info!(
            request_limit = config.request_limit,
            warmup_secs = config.warmup_secs,
            "admission control configured"
        );
        Ok(Self::new(storage, Arc::new(limiter), workers))
    }

    pub fn limiter(&self) -> &Arc<AdmissionController> {
        self.writer.limiter()
    }

    /// Interrupt every current and future batch wait. Used on shutdown.
    pub fn interrupt(&self) {
        self.interrupt.cancel();
    }

    /// A token that interrupts a single `add_data_until` call.
    ///
    /// It is a child of the service token, so `interrupt()` fires it too.
    pub fn interrupt_token(&self) -> CancellationToken {
        self.interrupt.child_token()
    }

    /// Like `add_data`, but stops waiting once `interrupt` fires.
    pub async fn add_data_until(&self, data: &[RawDataPoint], interrupt: &CancellationToken) {
        self.writer.write_batch(data, interrupt).await;
    }
}

impl MetricsService for IngestService {
    fn add_data<'a>(
        &'a self,
        data: &'a [RawDataPoint],
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(self.writer.write_batch(data, &self.interrupt))
    }

    fn find_data(
        &self,
        bucket: &str,
        id: &str,
        start: i64,
        end: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DataPoint>, StorageError>> + Send + '_>> {
        self.storage.read_range(bucket, id, start, end)
    }

    /// Always empty: reading by id alone needs an index from id to the
    /// buckets holding it, which the store does not keep.
    fn find_data_by_id(&self, _id: &str, _start: i64, _end: i64) -> Vec<DataPoint> {
        Vec::new()
    }

    /// Always `false`, for the same reason as `find_data_by_id`.
    fn id_exists(&self, _id: &str) -> bool {
        false
    }
}
