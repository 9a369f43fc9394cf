use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use metrics_api::{MetricsStorage, RawDataPoint, WriteRequest};

use crate::admission::AdmissionController;
use crate::latch::{CountDownLatch, CountDownOnDrop};

/// Writes batches of raw points: one admission permit and one independent
/// storage write per point, then waits until every write has resolved.
pub struct BatchWriter {
    storage: Arc<dyn MetricsStorage>,
    limiter: Arc<AdmissionController>,
    workers: Handle,
}

impl std::fmt::Debug for BatchWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWriter")
            .field("limiter", &self.limiter)
            .finish()
    }
}

impl BatchWriter {
    /// `workers` is the runtime the writes and their completions run on.
    pub fn new(
        storage: Arc<dyn MetricsStorage>,
        limiter: Arc<AdmissionController>,
        workers: Handle,
    ) -> Self {
        Self {
            storage,
            limiter,
            workers,
        }
    }

    pub fn limiter(&self) -> &Arc<AdmissionController> {
        &self.limiter
    }

    /// Store `points` and wait until each write has succeeded or failed.
    ///
    /// Every point is admitted and dispatched, even when `interrupt` has
    /// already fired. Failed writes are logged and otherwise ignored. The
    /// interrupt only cuts short the final wait: writes keep running and
    /// count down into the abandoned latch.
    pub async fn write_batch(&self, points: &[RawDataPoint], interrupt: &CancellationToken) {
        let _timer = BatchTimer::start(points.len());
        if points.is_empty() {
            return;
        }

        let latch = Arc::new(CountDownLatch::new(points.len()));
        for point in points {
            self.limiter.acquire().await;
            self.dispatch(point, &latch);
        }

        tokio::select! {
            _ = latch.wait() => {}
            _ = interrupt.cancelled() => {
                tracing::warn!(
                    pending = latch.count(),
                    points = points.len(),
                    "there was an interrupt while storing raw data"
                );
            }
        }
    }

    fn dispatch(&self, point: &RawDataPoint, latch: &Arc<CountDownLatch>) {
        let request = WriteRequest::raw(point);
        let storage = Arc::clone(&self.storage);
        let done = CountDownOnDrop(Arc::clone(latch));
        let point = point.clone();

        self.workers.spawn(async move {
            let _done = done;
            if let Err(e) = storage.insert_data_point(request).await {
                tracing::warn!(
                    bucket = %point.bucket,
                    id = %point.id,
                    timestamp = point.timestamp,
                    error = %e.message,
                    "failed to store {point}"
                );
            }
        });
    }
}

/// Logs the size and duration of a batch when it goes out of scope.
struct BatchTimer {
    points: usize,
    started: Instant,
}

impl BatchTimer {
    fn start(points: usize) -> Self {
        Self {
            points,
            started: Instant::now(),
        }
    }
}

impl Drop for BatchTimer {
    fn drop(&mut self) {
        tracing::debug!(
            points = self.points,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "stored raw metrics"
        );
    }
}
