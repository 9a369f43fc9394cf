#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metrics_api::{DataPoint, MetricsStorage, RawDataPoint, StorageError, WriteRequest};
use metrics_engine::AdmissionController;

/// Storage stub that records every insert.
///
/// Inserts whose 1-based sequence number is a multiple of `fail_every` fail;
/// each insert sleeps for `delay(seq)` before resolving.
pub struct StubStorage {
    pub requests: Mutex<Vec<WriteRequest>>,
    pub attempts: AtomicUsize,
    pub completed: AtomicUsize,
    pub failed: AtomicUsize,
    fail_every: Option<usize>,
    delay: Box<dyn Fn(usize) -> Duration + Send + Sync>,
    panic_on: Option<usize>,
    pub reads: Mutex<Vec<(String, String, i64, i64)>>,
    pub read_result: Vec<DataPoint>,
}

impl StubStorage {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            fail_every: None,
            delay: Box::new(|_| Duration::ZERO),
            panic_on: None,
            reads: Mutex::new(Vec::new()),
            read_result: Vec::new(),
        }
    }

    pub fn failing_every(mut self, n: usize) -> Self {
        self.fail_every = Some(n);
        self
    }

    pub fn with_delay(mut self, delay: impl Fn(usize) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Box::new(delay);
        self
    }

    pub fn panicking_on(mut self, seq: usize) -> Self {
        self.panic_on = Some(seq);
        self
    }

    pub fn with_read_result(mut self, points: Vec<DataPoint>) -> Self {
        self.read_result = points;
        self
    }

    pub fn requests(&self) -> Vec<WriteRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl MetricsStorage for StubStorage {
    fn insert_data_point(
        &self,
        request: WriteRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>> {
        Box::pin(async move {
            let seq = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let delay = (self.delay)(seq);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.panic_on == Some(seq) {
                panic!("storage blew up on insert {seq}");
            }
            self.requests.lock().unwrap().push(request);
            let result = match self.fail_every {
                Some(n) if seq % n == 0 => {
                    self.failed.fetch_add(1, Ordering::SeqCst);
                    Err(StorageError::unavailable(format!("insert {seq} rejected")))
                }
                _ => Ok(()),
            };
            self.completed.fetch_add(1, Ordering::SeqCst);
            result
        })
    }

    fn read_range(
        &self,
        bucket: &str,
        id: &str,
        start: i64,
        end: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DataPoint>, StorageError>> + Send + '_>> {
        self.reads
            .lock()
            .unwrap()
            .push((bucket.to_string(), id.to_string(), start, end));
        let result = self.read_result.clone();
        Box::pin(async move { Ok(result) })
    }
}

pub fn points(n: usize) -> Vec<RawDataPoint> {
    (0..n)
        .map(|i| RawDataPoint::new("cpu", format!("host-{}", i % 7), 1_000 + i as i64, i as f64))
        .collect()
}

/// A limiter that never gets in the way.
pub fn unlimited() -> Arc<AdmissionController> {
    Arc::new(AdmissionController::new(1.0e9, Duration::ZERO).unwrap())
}
