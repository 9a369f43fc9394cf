//! Admission control for writes.
//!
//! A smooth token bucket: permits are handed out at a steady interval of
//! `1 / rate` seconds. Unused capacity is stored while the limiter is idle
//! and spent later, either for free (bursty bucket) or at a slower "cold"
//! rate that ramps up to the steady one over the warmup period.
//!
//! A request never waits for itself: the cost of a permit is charged to the
//! *next* caller by moving the next free moment forward.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::error::EngineError;

/// A cold limiter hands out permits at `rate / COLD_FACTOR`.
const COLD_FACTOR: f64 = 3.0;

/// Seconds of unused capacity a bursty bucket may store.
const MAX_BURST_SECONDS: f64 = 1.0;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Process-wide write rate limiter.
///
/// Shared by every submitter through an `Arc`; internally synchronised, the
/// lock is only held for the bookkeeping and never across an await.
#[derive(Debug)]
pub struct AdmissionController {
    rate: f64,
    warmup: Duration,
    bucket: Mutex<Bucket>,
}

impl AdmissionController {
    /// Create a limiter with a steady throughput of `rate_per_second`.
    ///
    /// A non-zero `warmup` starts the limiter cold; `Duration::ZERO` gives a
    /// bursty bucket that can store one second worth of permits.
    pub fn new(rate_per_second: f64, warmup: Duration) -> Result<Self, EngineError> {
        if !rate_per_second.is_finite() || rate_per_second <= 0.0 {
            return Err(EngineError::Config(format!(
                "admission rate must be a positive number, got {rate_per_second}"
            )));
        }
        Ok(Self {
            rate: rate_per_second,
            warmup,
            bucket: Mutex::new(Bucket::new(rate_per_second, warmup, Instant::now())),
        })
    }

    /// Steady-state permits per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn warmup(&self) -> Duration {
        self.warmup
    }

    /// Wait for one permit and consume it. Never fails.
    ///
    /// Returns how long the caller was delayed. The permit is reserved before
    /// the wait starts, so dropping the future mid-wait still consumes it.
    pub async fn acquire(&self) -> Duration {
        let wait = self.reserve(Instant::now());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        wait
    }

    fn reserve(&self, now: Instant) -> Duration {
        let wait_micros = self.lock().reserve_one(now);
        let secs = (wait_micros / MICROS_PER_SECOND).max(0.0);
        // Rates close to zero push the wait past what `Duration` can hold.
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    fn lock(&self) -> MutexGuard<'_, Bucket> {
        match self.bucket.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("admission bucket lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

#[derive(Debug)]
enum Shape {
    Bursty,
    WarmingUp {
        warmup_micros: f64,
        /// Stored permits below this are spent at the stable interval.
        threshold_permits: f64,
        /// Extra micros per stored permit above the threshold.
        slope: f64,
    },
}

#[derive(Debug)]
struct Bucket {
    origin: Instant,
    shape: Shape,
    stable_interval_micros: f64,
    max_permits: f64,
    stored_permits: f64,
    /// Earliest moment (micros since `origin`) the next request may proceed.
    next_free_micros: f64,
}

impl Bucket {
    fn new(rate: f64, warmup: Duration, origin: Instant) -> Self {
        let stable = MICROS_PER_SECOND / rate;
        let warmup_micros = warmup.as_secs_f64() * MICROS_PER_SECOND;

        if warmup_micros <= 0.0 {
            return Self {
                origin,
                shape: Shape::Bursty,
                stable_interval_micros: stable,
                max_permits: MAX_BURST_SECONDS * rate,
                stored_permits: 0.0,
                next_free_micros: 0.0,
            };
        }

        let cold_interval = stable * COLD_FACTOR;
        let threshold_permits = 0.5 * warmup_micros / stable;
        let max_permits = threshold_permits + 2.0 * warmup_micros / (stable + cold_interval);
        let slope = (cold_interval - stable) / (max_permits - threshold_permits);
        Self {
            origin,
            shape: Shape::WarmingUp {
                warmup_micros,
                threshold_permits,
                slope,
            },
            stable_interval_micros: stable,
            max_permits,
            // Starts cold.
            stored_permits: max_permits,
            next_free_micros: 0.0,
        }
    }

    fn micros_since_origin(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.origin).as_secs_f64() * MICROS_PER_SECOND
    }

    /// Micros it takes an idle limiter to store one more permit.
    fn cool_down_interval_micros(&self) -> f64 {
        match self.shape {
            Shape::Bursty => self.stable_interval_micros,
            Shape::WarmingUp { warmup_micros, .. } => warmup_micros / self.max_permits,
        }
    }

    fn resync(&mut self, now_micros: f64) {
        if now_micros > self.next_free_micros {
            let fresh = (now_micros - self.next_free_micros) / self.cool_down_interval_micros();
            self.stored_permits = self.max_permits.min(self.stored_permits + fresh);
            self.next_free_micros = now_micros;
        }
    }

    /// Cost in micros of spending `to_take` of the `stored` permits.
    fn stored_permits_wait_micros(&self, stored: f64, mut to_take: f64) -> f64 {
        match self.shape {
            Shape::Bursty => 0.0,
            Shape::WarmingUp {
                threshold_permits,
                slope,
                ..
            } => {
                let permits_to_time = |permits: f64| self.stable_interval_micros + permits * slope;
                let above_threshold = stored - threshold_permits;
                let mut micros = 0.0;
                if above_threshold > 0.0 {
                    let taken_above = above_threshold.min(to_take);
                    let length = permits_to_time(above_threshold)
                        + permits_to_time(above_threshold - taken_above);
                    micros = taken_above * length / 2.0;
                    to_take -= taken_above;
                }
                micros + self.stable_interval_micros * to_take
            }
        }
    }

    /// Reserve one permit at `now`, returning the micros the caller must wait.
    fn reserve_one(&mut self, now: Instant) -> f64 {
        let now_micros = self.micros_since_origin(now);
        self.resync(now_micros);

        let moment_available = self.next_free_micros;
        let from_stored = self.stored_permits.min(1.0);
        let fresh = 1.0 - from_stored;
        let cost = self.stored_permits_wait_micros(self.stored_permits, from_stored)
            + fresh * self.stable_interval_micros;

        self.next_free_micros += cost;
        self.stored_permits -= from_stored;
        (moment_available - now_micros).max(0.0)
    }
}
