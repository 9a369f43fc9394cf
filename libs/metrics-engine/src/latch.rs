use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Countdown shared between the completions of one batch and its waiter.
///
/// Many tasks count down, one task waits for zero. The count never goes
/// below zero, extra count-downs are ignored.
#[derive(Debug)]
pub struct CountDownLatch {
    remaining: AtomicUsize,
    zero: Notify,
}

impl CountDownLatch {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
            zero: Notify::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Decrement by one. Returns `true` for the call that reached zero.
    pub fn count_down(&self) -> bool {
        let prev = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match prev {
            Ok(1) => {
                self.zero.notify_waiters();
                true
            }
            _ => false,
        }
    }

    /// Resolve once the count reaches zero.
    pub async fn wait(&self) {
        loop {
            let notified = self.zero.notified();
            tokio::pin!(notified);
            // Register before checking so a count-down in between is not lost.
            notified.as_mut().enable();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Counts the latch down when dropped, so a completion is recorded even if
/// the write task panics or is torn down.
pub(crate) struct CountDownOnDrop(pub(crate) Arc<CountDownLatch>);

impl Drop for CountDownOnDrop {
    fn drop(&mut self) {
        self.0.count_down();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn zero_latch_is_already_open() {
        let latch = CountDownLatch::new(0);
        latch.wait().await;
        assert!(!latch.count_down());
        assert_eq!(latch.count(), 0);
    }

    #[tokio::test]
    async fn never_underflows() {
        let latch = CountDownLatch::new(2);
        assert!(!latch.count_down());
        assert!(latch.count_down());
        assert!(!latch.count_down());
        assert_eq!(latch.count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_count_downs_release_waiter_once() {
        let latch = Arc::new(CountDownLatch::new(1_000));
        let mut handles = Vec::new();
        for _ in 0..1_000 {
            let latch = latch.clone();
            handles.push(tokio::spawn(async move { latch.count_down() }));
        }

        tokio::time::timeout(Duration::from_secs(5), latch.wait())
            .await
            .expect("latch did not open");

        let mut reached_zero = 0;
        for h in handles {
            if h.await.unwrap() {
                reached_zero += 1;
            }
        }
        assert_eq!(reached_zero, 1);
    }

    #[tokio::test]
    async fn waiter_blocks_until_last_count_down() {
        let latch = Arc::new(CountDownLatch::new(2));
        latch.count_down();

        let waiter = tokio::spawn({
            let latch = latch.clone();
            async move { latch.wait().await }
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(CountDownOnDrop(latch.clone()));
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter still blocked")
            .unwrap();
    }
}
