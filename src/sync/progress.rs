use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::catalog::RunStats;

/// Shared run counters, updated by the item loop and read by the reporter.
#[derive(Debug, Default)]
pub struct RunCounters {
    pages_fetched: AtomicU64,
    items_seen: AtomicU64,
    items_new: AtomicU64,
    items_already_present: AtomicU64,
    items_transferred: AtomicU64,
    items_failed: AtomicU64,
}

impl RunCounters {
    pub fn add_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_seen(&self, count: u64) {
        self.items_seen.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_new(&self) {
        self.items_new.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_already_present(&self) {
        self.items_already_present.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_transferred(&self) {
        self.items_transferred.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_failed(&self) {
        self.items_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunStats {
        RunStats {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            items_seen: self.items_seen.load(Ordering::Relaxed),
            items_new: self.items_new.load(Ordering::Relaxed),
            items_already_present: self.items_already_present.load(Ordering::Relaxed),
            items_transferred: self.items_transferred.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            interrupted: false,
        }
    }
}

/// Background task that logs a counter snapshot at a fixed cadence while a
/// run is in flight.
///
/// Dropping the reporter cancels the task, so an early return from the run
/// loop never leaves a ticker logging behind it. `stop` additionally waits
/// for the task to finish, which the orderly shutdown path prefers so the
/// final summary prints after the last progress line.
pub struct ProgressReporter {
    token: CancellationToken,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl ProgressReporter {
    pub fn spawn(counters: Arc<RunCounters>, interval: Duration) -> Self {
        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(async move {
            // First tick after one full interval, not immediately
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        let stats = counters.snapshot();
                        tracing::info!(
                            pages = stats.pages_fetched,
                            seen = stats.items_seen,
                            new = stats.items_new,
                            already_present = stats.items_already_present,
                            transferred = stats.items_transferred,
                            failed = stats.items_failed,
                            "sync progress"
                        );
                    }
                }
            }
        });
        Self {
            token,
            handle: Some(handle),
        }
    }

    /// Cancel the ticker and wait for it to exit.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = RunCounters::default();
        counters.add_page();
        counters.add_page();
        counters.add_seen(150);
        counters.add_new();
        counters.add_already_present();
        counters.add_already_present();
        counters.add_transferred();
        counters.add_failed();

        let stats = counters.snapshot();
        assert_eq!(stats.pages_fetched, 2);
        assert_eq!(stats.items_seen, 150);
        assert_eq!(stats.items_new, 1);
        assert_eq!(stats.items_already_present, 2);
        assert_eq!(stats.items_transferred, 1);
        assert_eq!(stats.items_failed, 1);
        assert!(!stats.interrupted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_stops_cleanly() {
        let counters = Arc::new(RunCounters::default());
        let reporter = ProgressReporter::spawn(counters.clone(), Duration::from_secs(10));

        // Let a few ticks elapse before stopping
        tokio::time::advance(Duration::from_secs(35)).await;
        reporter.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_reporter_cancels_task() {
        let counters = Arc::new(RunCounters::default());
        let reporter = ProgressReporter::spawn(counters, Duration::from_secs(10));
        let token = reporter.token.clone();

        drop(reporter);
        assert!(token.is_cancelled());
    }
}
