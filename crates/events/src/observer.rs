//! Per-output outcome counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Side-effect-only sink for batch outcome counts.
///
/// Called once per batch (`new_batch`) and once per non-empty outcome class
/// when the batch is settled. Implementations must be cheap and must not
/// fail.
pub trait Observer: Send + Sync {
    fn new_batch(&self, events: usize);

    /// Events discarded permanently (never retried).
    fn dropped(&self, events: usize);

    /// Events that could not be persisted.
    fn failed(&self, events: usize);

    /// Events durably written.
    fn acknowledged(&self, events: usize);
}

impl<O> Observer for Arc<O>
where
    O: Observer + ?Sized,
{
    fn new_batch(&self, events: usize) {
        (**self).new_batch(events)
    }

    fn dropped(&self, events: usize) {
        (**self).dropped(events)
    }

    fn failed(&self, events: usize) {
        (**self).failed(events)
    }

    fn acknowledged(&self, events: usize) {
        (**self).acknowledged(events)
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn new_batch(&self, _events: usize) {}
    fn dropped(&self, _events: usize) {}
    fn failed(&self, _events: usize) {}
    fn acknowledged(&self, _events: usize) {}
}

/// Lock-free counting observer.
#[derive(Debug, Default)]
pub struct OutputStats {
    batches: AtomicU64,
    events: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    acknowledged: AtomicU64,
}

/// Point-in-time copy of [`OutputStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub batches: u64,
    pub events: u64,
    pub dropped: u64,
    pub failed: u64,
    pub acknowledged: u64,
}

impl OutputStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            acknowledged: self.acknowledged.load(Ordering::Relaxed),
        }
    }
}

impl Observer for OutputStats {
    fn new_batch(&self, events: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.events.fetch_add(events as u64, Ordering::Relaxed);
    }

    fn dropped(&self, events: usize) {
        self.dropped.fetch_add(events as u64, Ordering::Relaxed);
    }

    fn failed(&self, events: usize) {
        self.failed.fetch_add(events as u64, Ordering::Relaxed);
    }

    fn acknowledged(&self, events: usize) {
        self.acknowledged.fetch_add(events as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate_across_batches() {
        let stats = Arc::new(OutputStats::new());
        let observer: Arc<dyn Observer> = stats.clone();

        observer.new_batch(3);
        observer.acknowledged(2);
        observer.dropped(1);
        observer.new_batch(1);
        observer.failed(1);

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                batches: 2,
                events: 4,
                dropped: 1,
                failed: 1,
                acknowledged: 2,
            }
        );
    }
}
