//! Per-batch outcome bookkeeping.
//!
//! Every event of a batch ends in exactly one class:
//!
//! | Class | Counted as | Redelivered |
//! |-------|------------|-------------|
//! | extraction failed | dropped | never |
//! | persisted | acknowledged | no |
//! | persist failed, retryable, budget left | failed | yes (`attempts + 1`) |
//! | persist failed, otherwise | failed | no (abandoned) |
//! | not processed (cancelled) | failed | yes (`attempts` unchanged) |
//!
//! The accountant settles the batch exactly once, in [`BatchAccountant::finalize`].

use serde::Serialize;
use tracing::{error, trace, warn};

use tablebeat_core::PersistError;
use tablebeat_events::{BatchHandle, Event, Observer};

use crate::config::RetryBudget;
use crate::extractor::Record;

/// Outcome counts of one settled batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub acknowledged: usize,
    pub dropped: usize,
    pub failed: usize,
    /// Failed events handed back for redelivery.
    pub retried: usize,
    /// Failed events given up on.
    pub abandoned: usize,
}

impl BatchSummary {
    /// Every event is in exactly one class.
    pub fn is_consistent(&self) -> bool {
        self.acknowledged + self.dropped + self.failed == self.total
            && self.retried + self.abandoned == self.failed
    }
}

#[derive(Debug)]
struct FailedRecord {
    event: Event,
    schema_name: String,
    error: PersistError,
}

/// Tracks how each event of one batch ended.
pub struct BatchAccountant<'o> {
    total: usize,
    outstanding: usize,
    acknowledged: usize,
    dropped: usize,
    failed: Vec<FailedRecord>,
    deferred: Vec<Event>,
    budget: RetryBudget,
    observer: &'o dyn Observer,
}

impl<'o> BatchAccountant<'o> {
    /// Start accounting for a batch of `total` events; reports it to `observer`.
    pub fn begin(total: usize, budget: RetryBudget, observer: &'o dyn Observer) -> Self {
        observer.new_batch(total);
        Self {
            total,
            outstanding: total,
            acknowledged: 0,
            dropped: 0,
            failed: Vec::new(),
            deferred: Vec::new(),
            budget,
            observer,
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn is_complete(&self) -> bool {
        self.outstanding == 0
    }

    /// The event could not be extracted; it is never retried.
    pub fn mark_dropped(&mut self, event: &Event) {
        self.settle_one();
        self.dropped += 1;
        trace!(event_id = %event.event_id(), "event dropped");
    }

    pub fn mark_succeeded(&mut self, record: &Record<'_>) {
        self.settle_one();
        self.acknowledged += 1;
        trace!(event_id = %record.event().event_id(), "event acknowledged");
    }

    pub fn mark_failed(&mut self, record: &Record<'_>, error: PersistError) {
        self.settle_one();
        self.failed.push(FailedRecord {
            event: record.event().clone(),
            schema_name: record.schema_name().to_string(),
            error,
        });
    }

    /// The event was never processed; it goes back without using its budget.
    pub fn mark_deferred(&mut self, event: &Event) {
        self.settle_one();
        self.deferred.push(event.clone());
    }

    fn settle_one(&mut self) {
        debug_assert!(self.outstanding > 0, "more outcomes than events");
        self.outstanding = self.outstanding.saturating_sub(1);
    }

    /// Flush counts to the observer and settle the batch.
    ///
    /// The batch is acked when nothing needs redelivery, otherwise the
    /// redeliverable events are handed back with `retry_events`.
    pub fn finalize<B: BatchHandle>(self, batch: B) -> BatchSummary {
        if !self.is_complete() {
            error!(
                outstanding = self.outstanding,
                total = self.total,
                "finalizing batch with unaccounted events"
            );
        }

        let failed = self.failed.len() + self.deferred.len();
        let mut retry = Vec::with_capacity(failed);
        let mut abandoned = 0;

        for record in self.failed {
            if record.error.is_retryable() && self.budget.allows(record.event.attempts()) {
                retry.push(record.event.redelivered());
                continue;
            }

            abandoned += 1;
            if record.error.is_retryable() {
                warn!(
                    event_id = %record.event.event_id(),
                    schema = %record.schema_name,
                    attempts = record.event.attempts(),
                    error = %record.error,
                    "retry budget exhausted; abandoning event"
                );
            }
        }
        retry.extend(self.deferred);

        let summary = BatchSummary {
            total: self.total,
            acknowledged: self.acknowledged,
            dropped: self.dropped,
            failed,
            retried: retry.len(),
            abandoned,
        };

        if summary.dropped > 0 {
            self.observer.dropped(summary.dropped);
        }
        if summary.failed > 0 {
            self.observer.failed(summary.failed);
        }
        if summary.acknowledged > 0 {
            self.observer.acknowledged(summary.acknowledged);
        }

        if retry.is_empty() {
            batch.ack();
        } else {
            batch.retry_events(retry);
        }
        summary
    }
}
