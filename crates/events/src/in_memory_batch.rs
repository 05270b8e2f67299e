//! In-memory batch for tests/dev.

use std::sync::mpsc;

use crate::batch::{BatchHandle, BatchOutcome};
use crate::Event;

/// In-memory batch.
///
/// - No IO
/// - The settling signal is sent to the paired [`BatchReceipt`]
#[derive(Debug)]
pub struct InMemoryBatch {
    events: Vec<Event>,
    settled: mpsc::Sender<BatchOutcome>,
}

/// Receiving side of an [`InMemoryBatch`].
#[derive(Debug)]
pub struct BatchReceipt {
    outcome: mpsc::Receiver<BatchOutcome>,
}

impl InMemoryBatch {
    pub fn new(events: Vec<Event>) -> (Self, BatchReceipt) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                events,
                settled: tx,
            },
            BatchReceipt { outcome: rx },
        )
    }

    fn settle(self, outcome: BatchOutcome) {
        // Receipt may already be gone; nothing to report to then.
        let _ = self.settled.send(outcome);
    }
}

impl BatchHandle for InMemoryBatch {
    fn events(&self) -> &[Event] {
        &self.events
    }

    fn ack(self) {
        self.settle(BatchOutcome::Acked);
    }

    fn retry_events(self, events: Vec<Event>) {
        self.settle(BatchOutcome::Retried(events));
    }

    fn cancelled(self) {
        let events = self.events.clone();
        self.settle(BatchOutcome::Cancelled(events));
    }
}

impl BatchReceipt {
    /// The settling signal, if the batch was settled.
    pub fn outcome(&self) -> Option<BatchOutcome> {
        self.outcome.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn ack_is_reported_once() {
        let (batch, receipt) = InMemoryBatch::new(vec![Event::new(json!({}))]);
        assert_eq!(batch.events().len(), 1);

        batch.ack();
        assert_eq!(receipt.outcome(), Some(BatchOutcome::Acked));
        assert_eq!(receipt.outcome(), None);
    }

    #[test]
    fn cancelled_returns_every_event() {
        let events = vec![Event::new(json!({"a": 1})), Event::new(json!({"b": 2}))];
        let (batch, receipt) = InMemoryBatch::new(events.clone());

        batch.cancelled();
        let outcome = receipt.outcome().unwrap();
        assert_eq!(outcome.redelivered(), events.as_slice());
    }

    #[test]
    fn unsettled_batch_reports_nothing() {
        let (_batch, receipt) = InMemoryBatch::new(vec![]);
        assert_eq!(receipt.outcome(), None);
    }
}
