//! Upstream batch handle (acknowledgement mechanics only).
//!
//! A batch is the unit the upstream pipeline hands to an output. The output
//! must settle it exactly once, with one of three signals:
//!
//! - **ack**: every event was handled and may leave the retry buffer
//! - **retry_events**: the listed events go back for redelivery; all others
//!   count as handled
//! - **cancelled**: processing never started; the whole batch goes back
//!
//! The settling methods take `self` by value, so a batch cannot be settled
//! twice.

use crate::Event;

/// A batch of events delivered together for joint acknowledgement.
///
/// ## Delivery Guarantees
///
/// Redelivery is **at-least-once**: an event handed back with
/// `retry_events` arrives again in a future batch, possibly after events
/// that were published later. Consumers must be idempotent (upserts are).
pub trait BatchHandle: Send {
    /// Events in arrival order.
    fn events(&self) -> &[Event];

    fn ack(self);

    fn retry_events(self, events: Vec<Event>);

    fn cancelled(self);
}

/// How a batch was settled.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Acked,
    Retried(Vec<Event>),
    Cancelled(Vec<Event>),
}

impl BatchOutcome {
    /// Events the upstream will redeliver.
    pub fn redelivered(&self) -> &[Event] {
        match self {
            BatchOutcome::Acked => &[],
            BatchOutcome::Retried(events) | BatchOutcome::Cancelled(events) => events,
        }
    }
}
