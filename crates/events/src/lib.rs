//! Upstream-facing contracts: events, batches and outcome observers.

pub mod batch;
pub mod event;
pub mod in_memory_batch;
pub mod observer;

pub use batch::{BatchHandle, BatchOutcome};
pub use event::Event;
pub use in_memory_batch::{BatchReceipt, InMemoryBatch};
pub use observer::{NoopObserver, Observer, OutputStats, StatsSnapshot};
