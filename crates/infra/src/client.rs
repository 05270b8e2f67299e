//! Batch publishing client.
//!
//! ## Lifecycle
//!
//! ```text
//! Unconnected --connect--> Connected --close--> Closed
//!      |                                          ^
//!      +------------------close-------------------+
//! ```
//!
//! `close` is idempotent and `Closed` is terminal.
//!
//! ## Concurrency
//!
//! The client state sits behind one async mutex. `publish` holds it for the
//! whole batch, so publishes are serialized and `close` waits for an
//! in-flight publish to settle its batch before releasing the connection.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, debug_span, info, warn};

use tablebeat_core::{ConnectError, ModelRegistry, PersistError, StoreError};
use tablebeat_events::{BatchHandle, Observer};

use crate::accountant::{BatchAccountant, BatchSummary};
use crate::config::{ConnectionTarget, RetryBudget};
use crate::extractor::extract;
use crate::persister::RecordPersister;
use crate::store::{Connector, RecordStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The batch was handed back untouched.
    #[error("client is not connected")]
    NotConnected,

    /// The batch was handed back untouched.
    #[error("client is closed")]
    Closed,

    /// The batch was settled; unprocessed events were handed back.
    #[error("publish cancelled after {processed} events; {remaining} handed back")]
    Cancelled { processed: usize, remaining: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    Unconnected,
    Connected,
    Closed,
}

enum ClientState<S> {
    Unconnected,
    Connected(S),
    Closed,
}

impl<S> ClientState<S> {
    fn status(&self) -> ClientStatus {
        match self {
            ClientState::Unconnected => ClientStatus::Unconnected,
            ClientState::Connected(_) => ClientStatus::Connected,
            ClientState::Closed => ClientStatus::Closed,
        }
    }
}

/// Publishes batches of events into a record store.
pub struct Client<C: Connector> {
    connector: C,
    target: ConnectionTarget,
    persister: RecordPersister,
    observer: Arc<dyn Observer>,
    budget: RetryBudget,
    span: Span,
    state: Mutex<ClientState<C::Store>>,
}

impl<C: Connector> Client<C> {
    /// Unconnected client. Everything it logs is recorded inside `span`.
    pub fn new(
        connector: C,
        target: ConnectionTarget,
        registry: Arc<ModelRegistry>,
        observer: Arc<dyn Observer>,
        span: Span,
    ) -> Self {
        Self {
            connector,
            target,
            persister: RecordPersister::new(registry),
            observer,
            budget: RetryBudget::default(),
            span,
            state: Mutex::new(ClientState::Unconnected),
        }
    }

    pub fn with_retry_budget(mut self, budget: RetryBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub fn retry_budget(&self) -> RetryBudget {
        self.budget
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// `mysql(host:port/db)`.
    pub fn identity(&self) -> String {
        self.target.identity()
    }

    pub async fn status(&self) -> ClientStatus {
        self.state.lock().await.status()
    }

    /// Open the store connection. A connected client stays as is.
    pub async fn connect(&self) -> Result<(), ConnectError> {
        async {
            let mut state = self.state.lock().await;
            match *state {
                ClientState::Connected(_) => return Ok(()),
                ClientState::Closed => return Err(ConnectError::Closed),
                ClientState::Unconnected => {}
            }

            let store = self.connector.connect(&self.target).await.inspect_err(|err| {
                warn!(error = %err, "connect failed");
            })?;
            *state = ClientState::Connected(store);
            info!("connected");
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }

    /// Publish every event of `batch` and settle it.
    ///
    /// Events are processed in order, one at a time. Extraction failures are
    /// dropped; persist failures are retried per the retry budget. After a
    /// connection loss the remaining events are failed without touching the
    /// store. `cancel` is checked before each event.
    pub async fn publish<B: BatchHandle>(
        &self,
        batch: B,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary, PublishError> {
        let span = debug_span!(parent: &self.span, "publish", events = batch.events().len());
        self.publish_batch(batch, cancel).instrument(span).await
    }

    async fn publish_batch<B: BatchHandle>(
        &self,
        batch: B,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary, PublishError> {
        let state = self.state.lock().await;
        let store = match &*state {
            ClientState::Connected(store) => store,
            ClientState::Unconnected => {
                batch.cancelled();
                return Err(PublishError::NotConnected);
            }
            ClientState::Closed => {
                batch.cancelled();
                return Err(PublishError::Closed);
            }
        };

        let events = batch.events();
        let mut accountant = BatchAccountant::begin(events.len(), self.budget, &*self.observer);
        let mut lost: Option<StoreError> = None;
        let mut processed = 0;

        for event in events {
            if cancel.is_cancelled() {
                accountant.mark_deferred(event);
                continue;
            }
            processed += 1;

            let record = match extract(event) {
                Ok(record) => record,
                Err(err) => {
                    warn!(
                        event_id = %event.event_id(),
                        schema = err.model().unwrap_or("-"),
                        error = %err,
                        "dropping event"
                    );
                    accountant.mark_dropped(event);
                    continue;
                }
            };

            if let Some(lost) = &lost {
                let err = match self.persister.classify(&record) {
                    Ok(_) => PersistError::Store(lost.clone()),
                    Err(permanent) => permanent,
                };
                debug!(
                    event_id = %event.event_id(),
                    schema = %record.schema_name(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "connection lost earlier in batch; failing event"
                );
                accountant.mark_failed(&record, err);
                continue;
            }

            match self.persister.persist(&record, store).await {
                Ok(()) => accountant.mark_succeeded(&record),
                Err(err) => {
                    warn!(
                        event_id = %event.event_id(),
                        schema = %record.schema_name(),
                        retryable = err.is_retryable(),
                        error = %err,
                        "failed to persist event"
                    );
                    if let PersistError::Store(store_err @ StoreError::ConnectionLost { .. }) = &err
                    {
                        lost = Some(store_err.clone());
                    }
                    accountant.mark_failed(&record, err);
                }
            }
        }

        let summary = accountant.finalize(batch);
        drop(state);

        debug!(
            acknowledged = summary.acknowledged,
            dropped = summary.dropped,
            failed = summary.failed,
            retried = summary.retried,
            "batch settled"
        );

        if processed < summary.total {
            return Err(PublishError::Cancelled {
                processed,
                remaining: summary.total - processed,
            });
        }
        Ok(summary)
    }

    /// Release the connection. Safe to call any number of times.
    pub async fn close(&self) {
        async {
            let mut state = self.state.lock().await;
            if let ClientState::Connected(store) = std::mem::replace(&mut *state, ClientState::Closed)
            {
                store.close().await;
                info!("closed");
            }
        }
        .instrument(self.span.clone())
        .await
    }
}

impl<C: Connector> fmt::Display for Client<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}

impl<C: Connector> fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("target", &self.target)
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}
