//! Record store boundary.
//!
//! The output talks to its destination through two traits:
//!
//! - [`Connector`] opens one connection for a [`ConnectionTarget`]
//! - [`RecordStore`] is that connection: it creates tables and upserts rows
//!
//! Writes are upserts keyed by the schema's natural key, so replaying a
//! redelivered event leaves the destination unchanged.

pub mod in_memory;
pub mod mysql;

use std::sync::Arc;

use async_trait::async_trait;

use tablebeat_core::{ConnectError, Row, Schema, StoreError};

use crate::config::ConnectionTarget;

pub use in_memory::{InMemoryConnector, InMemoryStore};
pub use mysql::{MySqlConnector, MySqlStore};

/// An open connection to the destination store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the schema's table unless it already exists.
    async fn ensure_table(&self, schema: &dyn Schema) -> Result<(), StoreError>;

    /// Insert the row, or update the existing row with the same natural key.
    async fn upsert(&self, row: &Row) -> Result<(), StoreError>;

    /// Release the connection. Calling it twice is harmless.
    async fn close(&self);
}

#[async_trait]
impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    async fn ensure_table(&self, schema: &dyn Schema) -> Result<(), StoreError> {
        (**self).ensure_table(schema).await
    }

    async fn upsert(&self, row: &Row) -> Result<(), StoreError> {
        (**self).upsert(row).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}

/// Opens [`RecordStore`] connections.
#[async_trait]
pub trait Connector: Send + Sync {
    type Store: RecordStore + 'static;

    async fn connect(&self, target: &ConnectionTarget) -> Result<Self::Store, ConnectError>;
}
