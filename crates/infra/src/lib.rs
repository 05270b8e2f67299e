//! Infrastructure layer: config, stores, and the batch publishing client.

pub mod accountant;
pub mod client;
pub mod config;
pub mod extractor;
pub mod output;
pub mod persister;
pub mod store;


pub use accountant::{BatchAccountant, BatchSummary};
pub use client::{Client, ClientStatus, PublishError};
pub use config::{ConfigError, ConnectionTarget, OutputConfig, RetryBudget, SensitiveString};
pub use extractor::{Record, extract};
pub use output::{OutputError, OutputGroup, make_mysql_output, make_output};
pub use persister::RecordPersister;
pub use store::{
    Connector, InMemoryConnector, InMemoryStore, MySqlConnector, MySqlStore, RecordStore,
};
