//! Output factory: config in, ready-to-connect client out.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use tablebeat_core::RegistryError;
use tablebeat_events::Observer;
use tablebeat_models::default_registry;

use crate::client::Client;
use crate::config::{ConfigError, MetadataConfig, OutputConfig};
use crate::store::{Connector, MySqlConnector};

pub const OUTPUT_NAME: &str = "mysql";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("model registry: {0}")]
    Registry(#[from] RegistryError),
}

/// What the upstream pipeline needs to drive one output.
#[derive(Debug)]
pub struct OutputGroup<C: Connector> {
    /// Largest batch to hand to the client.
    pub batch_size: usize,
    /// Redeliveries allowed per event; `-1` is unlimited.
    pub retry: i32,
    pub flush_interval: Duration,
    pub metadata: MetadataConfig,
    pub client: Client<C>,
}

/// Build an unconnected client for `config` on top of `connector`.
pub fn make_output<C: Connector>(
    config: OutputConfig,
    connector: C,
    observer: Arc<dyn Observer>,
) -> Result<OutputGroup<C>, OutputError> {
    let config = config.checked()?;
    let registry = Arc::new(default_registry()?);
    let target = config.target();

    info!(
        output = OUTPUT_NAME,
        target = %target,
        models = ?registry.names(),
        "output configured"
    );

    let span = tablebeat_observability::output_span(OUTPUT_NAME, &target.to_string());
    let client = Client::new(connector, target, registry, observer, span)
        .with_retry_budget(config.retry_budget());

    Ok(OutputGroup {
        batch_size: config.bulk_max_size,
        retry: config.max_retries,
        flush_interval: config.bulk_flush_frequency,
        metadata: config.metadata,
        client,
    })
}

/// [`make_output`] for a real MySQL server.
pub fn make_mysql_output(
    config: OutputConfig,
    observer: Arc<dyn Observer>,
) -> Result<OutputGroup<MySqlConnector>, OutputError> {
    make_output(config, MySqlConnector, observer)
}
