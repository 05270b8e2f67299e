//! Record persistence: resolve schema, ensure table, decode, upsert.

use std::sync::Arc;

use tracing::instrument;

use tablebeat_core::{ModelRegistry, PersistError, Row, Schema};

use crate::extractor::Record;
use crate::store::RecordStore;

/// Writes records through a [`RecordStore`] using a fixed model registry.
///
/// Steps run strictly in order; the first failure stops the record:
///
/// 1. resolve the schema by name (`ModelNotFound`)
/// 2. ensure the destination table exists (`Store`)
/// 3. decode the payload into a row (`Decode`)
/// 4. upsert the row (`Store`)
///
/// [`RecordPersister::classify`] runs only the store-free steps (1 and 3).
#[derive(Debug, Clone)]
pub struct RecordPersister {
    registry: Arc<ModelRegistry>,
}

impl RecordPersister {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    #[instrument(
        level = "debug",
        skip(self, record, store),
        fields(
            schema = %record.schema_name(),
            event_id = %record.event().event_id()
        )
    )]
    pub async fn persist<S>(&self, record: &Record<'_>, store: &S) -> Result<(), PersistError>
    where
        S: RecordStore + ?Sized,
    {
        let schema = self.resolve(record)?;

        store.ensure_table(schema.as_ref()).await?;
        let row = schema.decode(record.payload())?;
        store.upsert(&row).await?;
        Ok(())
    }

    /// Resolve and decode without touching a store.
    ///
    /// Permanent failures (`ModelNotFound`, `Decode`) surface here even when
    /// the store is unreachable.
    pub fn classify(&self, record: &Record<'_>) -> Result<Row, PersistError> {
        let schema = self.resolve(record)?;
        Ok(schema.decode(record.payload())?)
    }

    fn resolve(&self, record: &Record<'_>) -> Result<Arc<dyn Schema>, PersistError> {
        self.registry
            .resolve(record.schema_name())
            .map_err(|_| PersistError::ModelNotFound(record.schema_name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use tablebeat_core::{DecodeError, StoreError};
    use tablebeat_events::Event;
    use tablebeat_models::default_registry;

    use super::*;
    use crate::extractor::extract;
    use crate::store::InMemoryStore;

    fn persister() -> RecordPersister {
        RecordPersister::new(Arc::new(default_registry().unwrap()))
    }

    fn heartbeat_event(model: &str, payload: &str) -> Event {
        Event::new(json!({
            "headers": { "Model": [model] },
            "data": { "data": payload }
        }))
    }

    const HEARTBEAT: &str = r#"{"monitor_id":"api","checked_at":"2024-05-01T12:00:00Z","status":"up","duration_ms":12}"#;

    #[tokio::test]
    async fn persists_known_model() {
        let store = InMemoryStore::new();
        let event = heartbeat_event("Heartbeat", HEARTBEAT);

        persister()
            .persist(&extract(&event).unwrap(), &store)
            .await
            .unwrap();

        assert_eq!(store.row_count("heartbeats"), 1);
    }

    #[tokio::test]
    async fn unknown_model_never_touches_the_store() {
        let store = InMemoryStore::new();
        let event = heartbeat_event("Ghost", "{}");

        let err = persister()
            .persist(&extract(&event).unwrap(), &store)
            .await
            .unwrap_err();

        assert_eq!(err, PersistError::ModelNotFound("Ghost".into()));
        assert!(!err.is_retryable());
        assert!(!store.table_exists("ghost"));
    }

    #[tokio::test]
    async fn undecodable_payload_is_not_retryable_but_table_exists() {
        let store = InMemoryStore::new();
        let event = heartbeat_event("Heartbeat", "not json");

        let err = persister()
            .persist(&extract(&event).unwrap(), &store)
            .await
            .unwrap_err();

        assert!(matches!(err, PersistError::Decode(DecodeError::Payload { .. })));
        assert!(!err.is_retryable());
        assert!(store.table_exists("heartbeats"));
        assert_eq!(store.row_count("heartbeats"), 0);
    }

    #[test]
    fn classify_reports_permanent_failures_without_a_store() {
        let persister = persister();

        let ghost = heartbeat_event("Ghost", "{}");
        assert_eq!(
            persister.classify(&extract(&ghost).unwrap()),
            Err(PersistError::ModelNotFound("Ghost".into()))
        );

        let broken = heartbeat_event("Heartbeat", "{not json");
        assert!(matches!(
            persister.classify(&extract(&broken).unwrap()),
            Err(PersistError::Decode(_))
        ));

        let valid = heartbeat_event("Heartbeat", HEARTBEAT);
        let row = persister.classify(&extract(&valid).unwrap()).unwrap();
        assert_eq!(row.table(), "heartbeats");
    }

    #[tokio::test]
    async fn store_failures_are_retryable() {
        let store = InMemoryStore::new();
        store.fail_writes_after(0);
        let event = heartbeat_event("Heartbeat", HEARTBEAT);

        let err = persister()
            .persist(&extract(&event).unwrap(), &store)
            .await
            .unwrap_err();

        assert!(matches!(err, PersistError::Store(StoreError::ConnectionLost { .. })));
        assert!(err.is_retryable());
        assert!(err.is_connection_lost());
    }
}
