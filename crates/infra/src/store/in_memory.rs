//! In-memory record store for tests/dev.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use tablebeat_core::{ConnectError, Row, Schema, StoreError};

use super::{Connector, RecordStore};
use crate::config::ConnectionTarget;

type NaturalKey = Vec<String>;

/// In-memory store.
///
/// - No IO
/// - Rows are keyed by natural key, so writes are upserts
/// - Connection loss can be injected with [`InMemoryStore::fail_writes_after`]
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, BTreeMap<NaturalKey, Row>>>,
    writes_left: Mutex<Option<usize>>,
    lost: AtomicBool,
    closed: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `writes` more upserts succeed, then behave as a dropped connection.
    pub fn fail_writes_after(&self, writes: usize) {
        if let Ok(mut left) = self.writes_left.lock() {
            *left = Some(writes);
        }
        if writes == 0 {
            self.lost.store(true, Ordering::SeqCst);
        }
    }

    /// Undo [`InMemoryStore::fail_writes_after`].
    pub fn restore_connection(&self) {
        if let Ok(mut left) = self.writes_left.lock() {
            *left = None;
        }
        self.lost.store(false, Ordering::SeqCst);
    }

    pub fn table_exists(&self, table: &str) -> bool {
        self.tables
            .read()
            .map(|tables| tables.contains_key(table))
            .unwrap_or(false)
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .ok()
            .and_then(|tables| tables.get(table).map(BTreeMap::len))
            .unwrap_or(0)
    }

    /// Rows of a table, ordered by natural key.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .ok()
            .and_then(|tables| tables.get(table).map(|rows| rows.values().cloned().collect()))
            .unwrap_or_default()
    }

    /// Row with the given natural key, written as key fragments.
    pub fn get(&self, table: &str, key: &[&str]) -> Option<Row> {
        let key: NaturalKey = key.iter().map(|part| part.to_string()).collect();
        let tables = self.tables.read().ok()?;
        tables.get(table)?.get(&key).cloned()
    }

    /// Successful upserts so far, including overwrites.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_connection(&self, operation: &str) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::connection_lost(operation, "store is closed"));
        }
        if self.lost.load(Ordering::SeqCst) {
            return Err(StoreError::connection_lost(operation, "connection reset"));
        }
        Ok(())
    }

    /// Count down the injected write allowance; trips connection loss at zero.
    fn take_write(&self) -> Result<(), StoreError> {
        let mut left = self
            .writes_left
            .lock()
            .map_err(|_| StoreError::query("upsert", "store lock poisoned"))?;
        match left.as_mut() {
            None => Ok(()),
            Some(0) => {
                self.lost.store(true, Ordering::SeqCst);
                Err(StoreError::connection_lost("upsert", "connection reset"))
            }
            Some(n) => {
                *n -= 1;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn ensure_table(&self, schema: &dyn Schema) -> Result<(), StoreError> {
        self.check_connection("ensure_table")?;
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::query("ensure_table", "store lock poisoned"))?;
        tables.entry(schema.table_name().to_string()).or_default();
        Ok(())
    }

    async fn upsert(&self, row: &Row) -> Result<(), StoreError> {
        self.check_connection("upsert")?;
        self.take_write()?;

        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::query("upsert", "store lock poisoned"))?;
        let Some(rows) = tables.get_mut(row.table()) else {
            return Err(StoreError::Query {
                operation: "upsert".to_string(),
                code: Some("1146".to_string()),
                message: format!("table '{}' doesn't exist", row.table()),
            });
        };

        let key = row.key_values().iter().map(|v| v.key_fragment()).collect();
        rows.insert(key, row.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out one shared [`InMemoryStore`].
#[derive(Debug, Default, Clone)]
pub struct InMemoryConnector {
    store: Arc<InMemoryStore>,
    refuse: Arc<AtomicBool>,
    connects: Arc<AtomicUsize>,
}

impl InMemoryConnector {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    pub fn store(&self) -> Arc<InMemoryStore> {
        self.store.clone()
    }

    /// Make every later `connect` fail.
    pub fn refuse_connections(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    type Store = Arc<InMemoryStore>;

    async fn connect(&self, target: &ConnectionTarget) -> Result<Arc<InMemoryStore>, ConnectError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ConnectError::Refused(format!("{target}: connection refused")));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.clone())
    }
}
