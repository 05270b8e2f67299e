//! MySQL-backed record store.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | StoreError | Scenario |
//! |------------|------------|----------|
//! | Io / Tls / Protocol | `ConnectionLost` | Socket dropped, server went away |
//! | PoolClosed / PoolTimedOut | `ConnectionLost` | Connection unusable or unavailable |
//! | Database | `Query` (with server code) | Statement rejected by the server |
//! | Other | `Query` | Anything else |
//!
//! ## Tables
//!
//! `ensure_table` issues `CREATE TABLE IF NOT EXISTS` with the schema's natural
//! key as primary key, once per table per connection.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tracing::{debug, instrument};

use tablebeat_core::{Column, ConnectError, Row, Schema, SqlType, SqlValue, StoreError};

use super::{Connector, RecordStore};
use crate::config::ConnectionTarget;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens single-connection MySQL pools.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnector;

#[async_trait]
impl Connector for MySqlConnector {
    type Store = MySqlStore;

    #[instrument(skip(self, target), fields(target = %target), err)]
    async fn connect(&self, target: &ConnectionTarget) -> Result<MySqlStore, ConnectError> {
        let options = connect_options(target)?;

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| ConnectError::Refused(e.to_string()))?;

        Ok(MySqlStore::new(pool))
    }
}

/// Connection options parsed from the target's full locator.
fn connect_options(target: &ConnectionTarget) -> Result<MySqlConnectOptions, ConnectError> {
    if target.host().is_empty() || target.database().is_empty() {
        return Err(ConnectError::InvalidTarget(target.to_string()));
    }
    target
        .expose_locator()
        .parse::<MySqlConnectOptions>()
        .map_err(|_| ConnectError::InvalidTarget(target.to_string()))
}

/// One MySQL connection, with the tables it has already ensured.
#[derive(Debug)]
pub struct MySqlStore {
    pool: MySqlPool,
    ensured: Mutex<HashSet<String>>,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            ensured: Mutex::new(HashSet::new()),
        }
    }

    fn is_ensured(&self, table: &str) -> bool {
        self.ensured
            .lock()
            .map(|tables| tables.contains(table))
            .unwrap_or(false)
    }

    fn mark_ensured(&self, table: &str) {
        if let Ok(mut tables) = self.ensured.lock() {
            tables.insert(table.to_string());
        }
    }
}

#[async_trait]
impl RecordStore for MySqlStore {
    #[instrument(skip(self, schema), fields(table = %schema.table_name()), err)]
    async fn ensure_table(&self, schema: &dyn Schema) -> Result<(), StoreError> {
        if self.is_ensured(schema.table_name()) {
            return Ok(());
        }

        let ddl = create_table_sql(schema);
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_table", e))?;

        self.mark_ensured(schema.table_name());
        debug!("table ensured");
        Ok(())
    }

    #[instrument(skip(self, row), fields(table = %row.table()), err)]
    async fn upsert(&self, row: &Row) -> Result<(), StoreError> {
        let sql = upsert_sql(row);
        let mut query = sqlx::query(&sql);
        for value in row.values() {
            query = match value {
                SqlValue::Null => query.bind(None::<String>),
                SqlValue::Int(v) => query.bind(*v),
                SqlValue::Float(v) => query.bind(*v),
                SqlValue::Bool(v) => query.bind(*v),
                SqlValue::Text(v) => query.bind(v.as_str()),
                SqlValue::Timestamp(v) => query.bind(*v),
            };
        }

        query
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("upsert", e))?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn column_type(sql_type: SqlType) -> String {
    match sql_type {
        SqlType::BigInt => "BIGINT".to_string(),
        SqlType::Double => "DOUBLE".to_string(),
        SqlType::Bool => "BOOLEAN".to_string(),
        SqlType::Varchar(len) => format!("VARCHAR({len})"),
        SqlType::Text => "TEXT".to_string(),
        SqlType::Timestamp => "DATETIME(6)".to_string(),
    }
}

fn column_definition(column: &Column) -> String {
    let null = if column.nullable { "NULL" } else { "NOT NULL" };
    format!(
        "`{}` {} {}",
        column.name,
        column_type(column.sql_type),
        null
    )
}

fn quoted_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names
        .map(|name| format!("`{name}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Identifiers are checked by the registry, so backtick quoting is enough.
fn create_table_sql(schema: &dyn Schema) -> String {
    let mut lines: Vec<String> = schema.columns().iter().map(column_definition).collect();
    lines.push(format!(
        "PRIMARY KEY ({})",
        quoted_list(schema.natural_key().iter().copied())
    ));

    format!(
        "CREATE TABLE IF NOT EXISTS `{}` (\n  {}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
        schema.table_name(),
        lines.join(",\n  ")
    )
}

fn upsert_sql(row: &Row) -> String {
    let columns = quoted_list(row.columns().iter().map(|c| c.name));
    let placeholders = vec!["?"; row.columns().len()].join(", ");

    let mut updates: Vec<String> = row
        .non_key_cells()
        .map(|(column, _)| format!("`{0}` = VALUES(`{0}`)", column.name))
        .collect();
    if updates.is_empty() {
        // Key-only table: keep the statement an upsert without changing anything.
        if let Some(first) = row.natural_key().first() {
            updates.push(format!("`{first}` = `{first}`"));
        }
    }

    format!(
        "INSERT INTO `{}` ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {}",
        row.table(),
        columns,
        placeholders,
        updates.join(", ")
    )
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::Query {
            operation: operation.to_string(),
            code: db_err.code().map(|code| code.into_owned()),
            message: db_err.message().to_string(),
        },
        sqlx::Error::Io(e) => StoreError::connection_lost(operation, e.to_string()),
        sqlx::Error::Tls(e) => StoreError::connection_lost(operation, e.to_string()),
        sqlx::Error::Protocol(msg) => StoreError::connection_lost(operation, msg),
        sqlx::Error::PoolClosed => StoreError::connection_lost(operation, "connection pool closed"),
        sqlx::Error::PoolTimedOut => {
            StoreError::connection_lost(operation, "timed out waiting for a connection")
        }
        other => StoreError::query(operation, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use tablebeat_core::{Model, TypedSchema};
    use tablebeat_models::{AuditEntry, Heartbeat};

    use super::*;
    use crate::config::OutputConfig;

    #[test]
    fn connect_options_come_from_the_encoded_locator() {
        let mut config = OutputConfig::new("db.internal", "beats", "p@ss:word/?#", "telemetry");
        config.port = 3307;

        let options = connect_options(&config.target()).unwrap();

        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 3307);
        assert_eq!(options.get_username(), "beats");
        assert_eq!(options.get_database(), Some("telemetry"));
        assert_eq!(options.get_charset(), "utf8mb4");
    }

    #[test]
    fn empty_host_is_an_invalid_target() {
        let target = OutputConfig::new("", "beats", "secret", "telemetry").target();
        let err = connect_options(&target).unwrap_err();

        assert!(matches!(err, ConnectError::InvalidTarget(t) if !t.contains("secret")));
    }

    #[test]
    fn create_table_uses_natural_key_as_primary_key() {
        let schema = TypedSchema::<Heartbeat>::new();
        let ddl = create_table_sql(&schema);

        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS `heartbeats` ("));
        assert!(ddl.contains("`monitor_id` VARCHAR(128) NOT NULL"));
        assert!(ddl.contains("`checked_at` DATETIME(6) NOT NULL"));
        assert!(ddl.contains("`error` TEXT NULL"));
        assert!(ddl.contains("PRIMARY KEY (`monitor_id`, `checked_at`)"));
    }

    #[test]
    fn upsert_updates_only_non_key_columns() {
        let row = Row::new(
            Heartbeat::NAME,
            Heartbeat::TABLE,
            Heartbeat::columns(),
            Heartbeat::natural_key(),
            vec![
                "api".to_string().into(),
                Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap().into(),
                "up".to_string().into(),
                SqlValue::Int(12),
                SqlValue::Null,
            ],
        )
        .unwrap();

        assert_eq!(
            upsert_sql(&row),
            "INSERT INTO `heartbeats` (`monitor_id`, `checked_at`, `status`, `duration_ms`, `error`) \
             VALUES (?, ?, ?, ?, ?) ON DUPLICATE KEY UPDATE \
             `status` = VALUES(`status`), `duration_ms` = VALUES(`duration_ms`), `error` = VALUES(`error`)"
        );
    }

    #[test]
    fn key_only_rows_still_upsert() {
        const COLUMNS: &[Column] = &[Column::new("id", SqlType::Varchar(16))];
        let row = Row::new("Tag", "tags", COLUMNS, &["id"], vec!["a".to_string().into()]).unwrap();

        assert!(upsert_sql(&row).ends_with("ON DUPLICATE KEY UPDATE `id` = `id`"));
    }

    #[test]
    fn audit_entries_map_bool_and_text_columns() {
        let ddl = create_table_sql(&TypedSchema::<AuditEntry>::new());
        assert!(ddl.contains("BOOLEAN NOT NULL"));
        assert!(ddl.contains("PRIMARY KEY (`entry_id`)"));
    }

    #[test]
    fn transport_failures_are_connection_loss() {
        let io = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer",
        ));
        assert!(matches!(
            map_sqlx_error("upsert", io),
            StoreError::ConnectionLost { .. }
        ));
        assert!(matches!(
            map_sqlx_error("upsert", sqlx::Error::PoolClosed),
            StoreError::ConnectionLost { .. }
        ));
        assert!(matches!(
            map_sqlx_error("upsert", sqlx::Error::RowNotFound),
            StoreError::Query { .. }
        ));
    }
}
