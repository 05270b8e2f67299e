use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tablebeat_core::{Column, Model, SqlType, SqlValue};

/// Result of one uptime check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartbeatStatus {
    Up,
    Down,
}

impl HeartbeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeartbeatStatus::Up => "up",
            HeartbeatStatus::Down => "down",
        }
    }
}

/// One monitor check, keyed by monitor and check time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub monitor_id: String,
    pub checked_at: DateTime<Utc>,
    pub status: HeartbeatStatus,
    pub duration_ms: u32,
    #[serde(default)]
    pub error: Option<String>,
}

impl Model for Heartbeat {
    const NAME: &'static str = "Heartbeat";
    const TABLE: &'static str = "heartbeats";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("monitor_id", SqlType::Varchar(128)),
            Column::new("checked_at", SqlType::Timestamp),
            Column::new("status", SqlType::Varchar(8)),
            Column::new("duration_ms", SqlType::BigInt),
            Column::new("error", SqlType::Text).nullable(),
        ];
        COLUMNS
    }

    fn natural_key() -> &'static [&'static str] {
        &["monitor_id", "checked_at"]
    }

    fn into_values(self) -> Vec<SqlValue> {
        vec![
            self.monitor_id.into(),
            self.checked_at.into(),
            self.status.as_str().to_string().into(),
            i64::from(self.duration_ms).into(),
            self.error.into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use tablebeat_core::{Schema, TypedSchema};

    use super::*;

    #[test]
    fn decodes_down_check_with_error() {
        let row = TypedSchema::<Heartbeat>::new()
            .decode(
                br#"{"monitor_id":"api","checked_at":"2026-01-02T03:04:05Z","status":"down","duration_ms":1200,"error":"timeout"}"#,
            )
            .unwrap();

        assert_eq!(row.get("status"), Some(&SqlValue::Text("down".into())));
        assert_eq!(row.get("duration_ms"), Some(&SqlValue::Int(1200)));
        assert_eq!(row.key_values().len(), 2);
    }

    #[test]
    fn error_is_optional() {
        let row = TypedSchema::<Heartbeat>::new()
            .decode(br#"{"monitor_id":"api","checked_at":"2026-01-02T03:04:05Z","status":"up","duration_ms":8}"#)
            .unwrap();
        assert_eq!(row.get("error"), Some(&SqlValue::Null));
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(
            TypedSchema::<Heartbeat>::new()
                .decode(br#"{"monitor_id":"api","checked_at":"2026-01-02T03:04:05Z","status":"flapping","duration_ms":8}"#)
                .is_err()
        );
    }
}
