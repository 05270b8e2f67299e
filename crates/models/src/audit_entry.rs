use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tablebeat_core::{Column, Model, SqlType, SqlValue};

/// Security audit record, keyed by the producer-assigned entry id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: String,
    pub actor: String,
    pub action: String,
    #[serde(default)]
    pub target: Option<String>,
    pub success: bool,
    pub occurred_at: DateTime<Utc>,
}

impl Model for AuditEntry {
    const NAME: &'static str = "AuditEntry";
    const TABLE: &'static str = "audit_entries";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("entry_id", SqlType::Varchar(64)),
            Column::new("actor", SqlType::Varchar(128)),
            Column::new("action", SqlType::Varchar(64)),
            Column::new("target", SqlType::Text).nullable(),
            Column::new("success", SqlType::Bool),
            Column::new("occurred_at", SqlType::Timestamp),
        ];
        COLUMNS
    }

    fn natural_key() -> &'static [&'static str] {
        &["entry_id"]
    }

    fn into_values(self) -> Vec<SqlValue> {
        vec![
            self.entry_id.into(),
            self.actor.into(),
            self.action.into(),
            self.target.into(),
            self.success.into(),
            self.occurred_at.into(),
        ]
    }
}
