use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tablebeat_core::{Column, Model, SqlType, SqlValue};

/// A single host-level metric sample.
///
/// Re-sending the same `(host, metric, recorded_at)` overwrites the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMetric {
    pub host: String,
    pub metric: String,
    pub recorded_at: DateTime<Utc>,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

impl Model for HostMetric {
    const NAME: &'static str = "HostMetric";
    const TABLE: &'static str = "host_metrics";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("host", SqlType::Varchar(255)),
            Column::new("metric", SqlType::Varchar(128)),
            Column::new("recorded_at", SqlType::Timestamp),
            Column::new("value", SqlType::Double),
            Column::new("unit", SqlType::Varchar(32)).nullable(),
        ];
        COLUMNS
    }

    fn natural_key() -> &'static [&'static str] {
        &["host", "metric", "recorded_at"]
    }

    fn into_values(self) -> Vec<SqlValue> {
        vec![
            self.host.into(),
            self.metric.into(),
            self.recorded_at.into(),
            self.value.into(),
            self.unit.into(),
        ]
    }
}
