use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Envelope for one upstream event.
///
/// The content is a nested key/value structure produced by the upstream
/// pipeline. Routing data lives under `headers`, the payload under `data`:
///
/// ```text
/// { "headers": { "Model": ["Heartbeat"] }, "data": { "data": "{\"monitor_id\": ...}" } }
/// ```
///
/// Notes:
/// - Events are **immutable**; redelivery produces a new envelope with a
///   bumped `attempts` counter.
/// - `event_id` is the reference used in logs. Content is never logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    event_id: Uuid,
    timestamp: DateTime<Utc>,

    /// Number of times this event has been handed back for redelivery.
    attempts: u32,

    content: JsonValue,
}

impl Event {
    pub fn new(content: JsonValue) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            timestamp: Utc::now(),
            attempts: 0,
            content,
        }
    }

    pub fn with_id(event_id: Uuid, timestamp: DateTime<Utc>, content: JsonValue) -> Self {
        Self {
            event_id,
            timestamp,
            attempts: 0,
            content,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn content(&self) -> &JsonValue {
        &self.content
    }

    /// Look up a dot-separated path (`"headers.Model"`) in the content.
    ///
    /// Each segment must name a key of a JSON object; arrays are not indexed.
    pub fn get_value(&self, path: &str) -> Option<&JsonValue> {
        path.split('.')
            .try_fold(&self.content, |value, key| value.as_object()?.get(key))
    }

    /// Copy of this event prepared for redelivery.
    pub fn redelivered(&self) -> Self {
        Self {
            attempts: self.attempts.saturating_add(1),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn get_value_walks_nested_objects() {
        let event = Event::new(json!({
            "headers": { "Model": ["Heartbeat"] },
            "data": { "data": "{}" }
        }));

        assert_eq!(event.get_value("headers.Model"), Some(&json!(["Heartbeat"])));
        assert_eq!(event.get_value("data.data"), Some(&json!("{}")));
        assert_eq!(event.get_value("data.missing"), None);
        assert_eq!(event.get_value("headers.Model.0"), None);
    }

    #[test]
    fn get_value_stops_at_non_objects() {
        let event = Event::new(json!({ "headers": "flat" }));
        assert_eq!(event.get_value("headers.Model"), None);
    }

    #[test]
    fn redelivery_keeps_identity_and_bumps_attempts() {
        let event = Event::new(json!({}));
        let again = event.redelivered().redelivered();

        assert_eq!(again.event_id(), event.event_id());
        assert_eq!(again.attempts(), 2);
        assert_eq!(event.attempts(), 0);
    }
}
