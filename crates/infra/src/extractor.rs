//! Record extraction: turns a generic event into a `(schema name, payload)` pair.
//!
//! Routing is read from two fixed paths of the event content:
//!
//! - `headers.Model`: a sequence of strings; the first entry names the schema
//! - `data.data`: the serialized payload, as a string
//!
//! Extraction never touches the store and never logs content.

use serde_json::Value as JsonValue;

use tablebeat_core::ExtractError;
use tablebeat_events::Event;

pub const MODEL_PATH: &str = "headers.Model";
pub const PAYLOAD_PATH: &str = "data.data";

/// The routing data of one event, borrowed from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record<'a> {
    schema_name: &'a str,
    payload: &'a [u8],
    event: &'a Event,
}

impl<'a> Record<'a> {
    pub fn schema_name(&self) -> &'a str {
        self.schema_name
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// The originating event, kept for retry bookkeeping.
    pub fn event(&self) -> &'a Event {
        self.event
    }
}

/// Extract the record carried by `event`.
///
/// Only the first entry of `headers.Model` is used. A `data.data` that is
/// present but not a string counts as missing.
pub fn extract(event: &Event) -> Result<Record<'_>, ExtractError> {
    let schema_name = event
        .get_value(MODEL_PATH)
        .and_then(JsonValue::as_array)
        .and_then(|models| models.first())
        .and_then(JsonValue::as_str)
        .filter(|name| !name.is_empty())
        .ok_or(ExtractError::NoModelName)?;

    let payload = event
        .get_value(PAYLOAD_PATH)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| ExtractError::NoData {
            model: schema_name.to_string(),
        })?;

    Ok(Record {
        schema_name,
        payload: payload.as_bytes(),
        event,
    })
}
