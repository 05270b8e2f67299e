//! Destination schema capability interface.
//!
//! A destination shape is described twice:
//!
//! - [`Model`]: the static, typed description implemented by a concrete
//!   serde struct (one per table).
//! - [`Schema`]: the object-safe view used for name-keyed dispatch at runtime.
//!
//! [`TypedSchema`] bridges the two, so the registry can hold a closed set of
//! heterogeneous models behind `Arc<dyn Schema>`.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::error::DecodeError;
use crate::value::{Column, Row, SqlValue};

/// A typed destination shape.
pub trait Model: DeserializeOwned + Send + Sync + 'static {
    /// Name events use in `headers.Model` to address this shape.
    const NAME: &'static str;

    /// Destination table.
    const TABLE: &'static str;

    fn columns() -> &'static [Column];

    /// Columns that identify a row; the upsert conflict target.
    fn natural_key() -> &'static [&'static str];

    /// Cell values in `columns()` order.
    fn into_values(self) -> Vec<SqlValue>;
}

/// Runtime view of a destination shape.
pub trait Schema: Send + Sync + core::fmt::Debug {
    fn name(&self) -> &str;

    fn table_name(&self) -> &str;

    fn columns(&self) -> &[Column];

    fn natural_key(&self) -> &[&'static str];

    /// Decode a structured (JSON) payload into a row of this schema.
    fn decode(&self, payload: &[u8]) -> Result<Row, DecodeError>;
}

/// [`Schema`] implementation for any [`Model`].
pub struct TypedSchema<M> {
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> TypedSchema<M> {
    pub fn new() -> Self {
        Self {
            _model: PhantomData,
        }
    }
}

impl<M: Model> Default for TypedSchema<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> core::fmt::Debug for TypedSchema<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypedSchema")
            .field("name", &M::NAME)
            .field("table", &M::TABLE)
            .finish()
    }
}

impl<M: Model> Schema for TypedSchema<M> {
    fn name(&self) -> &str {
        M::NAME
    }

    fn table_name(&self) -> &str {
        M::TABLE
    }

    fn columns(&self) -> &[Column] {
        M::columns()
    }

    fn natural_key(&self) -> &[&'static str] {
        M::natural_key()
    }

    fn decode(&self, payload: &[u8]) -> Result<Row, DecodeError> {
        let instance: M = serde_json::from_slice(payload).map_err(|e| DecodeError::Payload {
            model: M::NAME.to_string(),
            reason: e.to_string(),
        })?;

        Row::new(
            M::NAME,
            M::TABLE,
            M::columns(),
            M::natural_key(),
            instance.into_values(),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::value::SqlType;

    #[derive(Debug, Deserialize)]
    struct Probe {
        id: String,
        hits: i64,
    }

    impl Model for Probe {
        const NAME: &'static str = "Probe";
        const TABLE: &'static str = "probes";

        fn columns() -> &'static [Column] {
            const COLUMNS: &[Column] = &[
                Column::new("id", SqlType::Varchar(64)),
                Column::new("hits", SqlType::BigInt),
            ];
            COLUMNS
        }

        fn natural_key() -> &'static [&'static str] {
            &["id"]
        }

        fn into_values(self) -> Vec<SqlValue> {
            vec![self.id.into(), self.hits.into()]
        }
    }

    #[test]
    fn decodes_json_into_row() {
        let schema = TypedSchema::<Probe>::new();
        let row = schema.decode(br#"{"id":"p-1","hits":7}"#).unwrap();

        assert_eq!(row.table(), "probes");
        assert_eq!(row.get("hits"), Some(&SqlValue::Int(7)));
        assert_eq!(schema.name(), "Probe");
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let schema = TypedSchema::<Probe>::new();

        let err = schema.decode(b"{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Payload { ref model, .. } if model == "Probe"));

        let err = schema.decode(br#"{"id":"p-1"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Payload { .. }));
    }
}
