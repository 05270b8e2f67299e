//! Error model for extraction, decoding, persistence and connection.
//!
//! Each failure class carries its own enum so callers can decide, per event,
//! whether a failure is permanent or worth handing back for redelivery.

use thiserror::Error;

/// Failure to turn a generic event into a `(schema name, payload)` pair.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// `headers.Model` is absent, empty, or not a sequence of strings.
    #[error("no model name could be selected")]
    NoModelName,

    /// `data.data` is absent. The model name is already known.
    #[error("no data was found (model={model})")]
    NoData { model: String },
}

impl ExtractError {
    /// Schema name the event was addressed to, when it could be read.
    pub fn model(&self) -> Option<&str> {
        match self {
            ExtractError::NoModelName => None,
            ExtractError::NoData { model } => Some(model),
        }
    }
}

/// A payload could not be decoded into an instance of its schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is not a valid {model}: {reason}")]
    Payload { model: String, reason: String },

    #[error("{model}.{column} is required but was null")]
    MissingValue { model: String, column: String },

    #[error("{model}.{column} expects {expected}, got {found}")]
    TypeMismatch {
        model: String,
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{model} produced {found} values for {expected} columns")]
    ColumnCount {
        model: String,
        expected: usize,
        found: usize,
    },
}

/// Store-level failure during schema creation or a row write.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The connection itself is gone; later writes on it will fail too.
    #[error("connection lost during {operation}: {message}")]
    ConnectionLost { operation: String, message: String },

    /// The server rejected a statement.
    #[error("query failed during {operation}: {message}")]
    Query {
        operation: String,
        code: Option<String>,
        message: String,
    },
}

impl StoreError {
    pub fn connection_lost(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionLost {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn query(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            operation: operation.into(),
            code: None,
            message: message.into(),
        }
    }
}

/// Failure to persist one record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistError {
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl PersistError {
    /// Only store failures may go away on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PersistError::Store(_))
    }

    pub fn is_connection_lost(&self) -> bool {
        matches!(self, PersistError::Store(StoreError::ConnectionLost { .. }))
    }
}

/// Failure to open the store connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("invalid connection target: {0}")]
    InvalidTarget(String),

    #[error("connection refused: {0}")]
    Refused(String),

    /// The client was closed; it cannot be reconnected.
    #[error("client is closed")]
    Closed,
}

/// Model registry construction or lookup failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("model not found: {0}")]
    NotFound(String),

    #[error("model registered twice: {0}")]
    Duplicate(String),

    #[error("model {model} uses an invalid identifier: {identifier:?}")]
    InvalidIdentifier { model: String, identifier: String },

    #[error("model {model} has an invalid natural key: {reason}")]
    InvalidKey { model: String, reason: String },
}
