//! `tablebeat-core`: schema dispatch building blocks.
//!
//! This crate contains **pure** primitives (no IO): destination schemas,
//! decoded rows, the name-keyed registry and the error model.

pub mod error;
pub mod registry;
pub mod schema;
pub mod value;

pub use error::{ConnectError, DecodeError, ExtractError, PersistError, RegistryError, StoreError};
pub use registry::{ModelRegistry, ModelRegistryBuilder};
pub use schema::{Model, Schema, TypedSchema};
pub use value::{Column, Row, SqlType, SqlValue};
