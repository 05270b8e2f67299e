//! Column, value and row types shared by schemas and stores.

use chrono::{DateTime, Utc};

use crate::error::DecodeError;

/// Storage type of a column.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SqlType {
    BigInt,
    Double,
    Bool,
    /// Bounded string; usable in a key.
    Varchar(u16),
    /// Unbounded string; never part of a key.
    Text,
    Timestamp,
}

impl SqlType {
    pub fn name(&self) -> &'static str {
        match self {
            SqlType::BigInt => "bigint",
            SqlType::Double => "double",
            SqlType::Bool => "bool",
            SqlType::Varchar(_) => "varchar",
            SqlType::Text => "text",
            SqlType::Timestamp => "timestamp",
        }
    }

    fn accepts(&self, value: &SqlValue) -> bool {
        matches!(
            (self, value),
            (_, SqlValue::Null)
                | (SqlType::BigInt, SqlValue::Int(_))
                | (SqlType::Double, SqlValue::Float(_))
                | (SqlType::Double, SqlValue::Int(_))
                | (SqlType::Bool, SqlValue::Bool(_))
                | (SqlType::Varchar(_), SqlValue::Text(_))
                | (SqlType::Text, SqlValue::Text(_))
                | (SqlType::Timestamp, SqlValue::Timestamp(_))
        )
    }
}

/// One column of a destination table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub nullable: bool,
}

impl Column {
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: false,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Int(_) => "bigint",
            SqlValue::Float(_) => "double",
            SqlValue::Bool(_) => "bool",
            SqlValue::Text(_) => "text",
            SqlValue::Timestamp(_) => "timestamp",
        }
    }

    /// Stable textual form, used to build natural-key identities.
    pub fn key_fragment(&self) -> String {
        match self {
            SqlValue::Null => "\u{0}".to_string(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Float(v) => v.to_string(),
            SqlValue::Bool(v) => v.to_string(),
            SqlValue::Text(v) => v.clone(),
            SqlValue::Timestamp(v) => v.to_rfc3339(),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// A decoded instance of a schema, ready to be upserted.
///
/// Construction checks the values against the column list, so a `Row` that
/// exists always matches its table shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    table: String,
    columns: Vec<Column>,
    natural_key: Vec<&'static str>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(
        model: &str,
        table: impl Into<String>,
        columns: &[Column],
        natural_key: &[&'static str],
        values: Vec<SqlValue>,
    ) -> Result<Self, DecodeError> {
        if values.len() != columns.len() {
            return Err(DecodeError::ColumnCount {
                model: model.to_string(),
                expected: columns.len(),
                found: values.len(),
            });
        }

        for (column, value) in columns.iter().zip(&values) {
            if matches!(value, SqlValue::Null) && !column.nullable {
                return Err(DecodeError::MissingValue {
                    model: model.to_string(),
                    column: column.name.to_string(),
                });
            }
            if !column.sql_type.accepts(value) {
                return Err(DecodeError::TypeMismatch {
                    model: model.to_string(),
                    column: column.name.to_string(),
                    expected: column.sql_type.name(),
                    found: value.kind(),
                });
            }
        }

        Ok(Self {
            table: table.into(),
            columns: columns.to_vec(),
            natural_key: natural_key.to_vec(),
            values,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn natural_key(&self) -> &[&'static str] {
        &self.natural_key
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .map(|idx| &self.values[idx])
    }

    /// Values of the natural-key columns, in key order.
    pub fn key_values(&self) -> Vec<&SqlValue> {
        self.natural_key
            .iter()
            .filter_map(|name| self.get(name))
            .collect()
    }

    /// Cells that are not part of the natural key (the upsert update set).
    pub fn non_key_cells(&self) -> impl Iterator<Item = (&Column, &SqlValue)> {
        self.columns
            .iter()
            .zip(&self.values)
            .filter(|(c, _)| !self.natural_key.contains(&c.name))
    }
}
