//! Name → schema registry, built once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::schema::{Model, Schema, TypedSchema};

/// Maximum identifier length accepted by the store.
const MAX_IDENTIFIER_LEN: usize = 64;

/// Resolves a schema name to exactly one descriptor, or fails with `NotFound`.
///
/// Lookups are exact (case-sensitive, no prefix matching).
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    schemas: HashMap<String, Arc<dyn Schema>>,
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Schema>, RegistryError> {
        self.schemas
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Collects schemas and validates them as a set.
#[derive(Debug, Default)]
pub struct ModelRegistryBuilder {
    schemas: Vec<Arc<dyn Schema>>,
}

impl ModelRegistryBuilder {
    pub fn register<M: Model>(self) -> Self {
        self.register_schema(Arc::new(TypedSchema::<M>::new()))
    }

    pub fn register_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn build(self) -> Result<ModelRegistry, RegistryError> {
        let mut schemas: HashMap<String, Arc<dyn Schema>> = HashMap::new();

        for schema in self.schemas {
            validate_schema(schema.as_ref())?;

            let name = schema.name().to_string();
            if schemas.contains_key(&name) {
                return Err(RegistryError::Duplicate(name));
            }
            schemas.insert(name, schema);
        }

        Ok(ModelRegistry { schemas })
    }
}

fn validate_schema(schema: &dyn Schema) -> Result<(), RegistryError> {
    let model = schema.name();
    let invalid = |identifier: &str| RegistryError::InvalidIdentifier {
        model: model.to_string(),
        identifier: identifier.to_string(),
    };

    if model.is_empty() {
        return Err(invalid(model));
    }
    if !is_identifier(schema.table_name()) {
        return Err(invalid(schema.table_name()));
    }
    for column in schema.columns() {
        if !is_identifier(column.name) {
            return Err(invalid(column.name));
        }
    }

    let key = schema.natural_key();
    if key.is_empty() {
        return Err(RegistryError::InvalidKey {
            model: model.to_string(),
            reason: "natural key is empty".to_string(),
        });
    }
    for name in key {
        match schema.columns().iter().find(|c| c.name == *name) {
            None => {
                return Err(RegistryError::InvalidKey {
                    model: model.to_string(),
                    reason: format!("{name} is not a column"),
                });
            }
            Some(c) if c.nullable => {
                return Err(RegistryError::InvalidKey {
                    model: model.to_string(),
                    reason: format!("{name} is nullable"),
                });
            }
            Some(c) if c.sql_type == crate::value::SqlType::Text => {
                return Err(RegistryError::InvalidKey {
                    model: model.to_string(),
                    reason: format!("{name} is unbounded text"),
                });
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// `[A-Za-z_][A-Za-z0-9_]*`, at most 64 characters.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    s.len() <= MAX_IDENTIFIER_LEN && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
