//! Built-in destination schemas.
//!
//! Each model is a plain serde struct implementing [`tablebeat_core::Model`].
//! The set is closed: an event naming anything else fails with
//! `ModelNotFound` at persist time.

pub mod audit_entry;
pub mod heartbeat;
pub mod host_metric;

pub use audit_entry::AuditEntry;
pub use heartbeat::{Heartbeat, HeartbeatStatus};
pub use host_metric::HostMetric;

use tablebeat_core::{ModelRegistry, RegistryError};

/// Registry containing every built-in model.
pub fn default_registry() -> Result<ModelRegistry, RegistryError> {
    ModelRegistry::builder()
        .register::<Heartbeat>()
        .register::<HostMetric>()
        .register::<AuditEntry>()
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_contains_builtin_models() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.names(), vec!["AuditEntry", "Heartbeat", "HostMetric"]);
        assert_eq!(registry.resolve("HostMetric").unwrap().table_name(), "host_metrics");
    }
}
