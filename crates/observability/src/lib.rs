//! Tracing and logging (shared setup).

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

pub use tracing::output_span;

/// Tracing configuration (filters, layers, per-output spans).
pub mod tracing;
