//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // JSON logs + timestamps, configurable via RUST_LOG.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Root span for one output instance.
///
/// Handed to the output client at construction; everything the client logs
/// is recorded inside it, so two outputs in one process stay distinguishable.
/// `target` must already be redacted.
pub fn output_span(output: &str, target: &str) -> ::tracing::Span {
    ::tracing::info_span!("output", output = %output, target = %target)
}
