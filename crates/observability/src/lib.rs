//! Tracing/logging setup shared by binaries and tests that embed sourcefold.

/// Initialize process-wide tracing from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops and return `false`.
pub fn init() -> bool {
    tracing::init(&tracing::ObservabilityConfig::from_env())
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{LogFormat, ObservabilityConfig};
