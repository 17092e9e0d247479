//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Default filter: the costing crates at debug, everything else at info.
/// Overridable via `RUST_LOG`.
const DEFAULT_FILTER: &str = "info,stocktally_ledger=debug,stocktally_posting=debug";

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // JSON logs + timestamps, configurable via RUST_LOG.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
