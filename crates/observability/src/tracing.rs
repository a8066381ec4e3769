//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize structured JSON logging for the process.
///
/// Filtering is driven by `RUST_LOG`; without it, `info` and above. Safe to
/// call more than once (later calls are no-ops), which keeps test binaries
/// that race on setup harmless.
pub fn init() {
    init_with_default_directives("info");
}

/// Like [`init`] but with explicit fallback directives for when `RUST_LOG`
/// is unset, e.g. `"info,entrylog_infra=debug"`.
pub fn init_with_default_directives(directives: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
