//! Telemetry helpers for structured logging.

/// Install a default tracing subscriber if the host application has not
/// set one. Filtering follows `RUST_LOG`, falling back to `info`.
/// Idempotent; safe to call from tests and demos.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
