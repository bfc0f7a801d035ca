//! Telemetry helpers for pool diagnostics.

/// Initialize tracing for pool diagnostics. Users can install their own
/// subscriber; this helper installs an env-filtered fmt subscriber if none is
/// set, defaulting to `taskpool=info` when `RUST_LOG` is unset. Thread names
/// are included in the output because every pool thread is named
/// (`taskpool-worker-{index}`, `taskpool-dispatcher`, `taskpool-autoscaler`),
/// which is usually the fastest way to attribute a log line to a roster slot.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("taskpool=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
