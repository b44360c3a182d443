//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber for the host process.
///
/// Log level comes from `RUST_LOG` when set, otherwise the provided
/// default. Output goes to stderr. Safe to call more than once; later
/// calls are no-ops.
///
/// # Example
///
/// ```ignore
/// init_logging("info");
/// tracing::info!("Runtime started");
/// ```
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
