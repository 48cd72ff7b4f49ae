//! Logging setup shared by every binary

use tracing_subscriber::EnvFilter;

/// Fallback filter variable when `RUST_LOG` is unset
pub const LOG_VAR: &str = "SWITCHYARD_LOG";

/// Install the global subscriber. Logs go to stderr; producers own stdout.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(std::env::var(LOG_VAR).unwrap_or_else(|_| "info".into())))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}
