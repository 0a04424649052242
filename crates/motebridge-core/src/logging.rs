//! Tracing subscriber setup
//!
//! The library runs inside a JVM that owns stdout, so events go to stderr.

use tracing_subscriber::EnvFilter;

/// Environment variable read for the filter directive
pub const LOG_ENV: &str = "MOTEBRIDGE_LOG";

/// Filter used when neither the environment nor the config sets one
pub const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber once; later calls are ignored
///
/// Returns true if this call installed it.
pub fn init_logging(config_filter: Option<&str>) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or(DEFAULT_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}
