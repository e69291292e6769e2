//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt subscriber writing to stderr. The
//! `RUST_LOG` environment variable overrides the configured level.

use tracing_subscriber::EnvFilter;

use crate::error::{PipelineError, Result};

/// Parse a level name, defaulting to `info` for unknown values
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

/// Install the global subscriber
///
/// Fails instead of panicking when a global subscriber is already set.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(level).as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| PipelineError::Logging(e.to_string()))
}
