//! Tracing subscriber setup for binaries, tests and benches embedding the engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Install a fmt subscriber filtered at `level`.
///
/// `RUST_LOG` takes precedence over `level` when set. Returns
/// [`LoggingError::AlreadyInstalled`] if a global subscriber exists, which
/// callers that may initialise more than once (tests) can ignore.
pub fn init_tracing(level: &str) -> Result<(), LoggingError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidFilter {
            filter: level.to_string(),
            reason: e.to_string(),
        })?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)
}
