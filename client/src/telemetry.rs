//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events. Host applications that do not
//! install their own subscriber can call [`init_tracing`] once at start-up.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt};

/// The global subscriber could not be installed.
#[derive(Debug, Error)]
#[error("tracing init failed: {message}")]
pub struct TelemetryError {
    message: String,
}

/// Install a JSON formatter filtered by `RUST_LOG`.
///
/// # Errors
/// Returns [`TelemetryError`] when a global subscriber is already set.
pub fn init_tracing() -> Result<(), TelemetryError> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
        .map_err(|error| TelemetryError {
            message: error.to_string(),
        })
}
