//! Client configuration loaded via OrthoConfig.
//!
//! Every field is optional; accessors apply the defaults. Environment
//! variables use the `LISTINGS_CLIENT_` prefix, for example
//! `LISTINGS_CLIENT_BASE_URL` or `LISTINGS_CLIENT_PROBE_TIMEOUT_MS`.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::dispatcher::DispatcherConfig;
use crate::domain::validation::SecretPolicy;
use crate::outbound::backend::DEFAULT_BASE_URL;

const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1_000;
const DEFAULT_SECRET_MIN_LENGTH: usize = 3;

/// Configuration values for [`ListingsClient`](crate::ListingsClient).
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LISTINGS_CLIENT")]
pub struct ClientSettings {
    /// Root of the listings API, e.g. `http://127.0.0.1:5000/api/v1`.
    pub base_url: Option<String>,
    /// Backend probe timeout in milliseconds.
    pub probe_timeout_ms: Option<u64>,
    /// Per-attempt request timeout in milliseconds.
    pub request_timeout_ms: Option<u64>,
    /// Attempts per operation for network-level failures.
    pub max_attempts: Option<u32>,
    /// First retry delay in milliseconds; doubles per retry.
    pub initial_backoff_ms: Option<u64>,
    /// Minimum password length accepted by the validator.
    pub secret_min_length: Option<usize>,
    /// Directory for durable slots; memory storage when absent.
    pub storage_dir: Option<PathBuf>,
}

impl ClientSettings {
    /// Parsed base URL, falling back to the local development server.
    ///
    /// # Errors
    /// Returns the parse error for a malformed configured value.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))
    }

    /// Backend probe timeout.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms.unwrap_or(DEFAULT_PROBE_TIMEOUT_MS))
    }

    /// Per-attempt request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(
            self.request_timeout_ms
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        )
    }

    /// Attempts per operation; never below one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).max(1)
    }

    /// First retry delay.
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(
            self.initial_backoff_ms
                .unwrap_or(DEFAULT_INITIAL_BACKOFF_MS),
        )
    }

    /// Password policy derived from `secret_min_length`.
    pub fn secret_policy(&self) -> SecretPolicy {
        SecretPolicy::with_min_length(
            self.secret_min_length
                .unwrap_or(DEFAULT_SECRET_MIN_LENGTH),
        )
    }

    /// Retry and timeout settings for the dispatcher.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_attempts: self.max_attempts(),
            initial_backoff: self.initial_backoff(),
            request_timeout: self.request_timeout(),
            ..DispatcherConfig::default()
        }
    }
}
