//! Driven port for issuing HTTP requests.
//!
//! The domain owns the request and response shapes so the backend adapter
//! and the probe stay independent of the HTTP client library.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::define_port_error;
use crate::domain::credential::BearerCredential;

/// HTTP verbs used by the listings API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Upper-case verb.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// Domain-owned request passed to the transport adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Verb.
    pub method: HttpMethod,
    /// Absolute target URL.
    pub url: Url,
    /// Bearer credential for the `Authorization` header.
    pub bearer: Option<BearerCredential>,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
    /// Hard per-request timeout.
    pub timeout: Duration,
}

impl TransportRequest {
    /// `GET url` with no credential or body.
    pub fn get(url: Url, timeout: Duration) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            bearer: None,
            body: None,
            timeout,
        }
    }
}

/// Raw response returned by the transport adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for the status, possibly empty.
    pub status_text: String,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Whether the status is in `200..300`.
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

define_port_error! {
    /// Errors surfaced while sending a request.
    pub enum TransportError {
        /// Connection could not be established or was reset.
        Connect { message: String } =>
            "transport connection failed: {message}",
        /// The request exceeded its timeout.
        Timeout { message: String } =>
            "transport timed out: {message}",
        /// The exchange was cut off before a response arrived.
        Aborted { message: String } =>
            "transport aborted: {message}",
        /// The adapter could not build the request.
        InvalidRequest { message: String } =>
            "transport request invalid: {message}",
    }
}

impl TransportError {
    /// Whether the failure happened at the network level.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Timeout { .. } | Self::Aborted { .. }
        )
    }
}

/// Port for sending one HTTP request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return the raw response.
    ///
    /// Non-2xx statuses are responses, not errors.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
