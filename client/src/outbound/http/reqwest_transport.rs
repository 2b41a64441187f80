//! Reqwest-backed transport adapter.
//!
//! This adapter owns transport details only: header and body serialisation,
//! per-request timeouts, and error mapping. Non-2xx statuses are returned as
//! responses for the backend adapter to interpret.

use async_trait::async_trait;
use reqwest::{Client, Method, header};

use crate::domain::ports::{
    HttpMethod, HttpTransport, TransportError, TransportRequest, TransportResponse,
};

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("listings-client/", env!("CARGO_PKG_VERSION"));

/// Transport that sends requests with a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with the default user agent.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(DEFAULT_USER_AGENT).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let TransportRequest {
            method: verb,
            url,
            bearer,
            body,
            timeout,
        } = request;

        let mut builder = self
            .client
            .request(method(verb), url)
            .timeout(timeout)
            .header(header::ACCEPT, "application/json");
        if let Some(bearer) = bearer {
            builder = builder.bearer_auth(bearer.as_str());
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            body: body.to_vec(),
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::timeout(error.to_string())
    } else if error.is_builder() {
        TransportError::invalid_request(error.to_string())
    } else if error.is_connect() {
        TransportError::connect(error.to_string())
    } else {
        TransportError::aborted(error.to_string())
    }
}
