//! `DataSource` over the listings REST API.
//!
//! This adapter owns route construction, request bodies, status mapping, and
//! JSON decoding. Retry and routing decisions belong to the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::dto::{
    CreateReviewRequestDto, LoginRequestDto, RegisterRequestDto, decode_grant, decode_listing,
    decode_listings, decode_review, decode_reviews, error_message,
};
use crate::domain::credential::BearerCredential;
use crate::domain::operation::{Operation, OperationOutput};
use crate::domain::ports::{
    DataSource, DataSourceError, HttpMethod, HttpTransport, TransportError, TransportRequest,
    TransportResponse,
};

/// Base URL of a locally running backend.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/api/v1";

/// Data source backed by the listings HTTP API.
pub struct HttpBackend {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    request_timeout: Duration,
}

struct Call {
    method: HttpMethod,
    segments: Vec<String>,
    body: Option<Value>,
    authenticated: bool,
}

impl Call {
    fn get(segments: &[&str]) -> Self {
        Self {
            method: HttpMethod::Get,
            segments: segments.iter().map(|segment| (*segment).to_owned()).collect(),
            body: None,
            authenticated: false,
        }
    }

    fn post(segments: &[&str], body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            body: Some(body),
            ..Self::get(segments)
        }
    }

    fn delete(segments: &[&str]) -> Self {
        Self {
            method: HttpMethod::Delete,
            ..Self::get(segments)
        }
    }

    fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }
}

fn json_body<T: Serialize>(body: &T) -> Result<Value, DataSourceError> {
    serde_json::to_value(body)
        .map_err(|error| DataSourceError::fault(format!("failed to encode request: {error}")))
}

impl HttpBackend {
    /// Build an adapter rooted at `base_url` (for example
    /// [`DEFAULT_BASE_URL`]).
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: Url,
        request_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            base_url,
            request_timeout,
        }
    }

    /// Endpoint the backend probe targets.
    ///
    /// # Errors
    /// Returns a fault when the base URL cannot carry path segments.
    pub fn listings_url(&self) -> Result<Url, DataSourceError> {
        self.endpoint(&["places".to_owned()])
    }

    fn endpoint(&self, segments: &[String]) -> Result<Url, DataSourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                DataSourceError::fault(format!("base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn route(operation: &Operation) -> Result<Call, DataSourceError> {
        Ok(match operation {
            Operation::ReadListings => Call::get(&["places"]),
            Operation::ReadListing { id } => Call::get(&["places", id.as_ref()]),
            Operation::ReadReviewsForPlace { place_id } => {
                Call::get(&["reviews", "places", place_id.as_ref()])
            }
            Operation::Authenticate(credentials) => Call::post(
                &["auth", "login"],
                json_body(&LoginRequestDto {
                    email: credentials.email(),
                    password: credentials.password(),
                })?,
            ),
            Operation::Register(registration) => Call::post(
                &["users"],
                json_body(&RegisterRequestDto {
                    first_name: registration.first_name(),
                    last_name: registration.last_name(),
                    email: registration.credentials().email(),
                    password: registration.credentials().password(),
                })?,
            ),
            Operation::CreateReview(draft) => Call::post(
                &["reviews"],
                json_body(&CreateReviewRequestDto {
                    text: &draft.text,
                    rating: draft.rating.get(),
                    place_id: draft.place_id.as_ref(),
                })?,
            )
            .authenticated(),
            Operation::DeleteReview { id } => Call::delete(&["reviews", id.as_ref()]).authenticated(),
            Operation::DeleteListing { id } => Call::delete(&["places", id.as_ref()]).authenticated(),
        })
    }

    fn decode(operation: &Operation, body: &[u8]) -> Result<OperationOutput, DataSourceError> {
        if matches!(
            operation,
            Operation::DeleteReview { .. } | Operation::DeleteListing { .. }
        ) {
            return Ok(OperationOutput::Deleted);
        }
        let body: Value = serde_json::from_slice(body).map_err(|error| {
            DataSourceError::fault(format!(
                "{} returned a body that is not JSON: {error}",
                operation.name()
            ))
        })?;
        let decoded = match operation {
            Operation::ReadListings => decode_listings(body).map(OperationOutput::Listings),
            Operation::ReadListing { .. } => decode_listing(body).map(OperationOutput::Listing),
            Operation::ReadReviewsForPlace { place_id } => {
                decode_reviews(body, place_id).map(OperationOutput::Reviews)
            }
            Operation::Authenticate(_) | Operation::Register(_) => {
                decode_grant(body).map(OperationOutput::Authenticated)
            }
            Operation::CreateReview(draft) => {
                decode_review(body, &draft.place_id).map(OperationOutput::ReviewCreated)
            }
            Operation::DeleteReview { .. } | Operation::DeleteListing { .. } => {
                Ok(OperationOutput::Deleted)
            }
        };
        decoded.map_err(|reason| {
            DataSourceError::fault(format!("cannot interpret {}: {reason}", operation.name()))
        })
    }
}

fn map_transport_error(error: TransportError) -> DataSourceError {
    match error {
        TransportError::Timeout { message } => DataSourceError::timeout(message),
        TransportError::Connect { message } | TransportError::Aborted { message } => {
            DataSourceError::network(message)
        }
        TransportError::InvalidRequest { message } => DataSourceError::fault(message),
    }
}

fn map_status_error(response: &TransportResponse) -> DataSourceError {
    let message = error_message(&response.body)
        .or_else(|| {
            let text = response.status_text.trim();
            (!text.is_empty()).then(|| text.to_owned())
        })
        .unwrap_or_else(|| format!("HTTP {}", response.status));
    DataSourceError::rejected(response.status, message)
}

#[async_trait]
impl DataSource for HttpBackend {
    async fn execute(
        &self,
        operation: &Operation,
        bearer: Option<BearerCredential>,
    ) -> Result<OperationOutput, DataSourceError> {
        let call = Self::route(operation)?;
        let request = TransportRequest {
            method: call.method,
            url: self.endpoint(&call.segments)?,
            bearer: if call.authenticated { bearer } else { None },
            body: call.body,
            timeout: self.request_timeout,
        };
        debug!(
            operation = operation.name(),
            method = request.method.as_str(),
            url = %request.url,
            "sending backend request"
        );

        let response = self
            .transport
            .send(request)
            .await
            .map_err(map_transport_error)?;
        if !response.is_success() {
            return Err(map_status_error(&response));
        }
        Self::decode(operation, &response.body)
    }
}
