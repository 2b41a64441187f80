//! Unified request dispatch.
//!
//! The dispatcher owns the authentication precheck, data source selection
//! through the cached [`BackendProbe`] decision, bounded retry of
//! network-level failures, one-shot fallback to the simulation when the
//! backend faults, and session bookkeeping for auth outcomes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::SharedClock;
use super::auth::{LoginCredentials, Registration};
use super::backend_probe::{BackendProbe, SourceDecision};
use super::credential::BearerCredential;
use super::error::{OperationFailure, OperationResult};
use super::ids::{ListingId, ReviewId};
use super::listing::Listing;
use super::operation::{DispatchOptions, Operation, OperationOutput};
use super::ports::{DataSource, DataSourceError};
use super::review::{Review, ReviewDraft};
use super::session::Session;
use super::session_store::SessionStore;

mod mapping;

/// Retry and timeout configuration for dispatched operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Attempts per operation, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single retry delay.
    pub max_backoff: Duration,
    /// Hard bound on each attempt.
    pub request_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(8),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Async sleeping abstraction for retry delays.
#[async_trait]
pub trait RetrySleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl RetrySleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// The two data sources an operation can be routed to.
pub struct DispatcherPorts {
    /// HTTP backend adapter.
    pub backend: Arc<dyn DataSource>,
    /// In-memory simulation.
    pub simulation: Arc<dyn DataSource>,
}

/// Routes operations to the backend or the simulation.
pub struct RequestDispatcher {
    backend: Arc<dyn DataSource>,
    simulation: Arc<dyn DataSource>,
    probe: Arc<BackendProbe>,
    sessions: Arc<SessionStore>,
    clock: SharedClock,
    sleeper: Arc<dyn RetrySleeper>,
    config: DispatcherConfig,
}

impl RequestDispatcher {
    /// Build a dispatcher over the given ports and shared state.
    pub fn new(
        ports: DispatcherPorts,
        probe: Arc<BackendProbe>,
        sessions: Arc<SessionStore>,
        clock: SharedClock,
        sleeper: Arc<dyn RetrySleeper>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            backend: ports.backend,
            simulation: ports.simulation,
            probe,
            sessions,
            clock,
            sleeper,
            config,
        }
    }

    /// Session store the dispatcher reads credentials from.
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Probe deciding where operations are routed.
    pub fn probe(&self) -> &Arc<BackendProbe> {
        &self.probe
    }

    /// Execute `operation`.
    ///
    /// With `options.requires_auth` and no active session the call fails as
    /// `unauthenticated` before any transport activity.
    pub async fn execute(
        &self,
        operation: Operation,
        options: DispatchOptions,
    ) -> OperationResult<OperationOutput> {
        let bearer = self
            .sessions
            .get()
            .map(|session| session.credential().clone());
        if options.requires_auth && bearer.is_none() {
            debug!(operation = operation.name(), "rejected: no active session");
            return Err(OperationFailure::unauthenticated(
                "sign in to perform this action",
            ));
        }

        let decision = self.probe.decision().await;
        let source = match decision {
            SourceDecision::Backend => &self.backend,
            SourceDecision::Simulation => &self.simulation,
        };
        debug!(operation = operation.name(), source = ?decision, "dispatching");

        let mut outcome = self.run_with_retry(source, &operation, &bearer).await;
        let mut fell_back = false;
        if decision.is_backend() && matches!(outcome, Err((DataSourceError::Fault { .. }, _))) {
            warn!(
                operation = operation.name(),
                "backend fault; serving this operation from the simulation"
            );
            outcome = self
                .run_with_retry(&self.simulation, &operation, &bearer)
                .await;
            fell_back = true;
        }

        match outcome {
            Ok(output) => {
                self.record_success(&output);
                Ok(output)
            }
            Err((error, attempts)) => {
                let failure = mapping::map_source_error(error, attempts);
                // The simulation cannot vouch for backend-issued credentials.
                if failure.invalidates_session() && !fell_back {
                    warn!(
                        operation = operation.name(),
                        status = failure.status(),
                        "credential rejected; clearing session"
                    );
                    self.sessions.clear();
                }
                Err(failure)
            }
        }
    }

    async fn run_with_retry(
        &self,
        source: &Arc<dyn DataSource>,
        operation: &Operation,
        bearer: &Option<BearerCredential>,
    ) -> Result<OperationOutput, (DataSourceError, u32)> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let call = source.execute(operation, bearer.clone());
            let result = match tokio::time::timeout(self.config.request_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(DataSourceError::timeout(format!(
                    "no response within {} ms",
                    self.config.request_timeout.as_millis()
                ))),
            };
            match result {
                Ok(output) => return Ok(output),
                Err(error) if error.is_network() && attempt < max_attempts => {
                    let delay = self.retry_base_delay(attempt);
                    debug!(
                        operation = operation.name(),
                        attempt,
                        delay_ms = %delay.as_millis(),
                        kind = error.label(),
                        "retrying after network failure"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err((error, attempt)),
            }
        }
    }

    fn retry_base_delay(&self, attempt: u32) -> Duration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        let base_ms = u64::try_from(self.config.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.config.max_backoff.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
    }

    fn record_success(&self, output: &OperationOutput) {
        if let OperationOutput::Authenticated(grant) = output {
            let session = Session::from_grant(grant.clone(), self.clock.utc());
            debug!(role = ?session.role(), "session established");
            self.sessions.set(session);
        }
    }

    async fn execute_default(&self, operation: Operation) -> OperationResult<OperationOutput> {
        let options = DispatchOptions::for_operation(&operation);
        self.execute(operation, options).await
    }

    /// Fetch every listing.
    pub async fn read_listings(&self) -> OperationResult<Vec<Listing>> {
        match self.execute_default(Operation::ReadListings).await? {
            OperationOutput::Listings(listings) => Ok(listings),
            other => Err(mapping::unexpected_output("read-listings", &other)),
        }
    }

    /// Fetch one listing.
    pub async fn read_listing(&self, id: ListingId) -> OperationResult<Listing> {
        match self.execute_default(Operation::ReadListing { id }).await? {
            OperationOutput::Listing(listing) => Ok(listing),
            other => Err(mapping::unexpected_output("read-listing-detail", &other)),
        }
    }

    /// Fetch the reviews of one listing.
    pub async fn read_reviews_for_place(&self, place_id: ListingId) -> OperationResult<Vec<Review>> {
        match self
            .execute_default(Operation::ReadReviewsForPlace { place_id })
            .await?
        {
            OperationOutput::Reviews(reviews) => Ok(reviews),
            other => Err(mapping::unexpected_output("read-reviews-for-place", &other)),
        }
    }

    /// Sign in, installing the resulting session.
    pub async fn authenticate(&self, credentials: LoginCredentials) -> OperationResult<Session> {
        let output = self
            .execute_default(Operation::Authenticate(credentials))
            .await?;
        self.session_from(output, "authenticate")
    }

    /// Register and sign in, installing the resulting session.
    pub async fn register(&self, registration: Registration) -> OperationResult<Session> {
        let output = self
            .execute_default(Operation::Register(registration))
            .await?;
        self.session_from(output, "register")
    }

    fn session_from(&self, output: OperationOutput, operation: &str) -> OperationResult<Session> {
        match output {
            OperationOutput::Authenticated(_) => self.sessions.get().ok_or_else(|| {
                OperationFailure::unauthenticated("issued credential is already expired")
            }),
            other => Err(mapping::unexpected_output(operation, &other)),
        }
    }

    /// Post a validated review.
    pub async fn create_review(&self, draft: ReviewDraft) -> OperationResult<Review> {
        match self.execute_default(Operation::CreateReview(draft)).await? {
            OperationOutput::ReviewCreated(review) => Ok(review),
            other => Err(mapping::unexpected_output("create-review", &other)),
        }
    }

    /// Delete a review.
    pub async fn delete_review(&self, id: ReviewId) -> OperationResult<()> {
        match self.execute_default(Operation::DeleteReview { id }).await? {
            OperationOutput::Deleted => Ok(()),
            other => Err(mapping::unexpected_output("delete-review", &other)),
        }
    }

    /// Delete a listing.
    pub async fn delete_listing(&self, id: ListingId) -> OperationResult<()> {
        match self.execute_default(Operation::DeleteListing { id }).await? {
            OperationOutput::Deleted => Ok(()),
            other => Err(mapping::unexpected_output("delete-listing", &other)),
        }
    }
}

#[cfg(test)]
mod tests;
