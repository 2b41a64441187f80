//! Façade presentation code talks to.
//!
//! [`ListingsClient`] wires the domain services to concrete adapters and
//! exposes one call per user-facing action. Credential and delete checks run
//! locally before anything is dispatched; every result is an
//! [`OperationResult`].

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mockable::DefaultClock;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ClientSettings;
use crate::domain::SharedClock;
use crate::domain::auth::{LoginCredentials, Registration};
use crate::domain::backend_probe::{BackendProbe, SourceDecision};
use crate::domain::dispatcher::{
    DispatcherPorts, RequestDispatcher, RetrySleeper, TokioSleeper,
};
use crate::domain::error::{ErrorKind, OperationFailure, OperationResult};
use crate::domain::ids::{ListingId, ReviewId};
use crate::domain::listing::{Listing, ListingFilter};
use crate::domain::listing_cache::ListingCache;
use crate::domain::permission::PermissionGate;
use crate::domain::ports::{DataSourceError, HttpTransport, SlotStorage};
use crate::domain::review::Review;
use crate::domain::session::{Role, Session};
use crate::domain::session_store::SessionStore;
use crate::domain::submission::SubmissionPipeline;
use crate::domain::validation::{
    SecretPolicy, ValidationResult, validate_credential_email, validate_credential_secret,
    validate_registration,
};
use crate::outbound::backend::HttpBackend;
use crate::outbound::http::ReqwestTransport;
use crate::outbound::simulation::SimulationStore;
use crate::outbound::storage::{CapFsSlotStorage, MemorySlotStorage};

/// Errors raised while assembling a [`ListingsClient`].
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// The configured base URL does not parse.
    #[error("invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
    /// The base URL cannot carry API paths.
    #[error("unusable base URL: {0}")]
    Endpoint(#[from] DataSourceError),
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    /// The storage directory could not be opened.
    #[error("failed to open storage directory {path}: {source}")]
    Storage {
        /// Configured directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Infrastructure the client is assembled from.
#[derive(Clone)]
pub struct ClientPorts {
    /// HTTP transport shared by the probe and the backend adapter.
    pub transport: Arc<dyn HttpTransport>,
    /// Durable storage for the session and the listings cache.
    pub storage: Arc<dyn SlotStorage>,
    /// Time source for session expiry and review timestamps.
    pub clock: SharedClock,
    /// Delay implementation for retry backoff.
    pub sleeper: Arc<dyn RetrySleeper>,
}

/// Single entry point for listings, reviews, and the signed-in session.
pub struct ListingsClient {
    dispatcher: Arc<RequestDispatcher>,
    cache: Arc<ListingCache>,
    gate: PermissionGate,
    submissions: SubmissionPipeline,
    secret_policy: SecretPolicy,
    probe_timeout: Duration,
}

fn rejected(result: ValidationResult) -> OperationResult<()> {
    if result.is_accepted() {
        Ok(())
    } else {
        Err(OperationFailure::validation(result.into_violations()))
    }
}

fn forbidden(result: ValidationResult) -> OperationResult<()> {
    if result.is_accepted() {
        Ok(())
    } else {
        Err(OperationFailure::permission(result.into_violations()))
    }
}

impl ListingsClient {
    /// Build a client with the production adapters.
    ///
    /// Storage is file-backed when `storage_dir` is configured and in-memory
    /// otherwise.
    ///
    /// # Errors
    /// See [`ClientBuildError`].
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ClientBuildError> {
        let storage: Arc<dyn SlotStorage> = match &settings.storage_dir {
            Some(path) => Arc::new(CapFsSlotStorage::open(path).map_err(|source| {
                ClientBuildError::Storage {
                    path: path.clone(),
                    source,
                }
            })?),
            None => Arc::new(MemorySlotStorage::default()),
        };
        let ports = ClientPorts {
            transport: Arc::new(ReqwestTransport::new()?),
            storage,
            clock: Arc::new(DefaultClock),
            sleeper: Arc::new(TokioSleeper),
        };
        Self::with_ports(ports, settings)
    }

    /// Build a client over explicit ports.
    ///
    /// # Errors
    /// Fails when the configured base URL is unusable.
    pub fn with_ports(ports: ClientPorts, settings: &ClientSettings) -> Result<Self, ClientBuildError> {
        let ClientPorts {
            transport,
            storage,
            clock,
            sleeper,
        } = ports;
        let config = settings.dispatcher_config();
        let backend = HttpBackend::new(
            transport.clone(),
            settings.base_url()?,
            config.request_timeout,
        );
        let probe = Arc::new(BackendProbe::new(
            transport,
            backend.listings_url()?,
            settings.probe_timeout(),
        ));
        let sessions = Arc::new(SessionStore::new(storage.clone(), clock.clone()));
        let cache = Arc::new(ListingCache::new(storage));
        let dispatcher = Arc::new(RequestDispatcher::new(
            DispatcherPorts {
                backend: Arc::new(backend),
                simulation: Arc::new(SimulationStore::new(clock.clone())),
            },
            probe,
            sessions,
            clock,
            sleeper,
            config,
        ));
        let gate = PermissionGate::default();
        Ok(Self {
            submissions: SubmissionPipeline::new(dispatcher.clone(), cache.clone(), gate),
            dispatcher,
            cache,
            gate,
            secret_policy: settings.secret_policy(),
            probe_timeout: settings.probe_timeout(),
        })
    }

    /// Detect the backend unless a decision is already cached.
    pub async fn init(&self) -> SourceDecision {
        let present = self.dispatcher.probe().detect(self.probe_timeout).await;
        Self::decision(present)
    }

    /// Probe again, replacing the cached decision.
    pub async fn redetect_backend(&self) -> SourceDecision {
        let present = self.dispatcher.probe().redetect(self.probe_timeout).await;
        Self::decision(present)
    }

    const fn decision(present: bool) -> SourceDecision {
        if present {
            SourceDecision::Backend
        } else {
            SourceDecision::Simulation
        }
    }

    /// The active session, if any.
    pub fn session(&self) -> Option<Session> {
        self.dispatcher.sessions().get()
    }

    /// Whether the active session has `role`. Role is a UI hint only.
    pub fn has_role(&self, role: Role) -> bool {
        self.dispatcher.sessions().has_role(role)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    /// `validation` for malformed input (nothing is sent), otherwise whatever
    /// the dispatcher reports.
    pub async fn login(&self, email: &str, password: &str) -> OperationResult<Session> {
        let mut checks = validate_credential_email(email.trim());
        checks.merge(validate_credential_secret(password, self.secret_policy));
        rejected(checks)?;
        let credentials = LoginCredentials::try_from_parts(email, password).map_err(|error| {
            OperationFailure::new(ErrorKind::Validation, error.to_string())
        })?;
        let session = self.dispatcher.authenticate(credentials).await?;
        info!(role = ?session.role(), "signed in");
        Ok(session)
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    /// As for [`login`](Self::login).
    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> OperationResult<Session> {
        rejected(validate_registration(
            first_name,
            last_name,
            email.trim(),
            password,
            self.secret_policy,
        ))?;
        let registration = Registration::try_from_parts(first_name, last_name, email, password)
            .map_err(|error| {
                OperationFailure::new(ErrorKind::Validation, error.to_string())
            })?;
        let session = self.dispatcher.register(registration).await?;
        info!("registered and signed in");
        Ok(session)
    }

    /// End the session locally.
    pub fn logout(&self) {
        self.dispatcher.sessions().clear();
        debug!("signed out");
    }

    /// Fetch listings, refresh the cache, and return those matching `filter`.
    ///
    /// # Errors
    /// Whatever the dispatcher reports; the cache is untouched on failure.
    pub async fn listings(&self, filter: &ListingFilter) -> OperationResult<Vec<Listing>> {
        let listings = self.dispatcher.read_listings().await?;
        let matching = filter.apply(&listings);
        self.cache.replace_listings(listings);
        Ok(matching)
    }

    /// Cached listings matching `filter`, without a request.
    pub fn cached_listings(&self, filter: &ListingFilter) -> Vec<Listing> {
        filter.apply(&self.cache.listings())
    }

    /// Fetch one listing and refresh it in the cache.
    ///
    /// # Errors
    /// Whatever the dispatcher reports, e.g. `server` with status 404.
    pub async fn listing(&self, id: ListingId) -> OperationResult<Listing> {
        let listing = self.dispatcher.read_listing(id).await?;
        self.cache.upsert_listing(listing.clone());
        Ok(listing)
    }

    /// Fetch the reviews of a place and replace them in the cache.
    ///
    /// # Errors
    /// Whatever the dispatcher reports.
    pub async fn reviews_for_place(&self, place_id: ListingId) -> OperationResult<Vec<Review>> {
        let reviews = self
            .dispatcher
            .read_reviews_for_place(place_id.clone())
            .await?;
        self.cache.replace_reviews(&place_id, reviews.clone());
        Ok(reviews)
    }

    /// Review submission workflow.
    pub fn submissions(&self) -> &SubmissionPipeline {
        &self.submissions
    }

    fn require_session(&self) -> OperationResult<Session> {
        self.session()
            .ok_or_else(|| OperationFailure::unauthenticated("sign in to perform this action"))
    }

    /// Delete a review the caller wrote (or any review, for admins).
    ///
    /// Ownership is checked locally when the review is cached; the server
    /// has the final word either way.
    ///
    /// # Errors
    /// `unauthenticated`, `permission`, or whatever the dispatcher reports.
    pub async fn delete_review(&self, id: ReviewId) -> OperationResult<()> {
        let session = self.require_session()?;
        if let Some(review) = self.cache.review(&id) {
            forbidden(self.gate.can_delete_review(&session, &review))?;
        }
        self.dispatcher.delete_review(id.clone()).await?;
        self.cache.remove_review(&id);
        Ok(())
    }

    /// Delete a listing and its reviews; admins only.
    ///
    /// # Errors
    /// `unauthenticated`, `permission`, or whatever the dispatcher reports.
    pub async fn delete_listing(&self, id: ListingId) -> OperationResult<()> {
        let session = self.require_session()?;
        forbidden(self.gate.can_delete_listing(&session))?;
        self.dispatcher.delete_listing(id.clone()).await?;
        self.cache.remove_listing(&id);
        Ok(())
    }
}
