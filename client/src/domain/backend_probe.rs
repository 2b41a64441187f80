//! Detection of a reachable HTTP backend.
//!
//! One `GET` against the listings endpoint decides whether operations go to
//! the backend or the simulation. The decision is cached until
//! [`BackendProbe::redetect`] or [`BackendProbe::reset`]; detection failures
//! never surface as errors.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, info};
use url::Url;

use super::ports::{HttpTransport, TransportRequest};

/// Which data source serves operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceDecision {
    /// The HTTP backend answered the probe.
    Backend,
    /// The in-memory simulation.
    Simulation,
}

impl SourceDecision {
    /// Whether the backend was detected.
    pub const fn is_backend(self) -> bool {
        matches!(self, Self::Backend)
    }
}

/// Cached backend availability check.
pub struct BackendProbe {
    transport: Arc<dyn HttpTransport>,
    listings_url: Url,
    default_timeout: Duration,
    decision: RwLock<Option<SourceDecision>>,
}

impl BackendProbe {
    /// Build a probe that targets `listings_url`.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        listings_url: Url,
        default_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            listings_url,
            default_timeout,
            decision: RwLock::new(None),
        }
    }

    /// Cached decision, if detection has run.
    pub fn cached(&self) -> Option<SourceDecision> {
        *self.decision.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, decision: SourceDecision) {
        *self.decision.write().unwrap_or_else(PoisonError::into_inner) = Some(decision);
    }

    /// Forget the cached decision.
    pub fn reset(&self) {
        *self.decision.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether the backend is present, probing only when nothing is cached.
    pub async fn detect(&self, timeout: Duration) -> bool {
        if let Some(decision) = self.cached() {
            return decision.is_backend();
        }
        self.redetect(timeout).await
    }

    /// [`detect`](Self::detect) with the configured default timeout.
    pub async fn detect_default(&self) -> bool {
        self.detect(self.default_timeout).await
    }

    /// Cached decision, detecting first when nothing is cached.
    pub async fn decision(&self) -> SourceDecision {
        match self.cached() {
            Some(decision) => decision,
            None => self.probe(self.default_timeout).await,
        }
    }

    /// Probe again regardless of the cached decision.
    pub async fn redetect(&self, timeout: Duration) -> bool {
        self.probe(timeout).await.is_backend()
    }

    async fn probe(&self, timeout: Duration) -> SourceDecision {
        let request = TransportRequest::get(self.listings_url.clone(), timeout);
        let outcome = tokio::time::timeout(timeout, self.transport.send(request)).await;
        let decision = match outcome {
            Ok(Ok(response)) if response.is_success() || response.status == 404 => {
                SourceDecision::Backend
            }
            Ok(Ok(response)) => {
                debug!(status = response.status, "probe answered with an unusable status");
                SourceDecision::Simulation
            }
            Ok(Err(error)) => {
                debug!(error = %error, kind = error.label(), "probe failed");
                SourceDecision::Simulation
            }
            Err(_) => {
                debug!(timeout_ms = %timeout.as_millis(), "probe timed out");
                SourceDecision::Simulation
            }
        };
        info!(backend = decision.is_backend(), url = %self.listings_url, "data source detected");
        self.store(decision);
        decision
    }
}
