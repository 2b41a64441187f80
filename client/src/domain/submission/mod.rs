//! Staged review-submission workflow.
//!
//! `idle -> validating -> checking-permission -> dispatching -> success | error`.
//! Validation and permission failures never reach the network. A pipeline
//! runs one submission at a time; a concurrent call is answered with `busy`
//! before the first suspension point. Dropping a submission mid-dispatch
//! leaves a retryable error holding the draft. State changes are published on a
//! `tokio::sync::watch` channel for UI observers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::dispatcher::RequestDispatcher;
use super::error::{ErrorKind, OperationFailure, OperationResult};
use super::listing_cache::ListingCache;
use super::permission::PermissionGate;
use super::review::{Rating, Review, ReviewDraft};
use super::session::Session;
use super::validation::{Field, Violation, validate_review_submission};

mod state;

pub use state::{PipelineError, PipelineState, ReviewSubmission};

enum RetryClaim {
    Claimed,
    Busy,
    NothingPending,
}

/// Held across the create-review await. If the future is dropped first, the
/// pipeline leaves `Dispatching` for a retryable error keeping the draft.
struct InFlight<'a> {
    pipeline: &'a SubmissionPipeline,
    draft: Option<ReviewDraft>,
}

impl InFlight<'_> {
    fn settle(&mut self) {
        self.draft = None;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(draft) = self.draft.take() {
            warn!(place_id = %draft.place_id, "review submission interrupted before completion");
            self.pipeline.fail(
                OperationFailure::network("submission interrupted before completion")
                    .with_retryable(true),
                Some(draft),
            );
        }
    }
}

/// Runs review submissions through validation, permission, and dispatch.
pub struct SubmissionPipeline {
    dispatcher: Arc<RequestDispatcher>,
    cache: Arc<ListingCache>,
    gate: PermissionGate,
    state: watch::Sender<PipelineState>,
    pending: Mutex<Option<ReviewDraft>>,
}

impl SubmissionPipeline {
    /// Build an idle pipeline.
    pub fn new(
        dispatcher: Arc<RequestDispatcher>,
        cache: Arc<ListingCache>,
        gate: PermissionGate,
    ) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            dispatcher,
            cache,
            gate,
            state,
            pending: Mutex::new(None),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    fn pending(&self) -> MutexGuard<'_, Option<ReviewDraft>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, next: PipelineState) {
        debug!(state = next.name(), "submission state changed");
        self.state.send_replace(next);
    }

    fn fail(&self, failure: OperationFailure, retry_with: Option<ReviewDraft>) -> OperationFailure {
        let can_retry = retry_with.is_some();
        *self.pending() = retry_with;
        self.transition(PipelineState::Error(PipelineError {
            failure: failure.clone(),
            can_retry,
        }));
        failure
    }

    /// Submit a new review.
    ///
    /// # Errors
    /// - `busy` when another submission is in flight; the state is untouched.
    /// - `unauthenticated` with no session; the validator does not run.
    /// - `validation` / `permission` with the violations, before any request.
    /// - Whatever the dispatcher reports for the create-review call.
    pub async fn submit(&self, submission: ReviewSubmission) -> OperationResult<Review> {
        let session = self.dispatcher.sessions().get();
        let mut claimed = false;
        self.state.send_if_modified(|state| {
            if state.is_in_flight() {
                return false;
            }
            claimed = true;
            *state = if session.is_some() {
                PipelineState::Validating
            } else {
                PipelineState::Error(PipelineError {
                    failure: OperationFailure::unauthenticated("sign in to post a review"),
                    can_retry: false,
                })
            };
            true
        });
        if !claimed {
            debug!("submission rejected: pipeline busy");
            return Err(OperationFailure::busy());
        }
        let Some(session) = session else {
            *self.pending() = None;
            return Err(OperationFailure::unauthenticated("sign in to post a review"));
        };

        let draft = match Self::validate(submission) {
            Ok(draft) => draft,
            Err(failure) => return Err(self.fail(failure, None)),
        };

        self.transition(PipelineState::CheckingPermission);
        if let Err(failure) = self.check_permission(&session, &draft) {
            return Err(self.fail(failure, None));
        }

        self.dispatch(draft).await
    }

    fn validate(submission: ReviewSubmission) -> OperationResult<ReviewDraft> {
        let ReviewSubmission {
            place_id,
            text,
            rating,
        } = submission;
        let result = validate_review_submission(&text, rating);
        if !result.is_accepted() {
            return Err(OperationFailure::validation(result.into_violations()));
        }
        let rating = Rating::try_new(rating).map_err(|error| {
            OperationFailure::validation(vec![Violation::new(Field::Rating, error.to_string())])
        })?;
        Ok(ReviewDraft {
            place_id,
            text: text.trim().to_owned(),
            rating,
        })
    }

    fn check_permission(&self, session: &Session, draft: &ReviewDraft) -> OperationResult<()> {
        let existing = self.cache.reviews_for(&draft.place_id);
        let result = self
            .gate
            .can_submit_review(session, &draft.place_id, &existing);
        if result.is_accepted() {
            Ok(())
        } else {
            Err(OperationFailure::permission(result.into_violations()))
        }
    }

    async fn dispatch(&self, draft: ReviewDraft) -> OperationResult<Review> {
        self.transition(PipelineState::Dispatching);
        let mut in_flight = InFlight {
            pipeline: self,
            draft: Some(draft.clone()),
        };
        let outcome = self.dispatcher.create_review(draft.clone()).await;
        in_flight.settle();
        match outcome {
            Ok(review) => {
                info!(review_id = %review.id(), place_id = %review.place_id(), "review created");
                self.cache.append_review(review.clone());
                *self.pending() = None;
                self.transition(PipelineState::Success(review.clone()));
                Ok(review)
            }
            Err(failure) => {
                let can_retry = failure.is_retryable() || failure.kind() == ErrorKind::Network;
                Err(self.fail(failure, can_retry.then_some(draft)))
            }
        }
    }

    /// Re-dispatch the last retryable failure with its validated payload.
    ///
    /// # Errors
    /// `busy` while a submission is in flight; `validation` when nothing is
    /// awaiting retry; otherwise whatever the dispatcher reports.
    pub async fn retry(&self) -> OperationResult<Review> {
        let mut claim = RetryClaim::NothingPending;
        self.state.send_if_modified(|state| {
            if state.is_in_flight() {
                claim = RetryClaim::Busy;
                return false;
            }
            if !matches!(state, PipelineState::Error(error) if error.can_retry) {
                return false;
            }
            claim = RetryClaim::Claimed;
            *state = PipelineState::Dispatching;
            true
        });

        match claim {
            RetryClaim::Busy => Err(OperationFailure::busy()),
            RetryClaim::NothingPending => Err(OperationFailure::new(
                ErrorKind::Validation,
                "no submission awaiting retry",
            )),
            RetryClaim::Claimed => {
                let draft = self.pending().take();
                match draft {
                    Some(draft) => self.dispatch(draft).await,
                    None => Err(self.fail(
                        OperationFailure::new(
                            ErrorKind::Validation,
                            "no submission awaiting retry",
                        ),
                        None,
                    )),
                }
            }
        }
    }

    /// Return to `Idle` and drop any pending retry. Has no effect while a
    /// submission is in flight; returns whether the reset happened.
    pub fn reset(&self) -> bool {
        let mut reset = false;
        self.state.send_if_modified(|state| {
            if state.is_in_flight() {
                return false;
            }
            reset = true;
            if *state == PipelineState::Idle {
                return false;
            }
            *state = PipelineState::Idle;
            true
        });
        if reset {
            *self.pending() = None;
        }
        reset
    }
}
