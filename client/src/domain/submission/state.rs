//! Observable states of the review-submission workflow.

use crate::domain::error::OperationFailure;
use crate::domain::ids::ListingId;
use crate::domain::review::Review;

/// Raw form input for one review submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSubmission {
    /// Listing being reviewed.
    pub place_id: ListingId,
    /// Review body as typed.
    pub text: String,
    /// Rating as entered; range-checked by the validator.
    pub rating: i64,
}

/// Terminal failure of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineError {
    /// Normalised failure.
    pub failure: OperationFailure,
    /// Whether [`retry`](super::SubmissionPipeline::retry) can re-dispatch.
    pub can_retry: bool,
}

/// Stage of the submission workflow.
///
/// `Success` and `Error` are terminal; the next submission treats them as
/// `Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Running field validation.
    Validating,
    /// Running the permission gate.
    CheckingPermission,
    /// Waiting on the data source.
    Dispatching,
    /// The review was created.
    Success(Review),
    /// The attempt failed.
    Error(PipelineError),
}

impl PipelineState {
    /// Whether a submission currently owns the pipeline.
    pub const fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Validating | Self::CheckingPermission | Self::Dispatching
        )
    }

    /// Whether the state ends a submission.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Error(_))
    }

    /// Stable kebab-case name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::CheckingPermission => "checking-permission",
            Self::Dispatching => "dispatching",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
        }
    }
}
