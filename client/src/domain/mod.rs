//! Domain primitives, services, and ports.
//!
//! Purpose: keep every rule about sessions, validation, permissions, source
//! selection, and review submission independent of HTTP and storage
//! libraries. Adapters live in `outbound`; presentation code enters through
//! `inbound`.
//!
//! Public surface:
//! - `OperationFailure` / `ErrorKind` / `OperationResult` — normalised
//!   failures returned by every operation.
//! - `SessionStore` — the single authenticated session.
//! - `RequestDispatcher` — routes operations to the backend or simulation.
//! - `SubmissionPipeline` — the staged review-submission workflow.

use std::sync::Arc;

use mockable::Clock;

pub mod auth;
pub mod backend_probe;
pub mod credential;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod listing;
pub mod listing_cache;
pub mod operation;
pub mod permission;
pub mod ports;
pub mod review;
pub mod session;
pub mod session_store;
pub mod submission;
pub mod validation;

pub use self::auth::{CredentialsValidationError, LoginCredentials, Registration};
pub use self::backend_probe::{BackendProbe, SourceDecision};
pub use self::credential::{
    BearerCredential, CredentialValidationError, TokenClaims, synthesize_unsigned_token,
};
pub use self::dispatcher::{
    DispatcherConfig, DispatcherPorts, RequestDispatcher, RetrySleeper, TokioSleeper,
};
pub use self::error::{ErrorKind, OperationFailure, OperationResult};
pub use self::ids::{IdValidationError, ListingId, ReviewId, SubjectId};
pub use self::listing::{Listing, ListingFilter, ListingValidationError};
pub use self::listing_cache::ListingCache;
pub use self::operation::{AuthGrant, DispatchOptions, Operation, OperationOutput};
pub use self::permission::PermissionGate;
pub use self::review::{Rating, RatingOutOfRange, Review, ReviewDraft};
pub use self::session::{Role, Session, SessionProfile};
pub use self::session_store::SessionStore;
pub use self::submission::{PipelineError, PipelineState, ReviewSubmission, SubmissionPipeline};
pub use self::validation::{Field, SecretPolicy, ValidationResult, Violation};

/// Clock shared by components that stamp or expire sessions.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;
