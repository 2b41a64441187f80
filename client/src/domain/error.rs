//! Operation failure types shared by every component.
//!
//! These failures are transport agnostic. The dispatcher normalises backend
//! and simulation errors into [`OperationFailure`]; presentation code reads
//! the [`ErrorKind`] and `retryable` flag to decide what to show.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::validation::Violation;

/// Stable machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The operation needs a session and none is active.
    Unauthenticated,
    /// Field-level validation failed locally.
    Validation,
    /// Quota, profile, or ownership rules denied the operation locally.
    Permission,
    /// The data source could not be reached in time.
    Network,
    /// The data source answered with an application error.
    Server,
    /// Another submission is already in flight.
    Busy,
}

impl ErrorKind {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Validation => "validation",
            Self::Permission => "permission",
            Self::Network => "network",
            Self::Server => "server",
            Self::Busy => "busy",
        }
    }

    const fn default_message(self) -> &'static str {
        match self {
            Self::Unauthenticated => "sign in required",
            Self::Validation => "validation failed",
            Self::Permission => "not permitted",
            Self::Network => "network failure",
            Self::Server => "server error",
            Self::Busy => "a submission is already in progress",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure half of an [`OperationResult`].
///
/// ## Invariants
/// - `message` is never blank; constructors substitute the kind's default
///   message for blank input, and deserialisation rejects it.
/// - Only validation and permission failures carry violations.
///
/// # Examples
/// ```
/// use listings_client::domain::{ErrorKind, OperationFailure};
///
/// let failure = OperationFailure::server(409, "Duplicate review detected");
/// assert_eq!(failure.kind(), ErrorKind::Server);
/// assert_eq!(failure.status(), Some(409));
/// assert!(!failure.is_retryable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OperationFailureDto", into = "OperationFailureDto")]
pub struct OperationFailure {
    kind: ErrorKind,
    message: String,
    retryable: bool,
    status: Option<u16>,
    violations: Vec<Violation>,
}

/// Validation errors emitted by [`OperationFailure::try_new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationFailureValidationError {
    /// The message was empty once trimmed.
    EmptyMessage,
}

impl fmt::Display for OperationFailureValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "failure message must not be empty"),
        }
    }
}

impl std::error::Error for OperationFailureValidationError {}

impl OperationFailure {
    /// Create a failure, falling back to the kind's default message when
    /// `message` is blank.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::try_new(kind, message).unwrap_or_else(|_| Self::bare(kind, kind.default_message()))
    }

    /// Strict constructor that rejects blank messages.
    pub fn try_new(
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Result<Self, OperationFailureValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(OperationFailureValidationError::EmptyMessage);
        }
        Ok(Self::bare(kind, message))
    }

    fn bare(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: false,
            status: None,
            violations: Vec::new(),
        }
    }

    /// Convenience constructor for [`ErrorKind::Unauthenticated`].
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    /// Convenience constructor for [`ErrorKind::Validation`] carrying the
    /// accumulated violations.
    pub fn validation(violations: Vec<Violation>) -> Self {
        let message = summarise(ErrorKind::Validation, &violations);
        Self::new(ErrorKind::Validation, message).with_violations(violations)
    }

    /// Convenience constructor for [`ErrorKind::Permission`].
    pub fn permission(violations: Vec<Violation>) -> Self {
        let message = summarise(ErrorKind::Permission, &violations);
        Self::new(ErrorKind::Permission, message).with_violations(violations)
    }

    /// Convenience constructor for [`ErrorKind::Network`].
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    /// Convenience constructor for [`ErrorKind::Server`] with the HTTP status
    /// (or the equivalent simulated status).
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        let mut failure = Self::new(ErrorKind::Server, message);
        failure.status = Some(status);
        failure
    }

    /// Convenience constructor for [`ErrorKind::Busy`].
    pub fn busy() -> Self {
        Self::new(ErrorKind::Busy, ErrorKind::Busy.default_message())
    }

    /// Mark whether an automatic retry could succeed.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    fn with_violations(mut self, violations: Vec<Violation>) -> Self {
        self.violations = violations;
        self
    }

    /// Failure category.
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Whether an automatic retry could succeed.
    pub const fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// HTTP status (or simulated equivalent) for server failures.
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    /// Field violations behind a validation or permission failure.
    pub fn violations(&self) -> &[Violation] {
        self.violations.as_slice()
    }

    /// Whether the failure means the session was rejected by the data source.
    pub fn invalidates_session(&self) -> bool {
        self.kind == ErrorKind::Server && matches!(self.status, Some(401 | 403))
    }
}

fn summarise(kind: ErrorKind, violations: &[Violation]) -> String {
    match violations {
        [] => kind.default_message().to_owned(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for OperationFailure {}

/// Result of every client operation.
pub type OperationResult<T> = Result<T, OperationFailure>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationFailureDto {
    kind: ErrorKind,
    message: String,
    retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    violations: Vec<Violation>,
}

impl From<OperationFailure> for OperationFailureDto {
    fn from(value: OperationFailure) -> Self {
        Self {
            kind: value.kind,
            message: value.message,
            retryable: value.retryable,
            status: value.status,
            violations: value.violations,
        }
    }
}

impl TryFrom<OperationFailureDto> for OperationFailure {
    type Error = OperationFailureValidationError;

    fn try_from(value: OperationFailureDto) -> Result<Self, Self::Error> {
        let OperationFailureDto {
            kind,
            message,
            retryable,
            status,
            violations,
        } = value;

        let mut failure = Self::try_new(kind, message)?;
        failure.retryable = retryable;
        failure.status = status;
        failure.violations = violations;
        Ok(failure)
    }
}
