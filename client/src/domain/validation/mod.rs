//! Field-level and cross-field validation.
//!
//! Every validator is a pure function returning a [`ValidationResult`].
//! Violations accumulate instead of stopping at the first failure so
//! presentation code can show every field error at once.

use std::fmt;

use serde::{Deserialize, Serialize};

mod credentials;
mod review;

pub use credentials::{
    EMAIL_MAX_LENGTH, NAME_MAX_LENGTH, SecretPolicy, validate_credential_email,
    validate_credential_secret, validate_registration,
};
pub use review::{
    RATING_MAX, RATING_MIN, REVIEW_MAX_CHARS, REVIEW_MIN_WORDS, validate_review_submission,
};

/// Field a violation is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Login or registration email.
    Email,
    /// Login or registration password.
    Secret,
    /// Registration first name.
    FirstName,
    /// Registration last name.
    LastName,
    /// Listing identifier supplied with a submission.
    Place,
    /// Review text.
    Text,
    /// Review rating.
    Rating,
    /// Per-place review quota.
    Quota,
    /// Session profile completeness.
    Profile,
    /// Ownership or role rule.
    Permission,
}

impl Field {
    /// Stable lowercase name used in payloads and messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Secret => "secret",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Place => "place",
            Self::Text => "text",
            Self::Rating => "rating",
            Self::Quota => "quota",
            Self::Profile => "profile",
            Self::Permission => "permission",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule a value failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    field: Field,
    reason: String,
}

impl Violation {
    /// Build a violation for `field`.
    pub fn new(field: Field, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    /// Field the violation belongs to.
    pub const fn field(&self) -> Field {
        self.field
    }

    /// Human-readable reason.
    pub fn reason(&self) -> &str {
        self.reason.as_str()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Outcome of one validation or permission check.
///
/// ## Invariants
/// - The result is accepted exactly when no violation was recorded.
/// - Violations keep the order in which the rules ran.
///
/// # Examples
/// ```
/// use listings_client::domain::validation::{Field, validate_review_submission};
///
/// let result = validate_review_submission("Great place, would return", 7);
/// assert!(!result.is_accepted());
/// assert!(result.has_violation_for(Field::Rating));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "ValidationResultDto")]
pub struct ValidationResult {
    violations: Vec<Violation>,
}

impl ValidationResult {
    /// A result with no violations.
    pub const fn pass() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    /// Whether every rule passed.
    pub fn is_accepted(&self) -> bool {
        self.violations.is_empty()
    }

    /// Record a violation.
    pub fn push(&mut self, field: Field, reason: impl Into<String>) {
        self.violations.push(Violation::new(field, reason));
    }

    /// Append every violation from `other`, preserving order.
    pub fn merge(&mut self, other: Self) {
        self.violations.extend(other.violations);
    }

    /// Whether any violation targets `field`.
    pub fn has_violation_for(&self, field: Field) -> bool {
        self.violations
            .iter()
            .any(|violation| violation.field == field)
    }

    /// Borrow the recorded violations.
    pub fn violations(&self) -> &[Violation] {
        self.violations.as_slice()
    }

    /// Consume the result, returning its violations.
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

impl FromIterator<Violation> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        Self {
            violations: iter.into_iter().collect(),
        }
    }
}

#[derive(Serialize)]
struct ValidationResultDto {
    accepted: bool,
    violations: Vec<Violation>,
}

impl From<ValidationResult> for ValidationResultDto {
    fn from(value: ValidationResult) -> Self {
        Self {
            accepted: value.is_accepted(),
            violations: value.violations,
        }
    }
}
