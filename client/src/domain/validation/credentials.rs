//! Credential and registration validators.

use std::sync::OnceLock;

use regex::Regex;

use super::{Field, ValidationResult};

/// Maximum accepted email length.
pub const EMAIL_MAX_LENGTH: usize = 254;
/// Maximum accepted length for registration names.
pub const NAME_MAX_LENGTH: usize = 50;

const DEFAULT_SECRET_MIN_LENGTH: usize = 3;
const DEFAULT_SECRET_MAX_LENGTH: usize = 128;

/// Length bounds applied to passwords.
///
/// Defaults to `[3, 128]`; `secret_min_length` in
/// [`ClientSettings`](crate::ClientSettings) overrides the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretPolicy {
    /// Minimum length in characters.
    pub min_length: usize,
    /// Maximum length in characters.
    pub max_length: usize,
}

impl Default for SecretPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_SECRET_MIN_LENGTH,
            max_length: DEFAULT_SECRET_MAX_LENGTH,
        }
    }
}

impl SecretPolicy {
    /// Policy with a custom floor; the floor never drops below one character
    /// and never exceeds the ceiling.
    pub fn with_min_length(min_length: usize) -> Self {
        let defaults = Self::default();
        Self {
            min_length: min_length.clamp(1, defaults.max_length),
            ..defaults
        }
    }
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        // Local part, one @, a domain with a dot.
        let pattern = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
        Regex::new(pattern).unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Validate a login email.
///
/// # Examples
/// ```
/// use listings_client::domain::validation::validate_credential_email;
///
/// assert!(validate_credential_email("demo@example.com").is_accepted());
/// assert!(!validate_credential_email("demo@localhost").is_accepted());
/// ```
pub fn validate_credential_email(value: &str) -> ValidationResult {
    let mut result = ValidationResult::pass();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        result.push(Field::Email, "required");
        return result;
    }
    if trimmed.chars().count() > EMAIL_MAX_LENGTH {
        result.push(
            Field::Email,
            format!("must be at most {EMAIL_MAX_LENGTH} characters"),
        );
    }
    if !email_regex().is_match(trimmed) {
        result.push(Field::Email, "must look like name@domain.tld");
    }
    result
}

/// Validate a password against `policy`.
///
/// Whitespace is significant and is not trimmed.
pub fn validate_credential_secret(value: &str, policy: SecretPolicy) -> ValidationResult {
    let mut result = ValidationResult::pass();
    if value.is_empty() {
        result.push(Field::Secret, "required");
        return result;
    }
    let length = value.chars().count();
    if length < policy.min_length {
        result.push(
            Field::Secret,
            format!("must be at least {} characters", policy.min_length),
        );
    }
    if length > policy.max_length {
        result.push(
            Field::Secret,
            format!("must be at most {} characters", policy.max_length),
        );
    }
    result
}

/// Validate a registration form: both names plus the credential rules.
pub fn validate_registration(
    first_name: &str,
    last_name: &str,
    email: &str,
    secret: &str,
    policy: SecretPolicy,
) -> ValidationResult {
    let mut result = ValidationResult::pass();
    check_name(&mut result, Field::FirstName, first_name);
    check_name(&mut result, Field::LastName, last_name);
    result.merge(validate_credential_email(email));
    result.merge(validate_credential_secret(secret, policy));
    result
}

fn check_name(result: &mut ValidationResult, field: Field, value: &str) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        result.push(field, "required");
    } else if trimmed.chars().count() > NAME_MAX_LENGTH {
        result.push(field, format!("must be at most {NAME_MAX_LENGTH} characters"));
    }
}
