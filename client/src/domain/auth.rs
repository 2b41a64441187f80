//! Authentication primitives such as login credentials and registrations.
//!
//! Keep form parsing outside the domain by exposing constructors that
//! validate string inputs before the dispatcher talks to a data source.

use std::fmt;

use zeroize::Zeroizing;

/// Domain error returned when login or registration values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsValidationError {
    /// Email was missing or blank once trimmed.
    EmptyEmail,
    /// Password was blank.
    EmptyPassword,
    /// A registration name was blank once trimmed.
    EmptyName,
}

impl fmt::Display for CredentialsValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
            Self::EmptyName => write!(f, "name must not be empty"),
        }
    }
}

impl std::error::Error for CredentialsValidationError {}

/// Validated login credentials used by the authenticate operation.
///
/// ## Invariants
/// - `email` is trimmed, lowercased, and must not be empty.
/// - `password` is required to be non-empty but retains caller-provided
///   whitespace to avoid surprising credential comparisons.
///
/// # Examples
/// ```
/// use listings_client::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" Demo@Example.com ", "DemoPass123").unwrap();
/// assert_eq!(creds.email(), "demo@example.com");
/// assert_eq!(creds.password(), "DemoPass123");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw email/password inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, CredentialsValidationError> {
        let normalized = email.trim();
        if normalized.is_empty() {
            return Err(CredentialsValidationError::EmptyEmail);
        }

        if password.is_empty() {
            return Err(CredentialsValidationError::EmptyPassword);
        }

        Ok(Self {
            email: normalized.to_lowercase(),
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised email suitable for account lookups.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Account registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    first_name: String,
    last_name: String,
    credentials: LoginCredentials,
}

impl Registration {
    /// Construct a registration from raw form inputs.
    pub fn try_from_parts(
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Self, CredentialsValidationError> {
        let first_name = first_name.trim();
        let last_name = last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(CredentialsValidationError::EmptyName);
        }
        Ok(Self {
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            credentials: LoginCredentials::try_from_parts(email, password)?,
        })
    }

    /// Trimmed first name.
    pub fn first_name(&self) -> &str {
        self.first_name.as_str()
    }

    /// Trimmed last name.
    pub fn last_name(&self) -> &str {
        self.last_name.as_str()
    }

    /// Credentials the new account will sign in with.
    pub fn credentials(&self) -> &LoginCredentials {
        &self.credentials
    }

    /// `First Last` display form.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
