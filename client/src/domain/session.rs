//! Authenticated session state.
//!
//! A session is created from the grant returned by an authenticate or
//! register operation. Role and profile are read from the credential's
//! claims, with the grant's explicit profile taking precedence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::credential::BearerCredential;
use super::ids::SubjectId;
use super::operation::AuthGrant;

/// Role carried by the session. A UI hint only; the data source enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular account.
    User,
    /// Administrative account.
    Admin,
}

impl Role {
    /// Role asserted by the credential's `is_admin` claim; `User` when the
    /// credential carries no readable claims.
    fn claimed_by(credential: &BearerCredential) -> Self {
        if credential.claims().is_some_and(|claims| claims.is_admin) {
            Self::Admin
        } else {
            Self::User
        }
    }
}

/// Profile details returned alongside a credential.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionProfile {
    /// Subject identifier, when the data source reported one.
    pub subject_id: Option<SubjectId>,
    /// Display name, when the data source reported one.
    pub display_name: Option<String>,
}

/// The single active authenticated session.
///
/// ## Invariants
/// - `credential` is always present and well formed.
/// - `display_name`, when present, is non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SessionDto", into = "SessionDto")]
pub struct Session {
    subject_id: Option<SubjectId>,
    display_name: Option<String>,
    role: Role,
    credential: BearerCredential,
    issued_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from a credential alone, reading everything from its
    /// claims.
    pub fn from_credential(credential: BearerCredential, issued_at: DateTime<Utc>) -> Self {
        Self::from_parts(credential, SessionProfile::default(), issued_at)
    }

    /// Build a session from an authentication grant.
    ///
    /// Display name precedence: explicit profile, then the `name` claim, then
    /// the `email` claim.
    pub fn from_grant(grant: AuthGrant, issued_at: DateTime<Utc>) -> Self {
        let AuthGrant {
            credential,
            profile,
        } = grant;
        Self::from_parts(credential, profile, issued_at)
    }

    fn from_parts(
        credential: BearerCredential,
        profile: SessionProfile,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let claims = credential.claims().unwrap_or_default();
        let subject_id = profile.subject_id.or_else(|| claims.subject());
        let display_name = [profile.display_name, claims.name, claims.email]
            .into_iter()
            .flatten()
            .map(|name| name.trim().to_owned())
            .find(|name| !name.is_empty());
        let role = Role::claimed_by(&credential);
        Self {
            subject_id,
            display_name,
            role,
            credential,
            issued_at,
        }
    }

    /// Subject identifier, if known.
    pub fn subject_id(&self) -> Option<&SubjectId> {
        self.subject_id.as_ref()
    }

    /// Display name, if known.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Session role.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Whether the session holds the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Bearer credential attached to authenticated requests.
    pub fn credential(&self) -> &BearerCredential {
        &self.credential
    }

    /// When the session was established.
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Whether the credential's `exp` claim lies at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.credential
            .claims()
            .is_some_and(|claims| claims.is_expired_at(now))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionDto {
    #[serde(default)]
    subject_id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    /// Written for readers of the slot; ignored on load.
    #[serde(default)]
    role: Option<Role>,
    credential: BearerCredential,
    issued_at: DateTime<Utc>,
}

impl From<Session> for SessionDto {
    fn from(value: Session) -> Self {
        Self {
            subject_id: value.subject_id.map(String::from),
            display_name: value.display_name,
            role: Some(value.role),
            credential: value.credential,
            issued_at: value.issued_at,
        }
    }
}

impl TryFrom<SessionDto> for Session {
    type Error = super::ids::IdValidationError;

    fn try_from(value: SessionDto) -> Result<Self, Self::Error> {
        let subject_id = value.subject_id.map(SubjectId::new).transpose()?;
        let display_name = value
            .display_name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty());
        Ok(Self {
            subject_id,
            display_name,
            role: Role::claimed_by(&value.credential),
            credential: value.credential,
            issued_at: value.issued_at,
        })
    }
}
