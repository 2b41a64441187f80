//! Bearer credentials and the claims embedded in them.
//!
//! Both data sources hand out JWT-shaped tokens. The client never verifies
//! signatures; claims are read only to derive the session profile and role,
//! which are UI hints. The data source remains the authority.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use super::ids::SubjectId;

/// Validation errors raised by [`BearerCredential::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialValidationError {
    /// The token was empty once trimmed.
    Blank,
    /// The token contained interior whitespace.
    ContainsWhitespace,
}

impl fmt::Display for CredentialValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => write!(f, "credential must not be blank"),
            Self::ContainsWhitespace => write!(f, "credential must not contain whitespace"),
        }
    }
}

impl std::error::Error for CredentialValidationError {}

/// Opaque bearer token attached to authenticated requests.
///
/// ## Invariants
/// - The token is non-empty and contains no whitespace.
/// - `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerCredential(Zeroizing<String>);

impl BearerCredential {
    /// Validate and wrap a raw token, trimming surrounding whitespace.
    ///
    /// # Examples
    /// ```
    /// use listings_client::domain::BearerCredential;
    ///
    /// assert!(BearerCredential::new("abc.def.ghi").is_ok());
    /// assert!(BearerCredential::new("  ").is_err());
    /// ```
    pub fn new(token: impl Into<String>) -> Result<Self, CredentialValidationError> {
        let token = Zeroizing::new(token.into());
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(CredentialValidationError::Blank);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(CredentialValidationError::ContainsWhitespace);
        }
        Ok(Self(Zeroizing::new(trimmed.to_owned())))
    }

    /// Raw token for the `Authorization` header.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Decode the claims segment, if the token is JWT-shaped.
    ///
    /// Returns `None` for opaque tokens or undecodable payloads.
    pub fn claims(&self) -> Option<TokenClaims> {
        let mut segments = self.as_str().split('.');
        let _header = segments.next()?;
        let payload = segments.next()?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

impl fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerCredential(<redacted>)")
    }
}

impl Serialize for BearerCredential {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BearerCredential {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Claims the client reads from a bearer token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject identifier issued by the data source.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    /// Standard JWT subject, used when `user_id` is absent.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub sub: Option<String>,
    /// Account email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Administrative role flag.
    #[serde(default)]
    pub is_admin: bool,
    /// Expiry as seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Subject carried by the claims, preferring `user_id` over `sub`.
    pub fn subject(&self) -> Option<SubjectId> {
        [self.user_id.as_deref(), self.sub.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|raw| SubjectId::new(raw).ok())
    }

    /// Whether the `exp` claim lies at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp.is_some_and(|exp| exp <= now.timestamp())
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(text)) => Some(text),
        Some(serde_json::Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

#[derive(Serialize)]
struct UnsignedHeader {
    alg: &'static str,
    typ: &'static str,
}

/// Build an unsigned (`alg: none`) JWT-shaped credential carrying `claims`.
///
/// # Errors
/// Returns the serialisation error if the claims cannot be encoded.
pub fn synthesize_unsigned_token(
    claims: &TokenClaims,
) -> Result<BearerCredential, serde_json::Error> {
    let header = serde_json::to_vec(&UnsignedHeader {
        alg: "none",
        typ: "JWT",
    })?;
    let payload = serde_json::to_vec(claims)?;
    let token = format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(payload)
    );
    BearerCredential::new(token).map_err(serde::ser::Error::custom)
}
