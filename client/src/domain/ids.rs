//! Identifier newtypes for listings, reviews, and subjects.
//!
//! Backends hand out identifiers as strings or integers; adapters normalise
//! them to strings before constructing these types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation error raised by the identifier constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdValidationError {
    /// The identifier was empty once trimmed of whitespace.
    Blank { kind: &'static str },
}

impl fmt::Display for IdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank { kind } => write!(f, "{kind} must not be blank"),
        }
    }
}

impl std::error::Error for IdValidationError {}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and construct the identifier, trimming surrounding
            /// whitespace.
            pub fn new(value: impl Into<String>) -> Result<Self, IdValidationError> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(IdValidationError::Blank { kind: $kind });
                }
                Ok(Self(trimmed.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.0.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a listing (a "place" in backend payloads).
    ListingId,
    "listing id"
);
string_id!(
    /// Identifier of a review.
    ReviewId,
    "review id"
);
string_id!(
    /// Identifier of an authenticated subject (a user account).
    SubjectId,
    "subject id"
);
