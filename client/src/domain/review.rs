//! Reviews attached to listings.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ListingId, ReviewId, SubjectId};
use super::validation::{RATING_MAX, RATING_MIN};

/// Error raised when a rating falls outside the accepted scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingOutOfRange {
    /// Rejected value.
    pub value: i64,
}

impl fmt::Display for RatingOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rating {} is outside {RATING_MIN}..={RATING_MAX}",
            self.value
        )
    }
}

impl std::error::Error for RatingOutOfRange {}

/// Star rating between one and five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Validate a raw rating.
    pub fn try_new(value: i64) -> Result<Self, RatingOutOfRange> {
        if !(RATING_MIN..=RATING_MAX).contains(&value) {
            return Err(RatingOutOfRange { value });
        }
        u8::try_from(value)
            .map(Self)
            .map_err(|_| RatingOutOfRange { value })
    }

    /// Numeric value.
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A rated review of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    id: ReviewId,
    place_id: ListingId,
    author_id: SubjectId,
    rating: Rating,
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl Review {
    /// Construct a review without a creation timestamp.
    pub fn new(
        id: ReviewId,
        place_id: ListingId,
        author_id: SubjectId,
        rating: Rating,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            place_id,
            author_id,
            rating,
            text: text.into(),
            created_at: None,
        }
    }

    /// Attach a creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Review identifier.
    pub fn id(&self) -> &ReviewId {
        &self.id
    }

    /// Reviewed listing.
    pub fn place_id(&self) -> &ListingId {
        &self.place_id
    }

    /// Authoring subject.
    pub fn author_id(&self) -> &SubjectId {
        &self.author_id
    }

    /// Star rating.
    pub const fn rating(&self) -> Rating {
        self.rating
    }

    /// Review body.
    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    /// Creation time, when reported.
    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

/// Validated review payload ready for the create-review operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    /// Listing being reviewed.
    pub place_id: ListingId,
    /// Trimmed review body.
    pub text: String,
    /// Star rating.
    pub rating: Rating,
}
