//! Operations the dispatcher can route to a data source.

use super::auth::{LoginCredentials, Registration};
use super::credential::BearerCredential;
use super::ids::{ListingId, ReviewId};
use super::listing::Listing;
use super::review::{Review, ReviewDraft};
use super::session::SessionProfile;

/// One request against the listings data source.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Fetch every listing.
    ReadListings,
    /// Fetch one listing.
    ReadListing { id: ListingId },
    /// Fetch the reviews of one listing.
    ReadReviewsForPlace { place_id: ListingId },
    /// Exchange credentials for a bearer token.
    Authenticate(LoginCredentials),
    /// Create an account and sign in.
    Register(Registration),
    /// Post a validated review.
    CreateReview(ReviewDraft),
    /// Delete a review.
    DeleteReview { id: ReviewId },
    /// Delete a listing.
    DeleteListing { id: ListingId },
}

impl Operation {
    /// Stable kebab-case name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ReadListings => "read-listings",
            Self::ReadListing { .. } => "read-listing-detail",
            Self::ReadReviewsForPlace { .. } => "read-reviews-for-place",
            Self::Authenticate(_) => "authenticate",
            Self::Register(_) => "register",
            Self::CreateReview(_) => "create-review",
            Self::DeleteReview { .. } => "delete-review",
            Self::DeleteListing { .. } => "delete-listing",
        }
    }

    /// Whether the operation mutates state on behalf of a subject.
    pub const fn requires_auth(&self) -> bool {
        matches!(
            self,
            Self::CreateReview(_) | Self::DeleteReview { .. } | Self::DeleteListing { .. }
        )
    }
}

/// Credential plus whatever profile the data source returned with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    /// Issued bearer token.
    pub credential: BearerCredential,
    /// Explicit profile fields from the response body.
    pub profile: SessionProfile,
}

/// Successful outcome of an [`Operation`].
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutput {
    /// Result of [`Operation::ReadListings`].
    Listings(Vec<Listing>),
    /// Result of [`Operation::ReadListing`].
    Listing(Listing),
    /// Result of [`Operation::ReadReviewsForPlace`].
    Reviews(Vec<Review>),
    /// Result of [`Operation::Authenticate`] and [`Operation::Register`].
    Authenticated(AuthGrant),
    /// Result of [`Operation::CreateReview`].
    ReviewCreated(Review),
    /// Result of the delete operations.
    Deleted,
}

impl OperationOutput {
    /// Variant name used in mismatch diagnostics.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Listings(_) => "listings",
            Self::Listing(_) => "listing",
            Self::Reviews(_) => "reviews",
            Self::Authenticated(_) => "authenticated",
            Self::ReviewCreated(_) => "review-created",
            Self::Deleted => "deleted",
        }
    }
}

/// Per-call dispatch options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Fail fast with `unauthenticated` when no session is active.
    pub requires_auth: bool,
}

impl DispatchOptions {
    /// Options derived from the operation's own requirements.
    pub const fn for_operation(operation: &Operation) -> Self {
        Self {
            requires_auth: operation.requires_auth(),
        }
    }
}
