//! Local permission rules evaluated before any mutating request.
//!
//! The gate is pure. It never consults the network and is re-evaluated on
//! every attempt, so a quota reached between attempts is caught.

use super::ids::ListingId;
use super::review::Review;
use super::session::Session;
use super::validation::{Field, ValidationResult};

/// Default per-place review quota for non-admin subjects.
pub const DEFAULT_REVIEW_QUOTA: usize = 3;

/// Evaluates review and deletion permissions for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionGate {
    review_quota: usize,
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self {
            review_quota: DEFAULT_REVIEW_QUOTA,
        }
    }
}

impl PermissionGate {
    /// Gate with a custom per-place quota.
    pub const fn with_review_quota(review_quota: usize) -> Self {
        Self { review_quota }
    }

    /// Whether `session` may post another review on `place_id`.
    ///
    /// `existing_reviews` may hold reviews of any place; only those on
    /// `place_id` by the session's subject count toward the quota.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use listings_client::domain::{BearerCredential, ListingId, PermissionGate, Session};
    ///
    /// let opaque = BearerCredential::new("opaque").unwrap();
    /// let session = Session::from_credential(opaque, Utc::now());
    /// let place = ListingId::new("p1").unwrap();
    /// let result = PermissionGate::default().can_submit_review(&session, &place, &[]);
    /// assert!(!result.is_accepted());
    /// ```
    pub fn can_submit_review(
        &self,
        session: &Session,
        place_id: &ListingId,
        existing_reviews: &[Review],
    ) -> ValidationResult {
        let mut result = ValidationResult::pass();
        let (Some(subject_id), Some(_)) = (session.subject_id(), session.display_name()) else {
            result.push(Field::Profile, "incomplete");
            return result;
        };
        if session.is_admin() {
            return result;
        }

        let authored = existing_reviews
            .iter()
            .filter(|review| review.place_id() == place_id && review.author_id() == subject_id)
            .count();
        if authored >= self.review_quota {
            result.push(Field::Quota, "limit reached");
        }
        result
    }

    /// Whether `session` may delete `review`: its author or an admin.
    pub fn can_delete_review(&self, session: &Session, review: &Review) -> ValidationResult {
        let owns = session
            .subject_id()
            .is_some_and(|subject| subject == review.author_id());
        Self::require(owns || session.is_admin(), "not owner")
    }

    /// Whether `session` may delete a listing: admins only.
    pub fn can_delete_listing(&self, session: &Session) -> ValidationResult {
        Self::require(session.is_admin(), "admin required")
    }

    fn require(allowed: bool, reason: &str) -> ValidationResult {
        let mut result = ValidationResult::pass();
        if !allowed {
            result.push(Field::Permission, reason);
        }
        result
    }
}
