//! Simulated listings backend.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::seed::{self, Account};
use crate::domain::SharedClock;
use crate::domain::auth::{LoginCredentials, Registration};
use crate::domain::credential::{BearerCredential, TokenClaims, synthesize_unsigned_token};
use crate::domain::ids::{ListingId, ReviewId, SubjectId};
use crate::domain::listing::Listing;
use crate::domain::operation::{AuthGrant, Operation, OperationOutput};
use crate::domain::ports::{DataSource, DataSourceError};
use crate::domain::review::{Review, ReviewDraft};
use crate::domain::session::SessionProfile;

#[derive(Default)]
struct SimulationState {
    listings: Vec<Listing>,
    reviews: Vec<Review>,
    accounts: Vec<Account>,
}

/// In-memory data source seeded with the development fixtures.
///
/// Tokens are unsigned, so authority is always re-checked against the
/// account table rather than trusted from the claims.
pub struct SimulationStore {
    state: Mutex<SimulationState>,
    clock: SharedClock,
}

fn rejected(status: u16, message: &str) -> DataSourceError {
    DataSourceError::rejected(status, message)
}

impl SimulationStore {
    /// Build a store holding the seeded listings and accounts.
    pub fn new(clock: SharedClock) -> Self {
        let listings = seed::listings().unwrap_or_else(|error| {
            warn!(error = %error, "simulation listing seed rejected");
            Vec::new()
        });
        let accounts = seed::accounts().unwrap_or_else(|error| {
            warn!(error = %error, "simulation account seed rejected");
            Vec::new()
        });
        Self {
            state: Mutex::new(SimulationState {
                listings,
                reviews: Vec::new(),
                accounts,
            }),
            clock,
        }
    }

    /// Build a store with no listings, reviews, or accounts.
    pub fn empty(clock: SharedClock) -> Self {
        Self {
            state: Mutex::new(SimulationState::default()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimulationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn grant(account: &Account) -> Result<AuthGrant, DataSourceError> {
        let claims = TokenClaims {
            user_id: Some(account.id.to_string()),
            email: Some(account.email.clone()),
            name: Some(account.display_name()),
            is_admin: account.is_admin,
            ..TokenClaims::default()
        };
        let credential = synthesize_unsigned_token(&claims)
            .map_err(|error| DataSourceError::fault(format!("token synthesis failed: {error}")))?;
        Ok(AuthGrant {
            credential,
            profile: SessionProfile {
                subject_id: Some(account.id.clone()),
                display_name: Some(account.display_name()),
            },
        })
    }

    fn authenticate(
        state: &SimulationState,
        credentials: &LoginCredentials,
    ) -> Result<OperationOutput, DataSourceError> {
        if credentials.email().is_empty() || credentials.password().is_empty() {
            return Err(rejected(400, "email and password required"));
        }
        let account = state
            .accounts
            .iter()
            .find(|account| {
                account.email == credentials.email()
                    && account.password.as_str() == credentials.password()
            })
            .ok_or_else(|| rejected(401, "Invalid email or password"))?;
        Self::grant(account).map(OperationOutput::Authenticated)
    }

    fn register(
        state: &mut SimulationState,
        registration: &Registration,
    ) -> Result<OperationOutput, DataSourceError> {
        let credentials = registration.credentials();
        let fields = [
            registration.first_name(),
            registration.last_name(),
            credentials.email(),
            credentials.password(),
        ];
        if fields.iter().any(|field| field.trim().is_empty()) {
            return Err(rejected(400, "Missing fields"));
        }
        if state
            .accounts
            .iter()
            .any(|account| account.email == credentials.email())
        {
            return Err(rejected(400, "Email already registered"));
        }
        let id = SubjectId::new(Uuid::new_v4().to_string())
            .map_err(|error| DataSourceError::fault(error.to_string()))?;
        let account = Account {
            id,
            first_name: registration.first_name().to_owned(),
            last_name: registration.last_name().to_owned(),
            email: credentials.email().to_owned(),
            password: Zeroizing::new(credentials.password().to_owned()),
            is_admin: false,
        };
        let grant = Self::grant(&account)?;
        state.accounts.push(account);
        Ok(OperationOutput::Authenticated(grant))
    }

    /// Resolve the caller from the bearer's claims against the account table.
    fn caller<'a>(
        state: &'a SimulationState,
        bearer: Option<&BearerCredential>,
    ) -> Result<&'a Account, DataSourceError> {
        let subject = bearer
            .and_then(BearerCredential::claims)
            .and_then(|claims| claims.subject())
            .ok_or_else(|| rejected(401, "Authentication required"))?;
        state
            .accounts
            .iter()
            .find(|account| account.id == subject)
            .ok_or_else(|| rejected(401, "Authentication required"))
    }

    fn place_exists(state: &SimulationState, id: &ListingId) -> Result<(), DataSourceError> {
        if state.listings.iter().any(|listing| listing.id() == id) {
            Ok(())
        } else {
            Err(rejected(404, "Place not found"))
        }
    }

    fn create_review(
        &self,
        state: &mut SimulationState,
        draft: &ReviewDraft,
        bearer: Option<&BearerCredential>,
    ) -> Result<OperationOutput, DataSourceError> {
        let author = Self::caller(state, bearer)?.id.clone();
        let text = draft.text.trim();
        if text.is_empty() {
            return Err(rejected(400, "Missing fields"));
        }
        Self::place_exists(state, &draft.place_id)?;
        let duplicate = state.reviews.iter().any(|review| {
            review.author_id() == &author
                && review.place_id() == &draft.place_id
                && review.text() == text
                && review.rating() == draft.rating
        });
        if duplicate {
            return Err(rejected(409, "Duplicate review detected"));
        }
        let id = ReviewId::new(Uuid::new_v4().to_string())
            .map_err(|error| DataSourceError::fault(error.to_string()))?;
        let review = Review::new(id, draft.place_id.clone(), author, draft.rating, text)
            .with_created_at(self.clock.utc());
        state.reviews.push(review.clone());
        Ok(OperationOutput::ReviewCreated(review))
    }

    fn delete_review(
        state: &mut SimulationState,
        id: &ReviewId,
        bearer: Option<&BearerCredential>,
    ) -> Result<OperationOutput, DataSourceError> {
        let caller = Self::caller(state, bearer)?;
        let (caller_id, caller_is_admin) = (caller.id.clone(), caller.is_admin);
        let position = state
            .reviews
            .iter()
            .position(|review| review.id() == id)
            .ok_or_else(|| rejected(404, "Review not found"))?;
        if !caller_is_admin && state.reviews[position].author_id() != &caller_id {
            return Err(rejected(403, "Unauthorized action"));
        }
        state.reviews.remove(position);
        Ok(OperationOutput::Deleted)
    }

    fn delete_listing(
        state: &mut SimulationState,
        id: &ListingId,
        bearer: Option<&BearerCredential>,
    ) -> Result<OperationOutput, DataSourceError> {
        if !Self::caller(state, bearer)?.is_admin {
            return Err(rejected(403, "Admin privileges required"));
        }
        Self::place_exists(state, id)?;
        state.listings.retain(|listing| listing.id() != id);
        state.reviews.retain(|review| review.place_id() != id);
        Ok(OperationOutput::Deleted)
    }
}

#[async_trait]
impl DataSource for SimulationStore {
    async fn execute(
        &self,
        operation: &Operation,
        bearer: Option<BearerCredential>,
    ) -> Result<OperationOutput, DataSourceError> {
        debug!(operation = operation.name(), "simulating operation");
        let bearer = bearer.as_ref();
        let mut state = self.lock();
        match operation {
            Operation::ReadListings => Ok(OperationOutput::Listings(state.listings.clone())),
            Operation::ReadListing { id } => state
                .listings
                .iter()
                .find(|listing| listing.id() == id)
                .cloned()
                .map(OperationOutput::Listing)
                .ok_or_else(|| rejected(404, "Place not found")),
            Operation::ReadReviewsForPlace { place_id } => {
                Self::place_exists(&state, place_id)?;
                Ok(OperationOutput::Reviews(
                    state
                        .reviews
                        .iter()
                        .filter(|review| review.place_id() == place_id)
                        .cloned()
                        .collect(),
                ))
            }
            Operation::Authenticate(credentials) => Self::authenticate(&state, credentials),
            Operation::Register(registration) => Self::register(&mut state, registration),
            Operation::CreateReview(draft) => self.create_review(&mut state, draft, bearer),
            Operation::DeleteReview { id } => Self::delete_review(&mut state, id, bearer),
            Operation::DeleteListing { id } => Self::delete_listing(&mut state, id, bearer),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Status semantics of the in-memory store.

    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::review::Rating;
    use crate::domain::session::{Role, Session};
    use crate::outbound::simulation::{ADMIN_EMAIL, ADMIN_PASSWORD, DEMO_EMAIL, DEMO_PASSWORD};
    use crate::test_support::MutableClock;

    #[fixture]
    fn store() -> SimulationStore {
        let now = Utc
            .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        SimulationStore::new(Arc::new(MutableClock::new(now)))
    }

    fn p(id: &str) -> ListingId {
        ListingId::new(id).expect("id")
    }

    fn draft(place: &str, text: &str) -> ReviewDraft {
        ReviewDraft {
            place_id: p(place),
            text: text.to_owned(),
            rating: Rating::try_new(4).expect("rating"),
        }
    }

    async fn sign_in(store: &SimulationStore, email: &str, password: &str) -> BearerCredential {
        let credentials = LoginCredentials::try_from_parts(email, password).expect("credentials");
        match store
            .execute(&Operation::Authenticate(credentials), None)
            .await
            .expect("login")
        {
            OperationOutput::Authenticated(grant) => grant.credential,
            other => panic!("expected a grant, got {other:?}"),
        }
    }

    fn status(error: DataSourceError) -> u16 {
        match error {
            DataSourceError::Rejected { status, .. } => status,
            other => panic!("expected a rejection, got {other:?}"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn seeds_four_places_with_amenities(store: SimulationStore) {
        let OperationOutput::Listings(listings) = store
            .execute(&Operation::ReadListings, None)
            .await
            .expect("listings")
        else {
            panic!("expected listings");
        };
        let titles: Vec<&str> = listings.iter().map(Listing::title).collect();
        assert_eq!(
            titles,
            vec![
                "Beautiful Beach House",
                "Cozy Cabin",
                "Modern Apartment",
                "Beautiful Beach"
            ]
        );
        assert!(listings[1].has_amenity("Fireplace"));
        assert_eq!(listings[2].price_per_night(), 200.0);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_places_are_not_found(store: SimulationStore) {
        let detail = store
            .execute(&Operation::ReadListing { id: p("p99") }, None)
            .await
            .expect_err("missing");
        assert_eq!(status(detail), 404);
        let reviews = store
            .execute(&Operation::ReadReviewsForPlace { place_id: p("p99") }, None)
            .await
            .expect_err("missing");
        assert_eq!(status(reviews), 404);
    }

    #[rstest]
    #[case(ADMIN_EMAIL, ADMIN_PASSWORD, Role::Admin)]
    #[case(DEMO_EMAIL, DEMO_PASSWORD, Role::User)]
    #[tokio::test]
    async fn seeded_accounts_sign_in_with_roles(
        store: SimulationStore,
        #[case] email: &str,
        #[case] password: &str,
        #[case] role: Role,
    ) {
        let credential = sign_in(&store, email, password).await;
        let session = Session::from_credential(credential, Utc::now());
        assert_eq!(session.role(), role);
        assert!(session.subject_id().is_some());
        assert!(session.display_name().is_some_and(|name| name.ends_with("User")));
    }

    #[rstest]
    #[tokio::test]
    async fn wrong_password_is_unauthorised(store: SimulationStore) {
        let credentials =
            LoginCredentials::try_from_parts(DEMO_EMAIL, "nope").expect("credentials");
        let error = store
            .execute(&Operation::Authenticate(credentials), None)
            .await
            .expect_err("rejected");
        assert_eq!(status(error), 401);
    }

    #[rstest]
    #[tokio::test]
    async fn registration_signs_in_and_rejects_duplicates(store: SimulationStore) {
        let registration =
            Registration::try_from_parts("Ada", "Lovelace", "ada@example.com", "engine")
                .expect("registration");
        let output = store
            .execute(&Operation::Register(registration.clone()), None)
            .await
            .expect("registered");
        let OperationOutput::Authenticated(grant) = output else {
            panic!("expected a grant");
        };
        assert_eq!(grant.profile.display_name.as_deref(), Some("Ada Lovelace"));

        let again = store
            .execute(&Operation::Register(registration), None)
            .await
            .expect_err("duplicate");
        assert_eq!(status(again), 400);
        sign_in(&store, "ada@example.com", "engine").await;
    }

    #[rstest]
    #[tokio::test]
    async fn review_creation_requires_a_known_caller(store: SimulationStore) {
        let text = "Lovely cabin, warm fire.";
        let error = store
            .execute(&Operation::CreateReview(draft("p2", text)), None)
            .await
            .expect_err("no token");
        assert_eq!(status(error), 401);

        let forged = synthesize_unsigned_token(&TokenClaims {
            user_id: Some("ghost".to_owned()),
            is_admin: true,
            ..TokenClaims::default()
        })
        .expect("token");
        let error = store
            .execute(&Operation::CreateReview(draft("p2", text)), Some(forged))
            .await
            .expect_err("unknown subject");
        assert_eq!(status(error), 401);
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_reviews_conflict(store: SimulationStore) {
        let bearer = sign_in(&store, DEMO_EMAIL, DEMO_PASSWORD).await;
        let text = "Lovely cabin, warm fire.";
        let created = store
            .execute(&Operation::CreateReview(draft("p2", text)), Some(bearer.clone()))
            .await
            .expect("created");
        let OperationOutput::ReviewCreated(review) = created else {
            panic!("expected a review");
        };
        assert!(review.created_at().is_some());
        assert_eq!(review.place_id(), &p("p2"));

        let again = store
            .execute(&Operation::CreateReview(draft("p2", text)), Some(bearer.clone()))
            .await
            .expect_err("duplicate");
        assert_eq!(status(again), 409);

        let missing_place = store
            .execute(&Operation::CreateReview(draft("p99", text)), Some(bearer))
            .await
            .expect_err("unknown place");
        assert_eq!(status(missing_place), 404);
    }

    #[rstest]
    #[tokio::test]
    async fn only_owners_and_admins_delete_reviews(store: SimulationStore) {
        let demo = sign_in(&store, DEMO_EMAIL, DEMO_PASSWORD).await;
        let admin = sign_in(&store, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let OperationOutput::ReviewCreated(review) = store
            .execute(
                &Operation::CreateReview(draft("p1", "Admin review here.")),
                Some(admin.clone()),
            )
            .await
            .expect("created")
        else {
            panic!("expected a review");
        };
        let delete = Operation::DeleteReview {
            id: review.id().clone(),
        };

        let forbidden = store
            .execute(&delete, Some(demo))
            .await
            .expect_err("not owner");
        assert_eq!(status(forbidden), 403);
        assert_eq!(
            store.execute(&delete, Some(admin.clone())).await.expect("deleted"),
            OperationOutput::Deleted
        );
        let gone = store.execute(&delete, Some(admin)).await.expect_err("gone");
        assert_eq!(status(gone), 404);
    }

    #[rstest]
    #[tokio::test]
    async fn only_admins_delete_listings(store: SimulationStore) {
        let demo = sign_in(&store, DEMO_EMAIL, DEMO_PASSWORD).await;
        let admin = sign_in(&store, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let delete = Operation::DeleteListing { id: p("p4") };

        let forbidden = store
            .execute(&delete, Some(demo))
            .await
            .expect_err("not admin");
        assert_eq!(status(forbidden), 403);
        store
            .execute(&delete, Some(admin))
            .await
            .expect("deleted");
        let OperationOutput::Listings(listings) = store
            .execute(&Operation::ReadListings, None)
            .await
            .expect("listings")
        else {
            panic!("expected listings");
        };
        assert_eq!(listings.len(), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn empty_store_has_no_accounts() {
        let store = SimulationStore::empty(Arc::new(MutableClock::new(Utc::now())));
        let credentials =
            LoginCredentials::try_from_parts(ADMIN_EMAIL, ADMIN_PASSWORD).expect("credentials");
        let error = store
            .execute(&Operation::Authenticate(credentials), None)
            .await
            .expect_err("no accounts");
        assert_eq!(status(error), 401);
    }
}
