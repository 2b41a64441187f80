//! Local cache of listings and their reviews.
//!
//! Reads refresh the cache; successful writes patch it. The submission
//! pipeline reads the per-place quota from here. The cache is mirrored to
//! the `listings-cache` slot on a best-effort basis.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ids::{ListingId, ReviewId};
use super::listing::Listing;
use super::ports::SlotStorage;
use super::review::Review;

/// Storage slot holding the serialised cache.
pub const LISTINGS_CACHE_SLOT: &str = "listings-cache";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheSnapshot {
    #[serde(default)]
    listings: Vec<Listing>,
    #[serde(default)]
    reviews: BTreeMap<ListingId, Vec<Review>>,
}

#[derive(Debug, Default)]
struct CacheState {
    snapshot: CacheSnapshot,
    hydrated: bool,
}

/// In-memory listing and review cache with durable mirroring.
pub struct ListingCache {
    storage: Arc<dyn SlotStorage>,
    state: Mutex<CacheState>,
}

impl ListingCache {
    /// Build an empty cache over `storage`.
    pub fn new(storage: Arc<dyn SlotStorage>) -> Self {
        Self {
            storage,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.hydrated {
            state.snapshot = self.restore();
            state.hydrated = true;
        }
        state
    }

    fn restore(&self) -> CacheSnapshot {
        let raw = match self.storage.read(LISTINGS_CACHE_SLOT) {
            Ok(Some(raw)) => raw,
            Ok(None) => return CacheSnapshot::default(),
            Err(error) => {
                warn!(error = %error, "failed to read listings cache");
                return CacheSnapshot::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|error| {
            warn!(error = %error, "discarding corrupt listings cache");
            CacheSnapshot::default()
        })
    }

    fn persist(&self, snapshot: &CacheSnapshot) {
        let written = serde_json::to_string(snapshot)
            .map_err(|error| error.to_string())
            .and_then(|json| {
                self.storage
                    .write(LISTINGS_CACHE_SLOT, &json)
                    .map_err(|error| error.to_string())
            });
        if let Err(error) = written {
            warn!(error = %error, "failed to persist listings cache");
        }
    }

    fn update<R>(&self, change: impl FnOnce(&mut CacheSnapshot) -> R) -> R {
        let mut state = self.lock();
        let outcome = change(&mut state.snapshot);
        self.persist(&state.snapshot);
        outcome
    }

    /// Replace every cached listing, keeping cached reviews.
    pub fn replace_listings(&self, listings: Vec<Listing>) {
        self.update(|snapshot| snapshot.listings = listings);
    }

    /// Insert or replace one listing.
    pub fn upsert_listing(&self, listing: Listing) {
        self.update(|snapshot| {
            match snapshot
                .listings
                .iter_mut()
                .find(|cached| cached.id() == listing.id())
            {
                Some(cached) => *cached = listing,
                None => snapshot.listings.push(listing),
            }
        });
    }

    /// Every cached listing in fetch order.
    pub fn listings(&self) -> Vec<Listing> {
        self.lock().snapshot.listings.clone()
    }

    /// One cached listing.
    pub fn listing(&self, id: &ListingId) -> Option<Listing> {
        self.lock()
            .snapshot
            .listings
            .iter()
            .find(|listing| listing.id() == id)
            .cloned()
    }

    /// Replace the cached reviews of one place.
    pub fn replace_reviews(&self, place_id: &ListingId, reviews: Vec<Review>) {
        self.update(|snapshot| {
            snapshot.reviews.insert(place_id.clone(), reviews);
        });
    }

    /// Append a freshly created review.
    pub fn append_review(&self, review: Review) {
        self.update(|snapshot| {
            snapshot
                .reviews
                .entry(review.place_id().clone())
                .or_default()
                .push(review);
        });
    }

    /// Cached reviews of one place.
    pub fn reviews_for(&self, place_id: &ListingId) -> Vec<Review> {
        self.lock()
            .snapshot
            .reviews
            .get(place_id)
            .cloned()
            .unwrap_or_default()
    }

    /// One cached review.
    pub fn review(&self, id: &ReviewId) -> Option<Review> {
        self.lock()
            .snapshot
            .reviews
            .values()
            .flatten()
            .find(|review| review.id() == id)
            .cloned()
    }

    /// Drop a review; returns whether it was cached.
    pub fn remove_review(&self, id: &ReviewId) -> bool {
        self.update(|snapshot| {
            let mut removed = false;
            for reviews in snapshot.reviews.values_mut() {
                let before = reviews.len();
                reviews.retain(|review| review.id() != id);
                removed |= reviews.len() != before;
            }
            removed
        })
    }

    /// Drop a listing and its reviews; returns whether it was cached.
    pub fn remove_listing(&self, id: &ListingId) -> bool {
        self.update(|snapshot| {
            let before = snapshot.listings.len();
            snapshot.listings.retain(|listing| listing.id() != id);
            snapshot.reviews.remove(id);
            snapshot.listings.len() != before
        })
    }

    /// Forget everything, including the persisted copy.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.snapshot = CacheSnapshot::default();
        if let Err(error) = self.storage.remove(LISTINGS_CACHE_SLOT) {
            warn!(error = %error, "failed to remove listings cache");
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ids::SubjectId;
    use crate::domain::ports::{MockSlotStorage, SlotStorageError};
    use crate::domain::review::Rating;
    use crate::outbound::storage::MemorySlotStorage;
    use rstest::{fixture, rstest};

    fn listing(id: &str) -> Listing {
        Listing::new(ListingId::new(id).expect("id"), format!("Place {id}"), 90.0)
            .expect("listing")
    }

    fn review(id: &str, place: &str) -> Review {
        Review::new(
            ReviewId::new(id).expect("id"),
            ListingId::new(place).expect("id"),
            SubjectId::new("u1").expect("id"),
            Rating::try_new(5).expect("rating"),
            "Would stay again, lovely hosts.",
        )
    }

    #[fixture]
    fn storage() -> Arc<MemorySlotStorage> {
        Arc::new(MemorySlotStorage::default())
    }

    #[rstest]
    fn upsert_replaces_matching_listing(storage: Arc<MemorySlotStorage>) {
        let cache = ListingCache::new(storage);
        cache.replace_listings(vec![listing("p1"), listing("p2")]);
        let renamed = Listing::new(ListingId::new("p1").expect("id"), "Renamed", 50.0)
            .expect("listing");
        cache.upsert_listing(renamed.clone());
        cache.upsert_listing(listing("p3"));

        let ids: Vec<String> = cache.listings().iter().map(|l| l.id().to_string()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
        assert_eq!(
            cache.listing(&ListingId::new("p1").expect("id")),
            Some(renamed)
        );
    }

    #[rstest]
    fn reviews_are_grouped_by_place(storage: Arc<MemorySlotStorage>) {
        let cache = ListingCache::new(storage);
        let p1 = ListingId::new("p1").expect("id");
        cache.replace_reviews(&p1, vec![review("r1", "p1")]);
        cache.append_review(review("r2", "p1"));
        cache.append_review(review("r3", "p2"));

        assert_eq!(cache.reviews_for(&p1).len(), 2);
        assert!(cache.review(&ReviewId::new("r3").expect("id")).is_some());
        assert!(cache.remove_review(&ReviewId::new("r1").expect("id")));
        assert!(!cache.remove_review(&ReviewId::new("missing").expect("id")));
        assert_eq!(cache.reviews_for(&p1).len(), 1);
    }

    #[rstest]
    fn removing_a_listing_drops_its_reviews(storage: Arc<MemorySlotStorage>) {
        let cache = ListingCache::new(storage);
        let p1 = ListingId::new("p1").expect("id");
        cache.replace_listings(vec![listing("p1")]);
        cache.append_review(review("r1", "p1"));
        assert!(cache.remove_listing(&p1));
        assert!(cache.reviews_for(&p1).is_empty());
        assert!(cache.listings().is_empty());
    }

    #[rstest]
    fn contents_survive_a_new_cache(storage: Arc<MemorySlotStorage>) {
        ListingCache::new(storage.clone()).replace_listings(vec![listing("p1")]);
        let restored = ListingCache::new(storage);
        assert_eq!(restored.listings(), vec![listing("p1")]);
    }

    #[rstest]
    fn corrupt_persisted_cache_starts_empty(storage: Arc<MemorySlotStorage>) {
        storage
            .write(LISTINGS_CACHE_SLOT, "{\"listings\": 5}")
            .expect("seed");
        assert!(ListingCache::new(storage).listings().is_empty());
    }

    #[test]
    fn storage_failures_keep_the_memory_copy() {
        let mut storage = MockSlotStorage::new();
        storage.expect_read().returning(|_| Ok(None));
        storage
            .expect_write()
            .returning(|_, _| Err(SlotStorageError::io("disk full")));
        let cache = ListingCache::new(Arc::new(storage));
        cache.replace_listings(vec![listing("p1")]);
        assert_eq!(cache.listings().len(), 1);
    }

    #[rstest]
    fn clear_forgets_persisted_copy(storage: Arc<MemorySlotStorage>) {
        let cache = ListingCache::new(storage.clone());
        cache.replace_listings(vec![listing("p1")]);
        cache.clear();
        assert!(cache.listings().is_empty());
        assert_eq!(storage.read(LISTINGS_CACHE_SLOT).expect("read"), None);
    }
}
