//! Rentable listings and the client-side listing filter.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{ListingId, SubjectId};

/// Validation errors raised when constructing a [`Listing`].
#[derive(Debug, Clone, PartialEq)]
pub enum ListingValidationError {
    /// Title was blank once trimmed.
    BlankTitle,
    /// Price was negative, NaN, or infinite.
    InvalidPrice { value: f64 },
}

impl fmt::Display for ListingValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "listing title must not be blank"),
            Self::InvalidPrice { value } => {
                write!(f, "price per night must be finite and non-negative, got {value}")
            }
        }
    }
}

impl std::error::Error for ListingValidationError {}

/// A place that can be rented.
///
/// ## Invariants
/// - `title` is trimmed and non-empty.
/// - `price_per_night` is finite and `>= 0`.
/// - `amenities` is an ordered set of trimmed, non-empty names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ListingDto", into = "ListingDto")]
pub struct Listing {
    id: ListingId,
    title: String,
    description: String,
    price_per_night: f64,
    owner_id: Option<SubjectId>,
    amenities: BTreeSet<String>,
    location: Option<String>,
}

impl Listing {
    /// Construct a listing with an empty description and no amenities.
    ///
    /// # Examples
    /// ```
    /// use listings_client::domain::{Listing, ListingId};
    ///
    /// let id = ListingId::new("p1").unwrap();
    /// let listing = Listing::new(id, "Cozy Cabin", 100.0)
    ///     .unwrap()
    ///     .with_amenities(["Fireplace", "Kitchen"]);
    /// assert!(listing.has_amenity("fireplace"));
    /// ```
    pub fn new(
        id: ListingId,
        title: impl Into<String>,
        price_per_night: f64,
    ) -> Result<Self, ListingValidationError> {
        let title = title.into();
        let title = title.trim();
        if title.is_empty() {
            return Err(ListingValidationError::BlankTitle);
        }
        if !price_per_night.is_finite() || price_per_night < 0.0 {
            return Err(ListingValidationError::InvalidPrice {
                value: price_per_night,
            });
        }
        Ok(Self {
            id,
            title: title.to_owned(),
            description: String::new(),
            price_per_night,
            owner_id: None,
            amenities: BTreeSet::new(),
            location: None,
        })
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the owning subject.
    pub fn with_owner(mut self, owner_id: SubjectId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Replace the amenity set; blank names are dropped.
    pub fn with_amenities<I, S>(mut self, amenities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.amenities = amenities
            .into_iter()
            .map(|name| name.into().trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect();
        self
    }

    /// Set the free-form location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        let location = location.into();
        let location = location.trim();
        self.location = (!location.is_empty()).then(|| location.to_owned());
        self
    }

    /// Listing identifier.
    pub fn id(&self) -> &ListingId {
        &self.id
    }

    /// Display title.
    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Long description; may be empty.
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Nightly price.
    pub const fn price_per_night(&self) -> f64 {
        self.price_per_night
    }

    /// Owning subject, if reported.
    pub fn owner_id(&self) -> Option<&SubjectId> {
        self.owner_id.as_ref()
    }

    /// Ordered amenity names.
    pub fn amenities(&self) -> &BTreeSet<String> {
        &self.amenities
    }

    /// Location, if reported.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Case-insensitive amenity lookup.
    pub fn has_amenity(&self, name: &str) -> bool {
        let needle = name.trim();
        self.amenities
            .iter()
            .any(|amenity| amenity.eq_ignore_ascii_case(needle))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingDto {
    id: ListingId,
    title: String,
    #[serde(default)]
    description: String,
    price_per_night: f64,
    #[serde(default)]
    owner_id: Option<SubjectId>,
    #[serde(default)]
    amenities: BTreeSet<String>,
    #[serde(default)]
    location: Option<String>,
}

impl From<Listing> for ListingDto {
    fn from(value: Listing) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            price_per_night: value.price_per_night,
            owner_id: value.owner_id,
            amenities: value.amenities,
            location: value.location,
        }
    }
}

impl TryFrom<ListingDto> for Listing {
    type Error = ListingValidationError;

    fn try_from(value: ListingDto) -> Result<Self, Self::Error> {
        let mut listing = Self::new(value.id, value.title, value.price_per_night)?
            .with_description(value.description)
            .with_amenities(value.amenities);
        listing.owner_id = value.owner_id;
        if let Some(location) = value.location {
            listing = listing.with_location(location);
        }
        Ok(listing)
    }
}

/// Client-side filter over listings.
///
/// Price uses maximum-threshold semantics: a listing matches when its nightly
/// price is at most the threshold. Non-finite thresholds are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    max_price: Option<f64>,
    amenity: Option<String>,
}

impl ListingFilter {
    /// Filter that matches every listing.
    pub fn any() -> Self {
        Self::default()
    }

    /// Require `price_per_night <= max_price`.
    pub fn with_max_price(mut self, max_price: f64) -> Self {
        self.max_price = max_price.is_finite().then_some(max_price);
        self
    }

    /// Require an amenity, compared case-insensitively.
    pub fn with_amenity(mut self, amenity: impl Into<String>) -> Self {
        let amenity = amenity.into();
        let amenity = amenity.trim();
        self.amenity = (!amenity.is_empty()).then(|| amenity.to_owned());
        self
    }

    /// Whether `listing` passes every configured criterion.
    pub fn matches(&self, listing: &Listing) -> bool {
        let price_ok = self
            .max_price
            .is_none_or(|max| listing.price_per_night() <= max);
        let amenity_ok = self
            .amenity
            .as_deref()
            .is_none_or(|amenity| listing.has_amenity(amenity));
        price_ok && amenity_ok
    }

    /// Keep the matching listings, preserving order.
    pub fn apply(&self, listings: &[Listing]) -> Vec<Listing> {
        listings
            .iter()
            .filter(|listing| self.matches(listing))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::{fixture, rstest};

    fn listing(id: &str, price: f64, amenities: &[&str]) -> Listing {
        Listing::new(ListingId::new(id).expect("id"), format!("Listing {id}"), price)
            .expect("listing")
            .with_amenities(amenities.iter().copied())
    }

    #[fixture]
    fn catalogue() -> Vec<Listing> {
        vec![
            listing("p1", 150.0, &["WiFi", "Sea view"]),
            listing("p2", 100.0, &["Fireplace"]),
            listing("p3", 200.0, &["WiFi", "Elevator"]),
        ]
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn rejects_invalid_prices(#[case] price: f64) {
        let result = Listing::new(ListingId::new("x").expect("id"), "X", price);
        assert!(matches!(
            result,
            Err(ListingValidationError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn rejects_blank_titles() {
        let result = Listing::new(ListingId::new("x").expect("id"), "  ", 10.0);
        assert_eq!(result, Err(ListingValidationError::BlankTitle));
    }

    #[rstest]
    #[case(ListingFilter::any(), vec!["p1", "p2", "p3"])]
    #[case(ListingFilter::any().with_max_price(150.0), vec!["p1", "p2"])]
    #[case(ListingFilter::any().with_max_price(99.0), vec![])]
    #[case(ListingFilter::any().with_amenity("wifi"), vec!["p1", "p3"])]
    #[case(ListingFilter::any().with_max_price(160.0).with_amenity("WIFI"), vec!["p1"])]
    #[case(ListingFilter::any().with_max_price(f64::NAN), vec!["p1", "p2", "p3"])]
    fn filter_applies_threshold_and_amenity(
        catalogue: Vec<Listing>,
        #[case] filter: ListingFilter,
        #[case] expected: Vec<&str>,
    ) {
        let ids: Vec<String> = filter
            .apply(&catalogue)
            .iter()
            .map(|listing| listing.id().to_string())
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn persisted_form_round_trips() {
        let original = listing("p9", 80.0, &["Kitchen"])
            .with_description("Quiet flat")
            .with_location("Lisbon");
        let json = serde_json::to_string(&original).expect("serialise");
        let restored: Listing = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(restored, original);
    }
}
