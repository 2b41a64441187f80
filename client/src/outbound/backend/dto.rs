//! DTOs for decoding listings API responses.
//!
//! The backend has shipped several response shapes over time. Everything is
//! decoded here, once, with a fixed precedence when aliases collide:
//!
//! | Concept        | Precedence                                      |
//! |----------------|-------------------------------------------------|
//! | listing title  | `title` > `name`                                |
//! | nightly price  | `price` > `price_per_night` > `pricePerNight`   |
//! | review text    | `text` > `comment`                              |
//! | review author  | `user_id` > `author_id` > `user_name`           |
//! | token          | `access_token` > `accessToken` > `token`        |
//!
//! Collections are accepted bare or wrapped (`{places: [...]}`,
//! `{data: [...]}`, `{reviews: [...]}`). Items that cannot be mapped into
//! domain types are skipped with a warning rather than failing the page.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::domain::credential::BearerCredential;
use crate::domain::ids::{ListingId, ReviewId, SubjectId};
use crate::domain::listing::Listing;
use crate::domain::operation::AuthGrant;
use crate::domain::review::{Rating, Review};
use crate::domain::session::SessionProfile;

/// Request body for `POST /auth/login`.
#[derive(Debug, serde::Serialize)]
pub(super) struct LoginRequestDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
}

/// Request body for `POST /users`.
#[derive(Debug, serde::Serialize)]
pub(super) struct RegisterRequestDto<'a> {
    pub(super) first_name: &'a str,
    pub(super) last_name: &'a str,
    pub(super) email: &'a str,
    pub(super) password: &'a str,
}

/// Request body for `POST /reviews`.
#[derive(Debug, serde::Serialize)]
pub(super) struct CreateReviewRequestDto<'a> {
    pub(super) text: &'a str,
    pub(super) rating: u8,
    pub(super) place_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ListingDto {
    id: Option<Value>,
    title: Option<String>,
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    price: Option<Value>,
    price_per_night: Option<Value>,
    #[serde(rename = "pricePerNight")]
    price_per_night_camel: Option<Value>,
    owner_id: Option<Value>,
    #[serde(default)]
    amenities: Vec<Value>,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewDto {
    id: Option<Value>,
    place_id: Option<Value>,
    text: Option<String>,
    comment: Option<String>,
    rating: Option<Value>,
    user_id: Option<Value>,
    author_id: Option<Value>,
    user_name: Option<Value>,
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GrantDto {
    access_token: Option<String>,
    #[serde(rename = "accessToken")]
    access_token_camel: Option<String>,
    token: Option<String>,
    user: Option<UserDto>,
}

#[derive(Debug, Deserialize)]
struct UserDto {
    id: Option<Value>,
    first_name: Option<String>,
    last_name: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBodyDto {
    error: Option<String>,
    message: Option<String>,
}

/// Render a scalar identifier as text; numbers are accepted.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn integer(value: Option<&Value>) -> Option<i64> {
    let value = number(value)?;
    (value.fract() == 0.0).then_some(value as i64)
}

fn first_text<'a>(candidates: impl IntoIterator<Item = Option<&'a String>>) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
}

fn amenity_name(value: &Value) -> Option<String> {
    match value {
        Value::String(name) => Some(name.clone()),
        Value::Object(fields) => fields.get("name").and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}

impl ListingDto {
    fn into_domain(self) -> Result<Listing, String> {
        let id = scalar_text(self.id.as_ref()).ok_or("listing without id")?;
        let id = ListingId::new(id).map_err(|error| error.to_string())?;
        let title = first_text([self.title.as_ref(), self.name.as_ref()])
            .ok_or_else(|| format!("listing {id} without title"))?;
        let price = [
            self.price.as_ref(),
            self.price_per_night.as_ref(),
            self.price_per_night_camel.as_ref(),
        ]
        .into_iter()
        .find_map(number)
        .ok_or_else(|| format!("listing {id} without price"))?;

        let mut listing = Listing::new(id, title, price)
            .map_err(|error| error.to_string())?
            .with_amenities(self.amenities.iter().filter_map(amenity_name));
        if let Some(description) = self.description {
            listing = listing.with_description(description);
        }
        if let Some(owner) = scalar_text(self.owner_id.as_ref()) {
            listing = listing.with_owner(SubjectId::new(owner).map_err(|error| error.to_string())?);
        }
        if let Some(location) = first_text([self.location.as_ref()]) {
            listing = listing.with_location(location);
        }
        Ok(listing)
    }
}

impl ReviewDto {
    fn into_domain(self, fallback_place: Option<&ListingId>) -> Result<Review, String> {
        let id = scalar_text(self.id.as_ref()).ok_or("review without id")?;
        let id = ReviewId::new(id).map_err(|error| error.to_string())?;
        let place_id = match scalar_text(self.place_id.as_ref()) {
            Some(place) => ListingId::new(place).map_err(|error| error.to_string())?,
            None => fallback_place
                .cloned()
                .ok_or_else(|| format!("review {id} without place"))?,
        };
        let author = [
            self.user_id.as_ref(),
            self.author_id.as_ref(),
            self.user_name.as_ref(),
        ]
        .into_iter()
        .find_map(scalar_text)
        .ok_or_else(|| format!("review {id} without author"))?;
        let text = first_text([self.text.as_ref(), self.comment.as_ref()])
            .ok_or_else(|| format!("review {id} without text"))?;
        let rating = integer(self.rating.as_ref())
            .ok_or_else(|| format!("review {id} without integer rating"))?;
        let rating = Rating::try_new(rating).map_err(|error| error.to_string())?;

        let review = Review::new(
            id,
            place_id,
            SubjectId::new(author).map_err(|error| error.to_string())?,
            rating,
            text,
        );
        Ok(match self.created_at.as_deref().map(parse_timestamp) {
            Some(Some(created_at)) => review.with_created_at(created_at),
            _ => review,
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|stamp| stamp.with_timezone(&Utc))
        .ok()
}

/// Pull the array out of a bare or wrapped collection body.
fn collection(body: Value, wrappers: &[&str]) -> Result<Vec<Value>, String> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut fields) => wrappers
            .iter()
            .find_map(|key| match fields.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| format!("expected an array or one of {wrappers:?}")),
        other => Err(format!("expected an array, got {}", kind_of(&other))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn skip_invalid<T>(kind: &str, item: Result<T, String>) -> Option<T> {
    item.map_err(|reason| warn!(kind, reason = %reason, "skipping undecodable item"))
        .ok()
}

/// Decode a listings collection.
pub(super) fn decode_listings(body: Value) -> Result<Vec<Listing>, String> {
    Ok(collection(body, &["places", "data"])?
        .into_iter()
        .filter_map(|item| {
            let decoded = serde_json::from_value::<ListingDto>(item)
                .map_err(|error| error.to_string())
                .and_then(ListingDto::into_domain);
            skip_invalid("listing", decoded)
        })
        .collect())
}

/// Decode one listing; a wrapped `{place: {...}}` body is accepted.
pub(super) fn decode_listing(body: Value) -> Result<Listing, String> {
    let body = match body {
        Value::Object(mut fields) if fields.contains_key("place") => {
            fields.remove("place").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value::<ListingDto>(body)
        .map_err(|error| error.to_string())?
        .into_domain()
}

/// Decode the reviews of `place_id`.
pub(super) fn decode_reviews(body: Value, place_id: &ListingId) -> Result<Vec<Review>, String> {
    Ok(collection(body, &["reviews", "data"])?
        .into_iter()
        .filter_map(|item| {
            let decoded = serde_json::from_value::<ReviewDto>(item)
                .map_err(|error| error.to_string())
                .and_then(|dto| dto.into_domain(Some(place_id)));
            skip_invalid("review", decoded)
        })
        .collect())
}

/// Decode a freshly created review.
pub(super) fn decode_review(body: Value, place_id: &ListingId) -> Result<Review, String> {
    let body = match body {
        Value::Object(mut fields) if fields.contains_key("review") => {
            fields.remove("review").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value::<ReviewDto>(body)
        .map_err(|error| error.to_string())?
        .into_domain(Some(place_id))
}

/// Decode a login or registration response.
pub(super) fn decode_grant(body: Value) -> Result<AuthGrant, String> {
    let dto: GrantDto = serde_json::from_value(body).map_err(|error| error.to_string())?;
    let token = first_text([
        dto.access_token.as_ref(),
        dto.access_token_camel.as_ref(),
        dto.token.as_ref(),
    ])
    .ok_or("response carries no access token")?;
    let credential = BearerCredential::new(token).map_err(|error| error.to_string())?;
    let profile = dto.user.map(UserDto::into_profile).unwrap_or_default();
    Ok(AuthGrant {
        credential,
        profile,
    })
}

impl UserDto {
    fn into_profile(self) -> SessionProfile {
        let full_name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let display_name = if full_name.is_empty() {
            first_text([self.name.as_ref()]).map(str::to_owned)
        } else {
            Some(full_name)
        };
        SessionProfile {
            subject_id: scalar_text(self.id.as_ref()).and_then(|id| SubjectId::new(id).ok()),
            display_name,
        }
    }
}

/// Message from a structured `{error}` / `{message}` error body.
pub(super) fn error_message(body: &[u8]) -> Option<String> {
    let dto: ErrorBodyDto = serde_json::from_slice(body).ok()?;
    first_text([dto.error.as_ref(), dto.message.as_ref()]).map(str::to_owned)
}
