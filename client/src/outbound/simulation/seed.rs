//! Seed data matching the development server.

use zeroize::Zeroizing;

use crate::domain::ids::{ListingId, SubjectId};
use crate::domain::listing::{Listing, ListingValidationError};

/// Email of the seeded administrator.
pub const ADMIN_EMAIL: &str = "admin@example.com";
/// Password of the seeded administrator.
pub const ADMIN_PASSWORD: &str = "AdminPass123";
/// Email of the seeded regular account.
pub const DEMO_EMAIL: &str = "demo@example.com";
/// Password of the seeded regular account.
pub const DEMO_PASSWORD: &str = "DemoPass123";

/// One row of the simulated account table.
#[derive(Clone)]
pub(super) struct Account {
    pub(super) id: SubjectId,
    pub(super) first_name: String,
    pub(super) last_name: String,
    pub(super) email: String,
    pub(super) password: Zeroizing<String>,
    pub(super) is_admin: bool,
}

impl Account {
    pub(super) fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

struct PlaceSeed {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    price: f64,
    amenities: &'static [&'static str],
}

const PLACES: &[PlaceSeed] = &[
    PlaceSeed {
        id: "p1",
        title: "Beautiful Beach House",
        description: "A beautiful beach house with amazing views.",
        price: 150.0,
        amenities: &["WiFi", "Sea view", "Air conditioning"],
    },
    PlaceSeed {
        id: "p2",
        title: "Cozy Cabin",
        description: "Small cozy cabin in the woods.",
        price: 100.0,
        amenities: &["Fireplace", "Kitchen"],
    },
    PlaceSeed {
        id: "p3",
        title: "Modern Apartment",
        description: "Central apartment, modern amenities.",
        price: 200.0,
        amenities: &["WiFi", "Elevator"],
    },
    PlaceSeed {
        id: "p4",
        title: "Beautiful Beach",
        description: "A second beautiful beach apartment with amazing views.",
        price: 150.0,
        amenities: &["WiFi", "Sea view", "Air conditioning"],
    },
];

pub(super) fn listings() -> Result<Vec<Listing>, String> {
    PLACES
        .iter()
        .map(|seed| {
            let id = ListingId::new(seed.id).map_err(|error| error.to_string())?;
            Listing::new(id, seed.title, seed.price)
                .map(|listing| {
                    listing
                        .with_description(seed.description)
                        .with_amenities(seed.amenities.iter().copied())
                })
                .map_err(|error: ListingValidationError| error.to_string())
        })
        .collect()
}

pub(super) fn accounts() -> Result<Vec<Account>, String> {
    let account = |id: &str, first: &str, email: &str, password: &str, is_admin: bool| {
        Ok::<_, String>(Account {
            id: SubjectId::new(id).map_err(|error| error.to_string())?,
            first_name: first.to_owned(),
            last_name: "User".to_owned(),
            email: email.to_owned(),
            password: Zeroizing::new(password.to_owned()),
            is_admin,
        })
    };
    Ok(vec![
        account("u-admin", "Admin", ADMIN_EMAIL, ADMIN_PASSWORD, true)?,
        account("u-demo", "Demo", DEMO_EMAIL, DEMO_PASSWORD, false)?,
    ])
}
