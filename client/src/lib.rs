//! Client-side data access and session layer for listings and reviews.
//!
//! Presentation code talks to [`inbound::ListingsClient`]. Behind it the
//! domain decides whether the real HTTP backend or the in-memory simulation
//! serves each operation, keeps the authenticated session, and runs the
//! validation and permission pipeline before any review is posted.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::ClientSettings;
pub use inbound::ListingsClient;
