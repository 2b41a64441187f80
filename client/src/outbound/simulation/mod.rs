//! In-memory stand-in for the listings backend.
//!
//! Used whenever the backend probe finds no server, and as the one-shot
//! fallback when the backend faults. Status semantics mirror the real API so
//! callers cannot tell the two apart.

mod seed;
mod store;

pub use seed::{ADMIN_EMAIL, ADMIN_PASSWORD, DEMO_EMAIL, DEMO_PASSWORD};
pub use store::SimulationStore;
