//! Inbound adapters translating caller intent into domain service calls.
//!
//! [`ListingsClient`] is the only inbound surface: presentation code calls it
//! and receives [`OperationResult`](crate::domain::OperationResult) values.

mod client;

pub use client::{ClientBuildError, ClientPorts, ListingsClient};
