//! Listings API outbound adapter.
//!
//! This module provides the `DataSource` implementation that talks to the
//! real backend through the `HttpTransport` port.

mod dto;
mod http_backend;

pub use http_backend::{DEFAULT_BASE_URL, HttpBackend};
