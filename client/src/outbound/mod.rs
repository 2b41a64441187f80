//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! This module follows the hexagonal architecture pattern, providing concrete
//! implementations of domain port traits:
//!
//! - **http**: reqwest-backed `HttpTransport`
//! - **backend**: `DataSource` over the listings REST API
//! - **simulation**: in-memory `DataSource` with the same status semantics
//! - **storage**: memory and capability-scoped file `SlotStorage`
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod backend;
pub mod http;
pub mod simulation;
pub mod storage;
