//! Domain ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod data_source;
mod http_transport;
mod slot_storage;

#[cfg(test)]
pub use data_source::MockDataSource;
pub use data_source::{DataSource, DataSourceError};
#[cfg(test)]
pub use http_transport::MockHttpTransport;
pub use http_transport::{
    HttpMethod, HttpTransport, TransportError, TransportRequest, TransportResponse,
};
#[cfg(test)]
pub use slot_storage::MockSlotStorage;
pub use slot_storage::{SlotStorage, SlotStorageError};
