//! Driven port implemented by the HTTP backend and the simulation.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::credential::BearerCredential;
use crate::domain::operation::{Operation, OperationOutput};

define_port_error! {
    /// Errors a data source reports for one operation.
    pub enum DataSourceError {
        /// The source could not be reached.
        Network { message: String } =>
            "data source unreachable: {message}",
        /// The source did not answer in time.
        Timeout { message: String } =>
            "data source timed out: {message}",
        /// The source answered with an application error.
        Rejected { status: u16, message: String } =>
            "data source rejected request ({status}): {message}",
        /// The exchange failed for a reason other than the network.
        Fault { message: String } =>
            "data source fault: {message}",
    }
}

impl DataSourceError {
    /// Whether retrying could help.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }
}

/// Port for executing operations against listings data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Execute `operation`, attaching `bearer` when present.
    async fn execute(
        &self,
        operation: &Operation,
        bearer: Option<BearerCredential>,
    ) -> Result<OperationOutput, DataSourceError>;
}
