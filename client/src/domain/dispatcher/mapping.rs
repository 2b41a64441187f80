//! Mapping helpers from data source errors to operation failures.

use crate::domain::error::{ErrorKind, OperationFailure};
use crate::domain::operation::OperationOutput;
use crate::domain::ports::DataSourceError;

pub(super) fn map_source_error(error: DataSourceError, attempts: u32) -> OperationFailure {
    match error {
        DataSourceError::Network { message } | DataSourceError::Timeout { message } => {
            OperationFailure::network(format!(
                "data source unreachable after {attempts} attempt(s): {message}"
            ))
            .with_retryable(false)
        }
        DataSourceError::Rejected { status, message } => OperationFailure::server(status, message),
        DataSourceError::Fault { message } => OperationFailure::new(ErrorKind::Server, message),
    }
}

pub(super) fn unexpected_output(operation: &str, output: &OperationOutput) -> OperationFailure {
    OperationFailure::new(
        ErrorKind::Server,
        format!(
            "{operation} produced an unexpected {} result",
            output.name()
        ),
    )
}
