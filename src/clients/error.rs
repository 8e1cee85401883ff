//! Error types for collaborator clients

use thiserror::Error;

/// Result type alias for collaborator calls
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the cloud API clients
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The remote API rejected or failed the call
    #[error("{operation} failed: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },

    /// The remote API throttled the call and the client gave up
    #[error("{operation} throttled")]
    Throttled { operation: &'static str },

    /// The client does not implement this operation
    #[error("{0} is not supported by this client")]
    Unsupported(&'static str),

    /// The client's concurrency limiter was closed
    #[error("client has been shut down")]
    Closed,
}

impl ClientError {
    pub fn api(operation: &'static str, message: impl Into<String>) -> Self {
        ClientError::Api {
            operation,
            message: message.into(),
        }
    }
}
