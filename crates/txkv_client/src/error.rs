//! Error types for the transactional client.

use thiserror::Error;
use txkv_protocol::ProtocolError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while building, submitting or awaiting a transaction.
///
/// Errors are `Clone` so that a single transport failure can be delivered to
/// every result still waiting on the same round trip.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// No reply arrived in time.
    #[error("operation timed out")]
    Timeout,

    /// Not connected.
    #[error("not connected to server")]
    NotConnected,

    /// Protocol error (malformed or mismatched frame).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server refused the whole unit.
    #[error("server error: {0}")]
    Server(String),

    /// A single committed command failed on the server.
    #[error("command error: {0}")]
    Command(String),

    /// The transaction aborted, so this result was never produced.
    #[error("operation cancelled")]
    Cancelled,

    /// The transaction is not in a state that allows the operation.
    #[error("cannot {operation} a transaction that is {state}")]
    InvalidState {
        /// Current state.
        state: String,
        /// Attempted operation.
        operation: String,
    },

    /// A condition failed validation.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// Too many operations or conditions queued on one transaction.
    #[error("transaction limit of {limit} {what} exceeded")]
    TooManyOperations {
        /// What was counted.
        what: &'static str,
        /// Configured maximum.
        limit: usize,
    },

    /// A reply value could not be decoded as the expected type.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl ClientError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a misuse error for `operation` attempted in `state`.
    pub fn invalid_state(state: impl ToString, operation: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.to_string(),
            operation: operation.into(),
        }
    }

    /// Returns true if this error can be retried.
    ///
    /// Retrying is the caller's decision; the client never resubmits.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport { retryable, .. } => *retryable,
            ClientError::Timeout => true,
            ClientError::NotConnected => true,
            _ => false,
        }
    }

    /// Returns true if the round trip itself failed.
    ///
    /// These are broadcast to every pending result of the transaction.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            ClientError::Transport { .. }
                | ClientError::Timeout
                | ClientError::NotConnected
                | ClientError::Protocol(_)
                | ClientError::Server(_)
        )
    }

    /// Returns true if the caller used the API incorrectly.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidState { .. }
                | ClientError::InvalidCondition(_)
                | ClientError::TooManyOperations { .. }
        )
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidCondition(message) => ClientError::InvalidCondition(message),
            other => ClientError::Protocol(other.to_string()),
        }
    }
}
