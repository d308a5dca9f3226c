//! Error types for the store server.

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that make the server refuse a whole atomic unit.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request contents.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The requested database index does not exist.
    #[error("unknown database: {0}")]
    UnknownDatabase(u32),

    /// Protocol version mismatch.
    #[error("protocol version mismatch: {0}")]
    ProtocolMismatch(String),

    /// Frame could not be decoded or encoded.
    #[error("codec error: {0}")]
    Codec(#[from] txkv_protocol::ProtocolError),

    /// The unit exceeds a configured limit.
    #[error("{what} limit exceeded: {actual} > {limit}")]
    LimitExceeded {
        /// What was counted.
        what: &'static str,
        /// Number received.
        actual: usize,
        /// Configured maximum.
        limit: usize,
    },
}

impl ServerError {
    /// Returns true if the client sent something the server cannot accept.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_)
                | ServerError::UnknownDatabase(_)
                | ServerError::ProtocolMismatch(_)
                | ServerError::LimitExceeded { .. }
        )
    }
}

/// Errors from executing a single command.
///
/// These never abort a unit; they become that command's error reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The key holds a different type.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// The stored value or argument is not an integer.
    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    /// Arithmetic overflow.
    #[error("ERR increment or decrement would overflow")]
    Overflow,

    /// Unknown command name.
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    /// Wrong number of arguments.
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),
}
