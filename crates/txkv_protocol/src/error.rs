//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while building or (de)serializing protocol values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Failed to encode a frame.
    #[error("encoding failed: {0}")]
    Encode(String),

    /// Failed to decode a frame.
    #[error("decoding failed: {0}")]
    Decode(String),

    /// A condition is missing a required input or carries one its kind forbids.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// The peer speaks a different protocol version.
    #[error("protocol version mismatch: local={local}, remote={remote}")]
    VersionMismatch {
        /// Local protocol version.
        local: u16,
        /// Remote protocol version.
        remote: u16,
    },
}

impl ProtocolError {
    /// Creates an invalid condition error.
    pub fn invalid_condition(message: impl Into<String>) -> Self {
        Self::InvalidCondition(message.into())
    }
}
