//! Atomic unit request and reply messages.

use crate::command::{CommandReply, QueuedCommand};
use crate::condition::Condition;
use crate::error::{ProtocolError, ProtocolResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Current protocol version.
pub const PROTOCOL_VERSION: u16 = 1;

/// One check-and-execute unit.
///
/// The store evaluates every condition and, iff all hold, executes every
/// command in order, with no other client's commands interleaved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicRequest {
    /// Protocol version of the sender.
    pub protocol_version: u16,
    /// Database index the unit runs against.
    pub database: u32,
    /// Conditions, in insertion order.
    pub conditions: Vec<Condition>,
    /// Commands, in queued order.
    pub commands: Vec<QueuedCommand>,
}

impl AtomicRequest {
    /// Creates a new request for the current protocol version.
    pub fn new(database: u32, conditions: Vec<Condition>, commands: Vec<QueuedCommand>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            database,
            conditions,
            commands,
        }
    }

    /// Returns true if the unit carries neither conditions nor commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.commands.is_empty()
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        encode_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        decode_cbor(bytes)
    }
}

/// The consolidated reply to an [`AtomicRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicReply {
    /// Whether every condition held and the commands ran.
    pub committed: bool,
    /// Per-condition satisfaction, in request order.
    pub condition_results: Vec<bool>,
    /// Per-command outcome, in request order. `None` unless committed.
    pub command_results: Option<Vec<CommandReply>>,
}

impl AtomicReply {
    /// Creates a committed reply.
    pub fn committed(condition_results: Vec<bool>, command_results: Vec<CommandReply>) -> Self {
        Self {
            committed: true,
            condition_results,
            command_results: Some(command_results),
        }
    }

    /// Creates an aborted reply.
    pub fn aborted(condition_results: Vec<bool>) -> Self {
        Self {
            committed: false,
            condition_results,
            command_results: None,
        }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        encode_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        decode_cbor(bytes)
    }
}

/// A response frame: either a reply or an in-band rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseFrame {
    /// The unit was evaluated.
    Reply(AtomicReply),
    /// The store refused the unit without evaluating it.
    Rejected(String),
}

impl ResponseFrame {
    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        encode_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        decode_cbor(bytes)
    }
}

fn encode_cbor<T: Serialize>(value: &T) -> ProtocolResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes)
        .map_err(|e| ProtocolError::Encode(e.to_string()))?;
    Ok(bytes)
}

fn decode_cbor<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::value::{Comparand, Key, RawValue};

    fn sample_request() -> AtomicRequest {
        let key = Key::from("counter");
        AtomicRequest::new(
            3,
            vec![
                Condition::key_not_exists("guard"),
                Condition::hash_equal("h", "f", Comparand::Absent),
            ],
            vec![
                QueuedCommand::new(Command::new("INCRBY").key(&key).int_arg(1), false),
                QueuedCommand::new(Command::new("GET").key(&key), true),
            ],
        )
    }

    #[test]
    fn request_roundtrip() {
        let request = sample_request();
        let bytes = request.encode().unwrap();
        let decoded = AtomicRequest::decode(&bytes).unwrap();
        assert_eq!(request, decoded);
        assert_eq!(decoded.protocol_version, PROTOCOL_VERSION);
    }

    #[test]
    fn response_frames() {
        let committed = ResponseFrame::Reply(AtomicReply::committed(
            vec![true],
            vec![
                CommandReply::Ok(RawValue::Integer(1)),
                CommandReply::error("WRONGTYPE"),
            ],
        ));
        let bytes = committed.encode().unwrap();
        assert_eq!(ResponseFrame::decode(&bytes).unwrap(), committed);

        let rejected = ResponseFrame::Rejected("unknown database 99".into());
        let bytes = rejected.encode().unwrap();
        assert_eq!(ResponseFrame::decode(&bytes).unwrap(), rejected);
    }

    #[test]
    fn aborted_reply_has_no_command_results() {
        let reply = AtomicReply::aborted(vec![true, false]);
        assert!(!reply.committed);
        assert!(reply.command_results.is_none());
        assert_eq!(reply.condition_results, vec![true, false]);
    }

    #[test]
    fn decode_garbage_fails() {
        let result = AtomicRequest::decode(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn empty_request() {
        assert!(AtomicRequest::new(0, vec![], vec![]).is_empty());
        assert!(!sample_request().is_empty());
    }
}
