//! # txkv Protocol
//!
//! Atomic unit types and CBOR frames for txkv.
//!
//! This crate provides:
//! - `Condition` predicates over key, string and hash-field state
//! - `Command` and `QueuedCommand` for operations carried in a unit
//! - `AtomicRequest` / `AtomicReply` for the single check-and-execute round trip
//! - CBOR encoding/decoding of frames
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod condition;
mod error;
mod messages;
mod value;

pub use command::{Command, CommandReply, QueuedCommand};
pub use condition::{Condition, ConditionKind, Observed};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{AtomicReply, AtomicRequest, ResponseFrame, PROTOCOL_VERSION};
pub use value::{Comparand, Key, RawValue};
