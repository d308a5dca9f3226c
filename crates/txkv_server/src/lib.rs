//! # txkv Server
//!
//! Reference in-memory store for txkv.
//!
//! This crate provides:
//! - Numbered keyspaces holding strings and hashes
//! - Command execution (`GET`, `SET`, `INCRBY`, `DECRBY`, `EXISTS`, `DEL`,
//!   `HGET`, `HSET`, `HEXISTS`, `HDEL`)
//! - Atomic check-and-execute evaluation of units
//! - CBOR frame handling for loopback transports
//!
//! # Atomicity
//!
//! A unit's conditions are evaluated and its commands executed under one
//! database lock. Nothing else touching that database can run in between,
//! so a condition that held at evaluation still holds when the commands run.
//!
//! Per-command failures (wrong type, non-integer value, unknown command)
//! never abort a unit: they become that command's error reply while the
//! remaining commands still execute.

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod keyspace;
mod server;

pub use config::ServerConfig;
pub use error::{CommandError, ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use keyspace::{Entry, Keyspace};
pub use server::{DatabaseHandle, StoreServer};
