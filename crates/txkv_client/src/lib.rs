//! # txkv Client
//!
//! Transactional command pipeline for txkv.
//!
//! This crate provides:
//! - `Transaction` builder for conditions and queued operations
//! - `PendingResult` single-assignment result cells (blocking and `Future`)
//! - `AtomicDispatcher` for the single check-and-execute round trip
//! - Reply demultiplexing onto each queued result
//! - `Connection` abstraction with mock and framed implementations
//!
//! ## Flow
//!
//! 1. Create a transaction from a `Database`
//! 2. Add conditions and queue operations; each call returns immediately
//! 3. Execute: one atomic unit goes to the store
//! 4. Every queued result settles, then the commit flag is returned
//!
//! ## Key Invariants
//!
//! - A transaction produces at most one atomic unit
//! - Conditions and commands travel together; there is no separate check
//! - No queued result completes before the round trip returns
//! - Abort cancels every awaited result; transport failure faults all of them
//! - A command error is reported only on its own result
//! - Fire-and-forget results complete at queuing time and are never touched again
//!
//! ## Example
//!
//! ```
//! use txkv_client::{ClientConfig, CommandFlags, Condition, Database, MockConnection};
//! use txkv_protocol::{AtomicReply, CommandReply, RawValue};
//!
//! let db = Database::new(MockConnection::new(), ClientConfig::default());
//! db.connection().push_reply(AtomicReply::committed(
//!     vec![true],
//!     vec![CommandReply::Ok(RawValue::Integer(1))],
//! ));
//!
//! let mut tx = db.create_transaction();
//! let guard = tx.add_condition(Condition::key_not_exists("lock")).unwrap();
//! let counter = tx.string_increment("counter", 1, CommandFlags::None).unwrap();
//! assert!(!counter.is_completed());
//!
//! assert!(tx.execute().unwrap());
//! assert_eq!(guard.was_satisfied(), Some(true));
//! assert_eq!(counter.wait().unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod condition;
mod config;
mod connection;
mod database;
mod demux;
mod dispatcher;
mod error;
mod framed;
mod operation;
mod pending;
mod reply;
mod state;
mod transaction;

pub use condition::ConditionHandle;
pub use config::ClientConfig;
pub use connection::{Connection, MockConnection};
pub use database::Database;
pub use dispatcher::AtomicDispatcher;
pub use error::{ClientError, ClientResult};
pub use framed::{FrameClient, FramedConnection, LoopbackClient, LoopbackServer};
pub use operation::CommandFlags;
pub use pending::{AsyncState, PendingResult, ResultStatus};
pub use reply::FromRawValue;
pub use state::TransactionState;
pub use transaction::Transaction;

pub use txkv_protocol::{Comparand, Condition, ConditionKind, Key};
