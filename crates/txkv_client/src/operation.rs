//! Queued operations.

use crate::pending::Completion;
use std::sync::Arc;
use txkv_protocol::{Command, QueuedCommand};

/// Per-operation behavior flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommandFlags {
    /// The result is delivered to the returned [`PendingResult`](crate::PendingResult).
    #[default]
    None,
    /// The command still runs on commit, but its result is discarded. The
    /// returned result completes immediately with the type's default value.
    FireAndForget,
}

impl CommandFlags {
    /// Returns true for [`CommandFlags::FireAndForget`].
    pub fn is_fire_and_forget(&self) -> bool {
        matches!(self, CommandFlags::FireAndForget)
    }
}

/// A command queued on a transaction plus the sink for its outcome.
#[derive(Clone)]
pub(crate) struct PendingOperation {
    /// Position among the transaction's operations, in queued order.
    pub(crate) sequence_index: usize,
    pub(crate) command: Command,
    /// `None` for fire-and-forget operations, which are never settled again.
    pub(crate) sink: Option<Arc<dyn Completion>>,
}

impl PendingOperation {
    pub(crate) fn new(
        sequence_index: usize,
        command: Command,
        sink: Option<Arc<dyn Completion>>,
    ) -> Self {
        Self {
            sequence_index,
            command,
            sink,
        }
    }

    pub(crate) fn is_fire_and_forget(&self) -> bool {
        self.sink.is_none()
    }

    pub(crate) fn to_queued(&self) -> QueuedCommand {
        QueuedCommand::new(self.command.clone(), self.is_fire_and_forget())
    }
}
