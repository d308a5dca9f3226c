//! Fans a consolidated reply out to every pending result of a transaction.
//!
//! Every queued result is settled before the transaction outcome is, so a
//! caller that observes the outcome can rely on all results being terminal.

use crate::condition::ConditionHandle;
use crate::error::ClientError;
use crate::operation::PendingOperation;
use crate::pending::PendingResult;
use txkv_protocol::AtomicReply;

/// Delivers a reply whose shape has already been checked.
///
/// On commit each non-fire-and-forget result receives its own command reply;
/// a command error faults only that result. On abort every such result is
/// cancelled. Condition flags are recorded in both cases.
pub(crate) fn deliver(
    reply: &AtomicReply,
    conditions: &[ConditionHandle],
    operations: &[PendingOperation],
    outcome: &PendingResult<bool>,
) {
    for (handle, held) in conditions.iter().zip(&reply.condition_results) {
        handle.record(*held);
    }

    match reply.command_results.as_deref() {
        Some(results) if reply.committed => {
            for operation in operations {
                let (Some(sink), Some(result)) =
                    (&operation.sink, results.get(operation.sequence_index))
                else {
                    continue;
                };
                sink.complete(result.clone());
            }
        }
        _ => {
            for sink in operations.iter().filter_map(|op| op.sink.as_ref()) {
                sink.cancel();
            }
        }
    }

    outcome.resolve(reply.committed);
}

/// Broadcasts a round-trip failure to every result still waiting on it.
///
/// Conditions stay unset since nothing was observed.
pub(crate) fn fail_all(
    error: &ClientError,
    operations: &[PendingOperation],
    outcome: &PendingResult<bool>,
) {
    for sink in operations.iter().filter_map(|op| op.sink.as_ref()) {
        sink.fail(error.clone());
    }
    outcome.fail(error.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::{Completion, ResultStatus};
    use std::sync::Arc;
    use txkv_protocol::{Command, CommandReply, Condition, RawValue};

    fn queue(index: usize, fire_and_forget: bool) -> (PendingOperation, PendingResult<i64>) {
        let command = Command::new("INCRBY").arg("k").int_arg(1);
        if fire_and_forget {
            let result = PendingResult::ready(0);
            (PendingOperation::new(index, command, None), result)
        } else {
            let result = PendingResult::pending(None);
            let sink: Arc<dyn Completion> = Arc::new(result.clone());
            (PendingOperation::new(index, command, Some(sink)), result)
        }
    }

    #[test]
    fn commit_delivers_in_order() {
        let (op_a, a) = queue(0, false);
        let (op_b, b) = queue(1, true);
        let (op_c, c) = queue(2, false);
        let condition = ConditionHandle::new(Condition::key_not_exists("guard"));
        let outcome = PendingResult::pending(None);

        let reply = AtomicReply::committed(
            vec![true],
            vec![
                CommandReply::Ok(RawValue::Integer(5)),
                CommandReply::Ok(RawValue::Integer(15)),
                CommandReply::Ok(RawValue::Integer(30)),
            ],
        );
        deliver(&reply, &[condition.clone()], &[op_a, op_b, op_c], &outcome);

        assert_eq!(a.try_result(), Some(Ok(5)));
        assert_eq!(b.try_result(), Some(Ok(0)));
        assert_eq!(c.try_result(), Some(Ok(30)));
        assert_eq!(condition.was_satisfied(), Some(true));
        assert_eq!(outcome.try_result(), Some(Ok(true)));
    }

    #[test]
    fn command_error_is_isolated() {
        let (op_a, a) = queue(0, false);
        let (op_b, b) = queue(1, false);
        let outcome = PendingResult::pending(None);

        let reply = AtomicReply::committed(
            vec![],
            vec![
                CommandReply::error("WRONGTYPE Operation against a key holding the wrong kind of value"),
                CommandReply::Ok(RawValue::Integer(2)),
            ],
        );
        deliver(&reply, &[], &[op_a, op_b], &outcome);

        assert!(matches!(a.try_result(), Some(Err(ClientError::Command(_)))));
        assert_eq!(b.try_result(), Some(Ok(2)));
        assert_eq!(outcome.try_result(), Some(Ok(true)));
    }

    #[test]
    fn abort_cancels_and_records_each_condition() {
        let (op_a, a) = queue(0, false);
        let (op_b, b) = queue(1, true);
        let first = ConditionHandle::new(Condition::key_exists("x"));
        let second = ConditionHandle::new(Condition::key_exists("y"));
        let outcome = PendingResult::pending(None);

        let reply = AtomicReply::aborted(vec![true, false]);
        deliver(
            &reply,
            &[first.clone(), second.clone()],
            &[op_a, op_b],
            &outcome,
        );

        assert_eq!(a.status(), ResultStatus::Cancelled);
        assert_eq!(b.try_result(), Some(Ok(0)));
        assert_eq!(first.was_satisfied(), Some(true));
        assert_eq!(second.was_satisfied(), Some(false));
        assert_eq!(outcome.try_result(), Some(Ok(false)));
    }

    #[test]
    fn failure_reaches_every_pending_result() {
        let (op_a, a) = queue(0, false);
        let (op_b, b) = queue(1, true);
        let outcome = PendingResult::pending(None);

        fail_all(&ClientError::Timeout, &[op_a, op_b], &outcome);

        assert_eq!(a.try_result(), Some(Err(ClientError::Timeout)));
        assert_eq!(b.try_result(), Some(Ok(0)));
        assert_eq!(outcome.try_result(), Some(Err(ClientError::Timeout)));
    }
}
