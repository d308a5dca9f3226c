//! Transaction builder.
//!
//! A [`Transaction`] accumulates conditions and queued operations, then
//! submits all of them as one atomic unit. Nothing reaches the store before
//! [`Transaction::execute`] or [`Transaction::execute_async`] is called.

use crate::condition::ConditionHandle;
use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::demux;
use crate::dispatcher::AtomicDispatcher;
use crate::error::{ClientError, ClientResult};
use crate::operation::{CommandFlags, PendingOperation};
use crate::pending::{AsyncState, Completion, PendingResult};
use crate::reply::FromRawValue;
use crate::state::TransactionState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};
use txkv_protocol::{AtomicRequest, Command, Condition, Key};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Everything one round trip needs, detached from the builder so it can run
/// on another thread.
struct Submission {
    id: u64,
    request: AtomicRequest,
    conditions: Vec<ConditionHandle>,
    operations: Vec<PendingOperation>,
    outcome: PendingResult<bool>,
}

impl Submission {
    fn run<C: Connection + ?Sized>(&self, connection: &C, config: &ClientConfig) {
        match AtomicDispatcher::new(connection, config).dispatch(&self.request) {
            Ok(reply) => {
                demux::deliver(&reply, &self.conditions, &self.operations, &self.outcome);
                debug!(
                    transaction = self.id,
                    committed = reply.committed,
                    "transaction completed"
                );
            }
            Err(e) => self.fail(&e),
        }
    }

    fn fail(&self, error: &ClientError) {
        warn!(transaction = self.id, error = %error, "transaction failed");
        demux::fail_all(error, &self.operations, &self.outcome);
    }
}

/// A submission dropped before its reply arrived faults every result, so a
/// panicking connection or a discarded worker never leaves them pending.
impl Drop for Submission {
    fn drop(&mut self) {
        if !self.outcome.is_completed() {
            self.fail(&ClientError::transport_fatal("dispatch aborted"));
        }
    }
}

/// A batch of conditions and operations submitted as one atomic unit.
///
/// Queuing methods return a [`PendingResult`] immediately; it stays pending
/// until the round trip completes. If every condition holds, every command
/// runs and each result receives its own reply. Otherwise no command runs and
/// every result is cancelled.
///
/// A transaction is submitted at most once. Adding to it or executing it
/// again afterwards fails with [`ClientError::InvalidState`].
///
/// A transaction is not meant to be shared between threads while building;
/// callers serialize access themselves.
pub struct Transaction<C: Connection> {
    id: u64,
    config: ClientConfig,
    connection: Arc<C>,
    async_state: Option<AsyncState>,
    conditions: Vec<ConditionHandle>,
    operations: Vec<PendingOperation>,
    outcome: Option<PendingResult<bool>>,
}

impl<C: Connection> Transaction<C> {
    pub(crate) fn new(
        connection: Arc<C>,
        config: ClientConfig,
        async_state: Option<AsyncState>,
    ) -> Self {
        Self {
            id: NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
            config,
            connection,
            async_state,
            conditions: Vec::new(),
            operations: Vec::new(),
            outcome: None,
        }
    }

    /// Returns the process-unique transaction id used in log records.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> TransactionState {
        match self.outcome.as_ref().map(PendingResult::try_result) {
            None => TransactionState::Building,
            Some(None) => TransactionState::Submitted,
            Some(Some(Ok(true))) => TransactionState::Committed,
            Some(Some(Ok(false))) => TransactionState::Aborted,
            Some(Some(Err(_))) => TransactionState::Failed,
        }
    }

    /// Returns the number of conditions added.
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    /// Returns the number of operations queued, fire-and-forget included.
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Returns the correlation state attached to this transaction's results.
    pub fn async_state(&self) -> Option<&AsyncState> {
        self.async_state.as_ref()
    }

    /// Adds a condition that must hold for the transaction to commit.
    ///
    /// All conditions must hold; there is no other combinator.
    ///
    /// # Errors
    ///
    /// Fails if the transaction was already submitted, the condition is
    /// malformed, or the condition limit is reached.
    pub fn add_condition(&mut self, condition: Condition) -> ClientResult<ConditionHandle> {
        self.ensure_building("add a condition to")?;
        condition.validate()?;
        if self.conditions.len() >= self.config.max_conditions {
            return Err(ClientError::TooManyOperations {
                what: "conditions",
                limit: self.config.max_conditions,
            });
        }

        let handle = ConditionHandle::new(condition);
        self.conditions.push(handle.clone());
        Ok(handle)
    }

    /// Queues an arbitrary command whose reply decodes as `T`.
    ///
    /// With [`CommandFlags::FireAndForget`] the command still runs on commit
    /// but the returned result is already completed with `T::default()` and
    /// carries no correlation state.
    ///
    /// # Errors
    ///
    /// Fails if the transaction was already submitted or the operation limit
    /// is reached.
    pub fn enqueue<T>(&mut self, command: Command, flags: CommandFlags) -> ClientResult<PendingResult<T>>
    where
        T: FromRawValue + Default + Send + 'static,
    {
        self.ensure_building("queue onto")?;
        if self.operations.len() >= self.config.max_operations {
            return Err(ClientError::TooManyOperations {
                what: "operations",
                limit: self.config.max_operations,
            });
        }

        let sequence_index = self.operations.len();
        trace!(
            transaction = self.id,
            sequence_index,
            command = %command,
            fire_and_forget = flags.is_fire_and_forget(),
            "queued operation"
        );

        let (result, sink) = if flags.is_fire_and_forget() {
            (PendingResult::ready(T::default()), None)
        } else {
            let result = PendingResult::pending(self.async_state.clone());
            let sink: Arc<dyn Completion> = Arc::new(result.clone());
            (result, Some(sink))
        };
        self.operations
            .push(PendingOperation::new(sequence_index, command, sink));
        Ok(result)
    }

    /// Queues an increment of the integer at `key`; yields the new value.
    pub fn string_increment(
        &mut self,
        key: impl Into<Key>,
        delta: i64,
        flags: CommandFlags,
    ) -> ClientResult<PendingResult<i64>> {
        self.enqueue(Command::new("INCRBY").key(&key.into()).int_arg(delta), flags)
    }

    /// Queues a decrement of the integer at `key`; yields the new value.
    pub fn string_decrement(
        &mut self,
        key: impl Into<Key>,
        delta: i64,
        flags: CommandFlags,
    ) -> ClientResult<PendingResult<i64>> {
        self.enqueue(Command::new("DECRBY").key(&key.into()).int_arg(delta), flags)
    }

    /// Queues a read of the string at `key`.
    pub fn string_get(
        &mut self,
        key: impl Into<Key>,
        flags: CommandFlags,
    ) -> ClientResult<PendingResult<Option<Vec<u8>>>> {
        self.enqueue(Command::new("GET").key(&key.into()), flags)
    }

    /// Queues a write of the string at `key`.
    pub fn string_set(
        &mut self,
        key: impl Into<Key>,
        value: impl Into<Vec<u8>>,
        flags: CommandFlags,
    ) -> ClientResult<PendingResult<bool>> {
        self.enqueue(Command::new("SET").key(&key.into()).arg(value), flags)
    }

    /// Queues an existence check of `key`.
    pub fn key_exists(
        &mut self,
        key: impl Into<Key>,
        flags: CommandFlags,
    ) -> ClientResult<PendingResult<bool>> {
        self.enqueue(Command::new("EXISTS").key(&key.into()), flags)
    }

    /// Queues a removal of `key`; yields whether it existed.
    pub fn key_delete(
        &mut self,
        key: impl Into<Key>,
        flags: CommandFlags,
    ) -> ClientResult<PendingResult<bool>> {
        self.enqueue(Command::new("DEL").key(&key.into()), flags)
    }

    /// Queues a read of a hash field.
    pub fn hash_get(
        &mut self,
        key: impl Into<Key>,
        field: impl Into<Vec<u8>>,
        flags: CommandFlags,
    ) -> ClientResult<PendingResult<Option<Vec<u8>>>> {
        self.enqueue(Command::new("HGET").key(&key.into()).arg(field), flags)
    }

    /// Queues a write of a hash field; yields whether the field is new.
    pub fn hash_set(
        &mut self,
        key: impl Into<Key>,
        field: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
        flags: CommandFlags,
    ) -> ClientResult<PendingResult<bool>> {
        self.enqueue(
            Command::new("HSET").key(&key.into()).arg(field).arg(value),
            flags,
        )
    }

    /// Queues an existence check of a hash field.
    pub fn hash_exists(
        &mut self,
        key: impl Into<Key>,
        field: impl Into<Vec<u8>>,
        flags: CommandFlags,
    ) -> ClientResult<PendingResult<bool>> {
        self.enqueue(Command::new("HEXISTS").key(&key.into()).arg(field), flags)
    }

    /// Queues a removal of a hash field; yields whether it existed.
    pub fn hash_delete(
        &mut self,
        key: impl Into<Key>,
        field: impl Into<Vec<u8>>,
        flags: CommandFlags,
    ) -> ClientResult<PendingResult<bool>> {
        self.enqueue(Command::new("HDEL").key(&key.into()).arg(field), flags)
    }

    /// Submits the transaction and blocks until it completes.
    ///
    /// Returns `true` if it committed and `false` if a condition did not
    /// hold. Every queued result is settled before this returns.
    ///
    /// # Errors
    ///
    /// Returns the round-trip failure, which every queued result also
    /// receives, or [`ClientError::InvalidState`] if already submitted.
    pub fn execute(&mut self) -> ClientResult<bool> {
        let (outcome, submission) = self.begin("execute")?;
        if let Some(submission) = submission {
            submission.run(self.connection.as_ref(), &self.config);
        }
        outcome.wait()
    }

    fn ensure_building(&self, operation: &str) -> ClientResult<()> {
        let state = self.state();
        if state.accepts_changes() {
            Ok(())
        } else {
            Err(ClientError::invalid_state(state, operation))
        }
    }

    /// Moves the transaction out of `Building`.
    ///
    /// An empty transaction commits right here without a round trip.
    fn begin(&mut self, operation: &str) -> ClientResult<(PendingResult<bool>, Option<Submission>)> {
        self.ensure_building(operation)?;

        let outcome = PendingResult::pending(self.async_state.clone());
        self.outcome = Some(outcome.clone());

        let request = AtomicDispatcher::new(self.connection.as_ref(), &self.config)
            .build_request(&self.conditions, &self.operations);
        if request.is_empty() {
            debug!(transaction = self.id, "empty transaction committed locally");
            outcome.resolve(true);
            return Ok((outcome, None));
        }

        debug!(
            transaction = self.id,
            database = self.config.database,
            conditions = self.conditions.len(),
            operations = self.operations.len(),
            "submitting transaction"
        );
        let submission = Submission {
            id: self.id,
            request,
            conditions: self.conditions.clone(),
            operations: self.operations.clone(),
            outcome: outcome.clone(),
        };
        Ok((outcome, Some(submission)))
    }
}

impl<C: Connection + 'static> Transaction<C> {
    /// Submits the transaction without blocking the caller.
    ///
    /// The round trip runs on Tokio's blocking pool when called inside a
    /// runtime and on a dedicated thread otherwise. The returned result
    /// settles with the commit flag after every queued result is settled.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidState`] if already submitted. Failures of
    /// the round trip itself are delivered through the returned result.
    pub fn execute_async(&mut self) -> ClientResult<PendingResult<bool>> {
        let (outcome, submission) = self.begin("execute")?;
        let Some(submission) = submission else {
            return Ok(outcome);
        };

        let submission = Arc::new(submission);
        let worker = Arc::clone(&submission);
        let connection = Arc::clone(&self.connection);
        let config = self.config.clone();
        let task = move || worker.run(connection.as_ref(), &config);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                // The join handle is not needed; the outcome cell reports completion.
                drop(handle.spawn_blocking(task));
            }
            Err(_) => {
                let spawned = std::thread::Builder::new()
                    .name(format!("txkv-tx-{}", self.id))
                    .spawn(task);
                if let Err(e) = spawned {
                    submission.fail(&ClientError::transport_fatal(format!(
                        "failed to spawn dispatch thread: {e}"
                    )));
                }
            }
        }
        Ok(outcome)
    }
}

impl<C: Connection> std::fmt::Debug for Transaction<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("conditions", &self.conditions.len())
            .field("operations", &self.operations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MockConnection;
    use crate::pending::ResultStatus;
    use std::time::Duration;
    use txkv_protocol::{AtomicReply, CommandReply, RawValue};

    fn create_transaction(config: ClientConfig) -> (Transaction<MockConnection>, Arc<MockConnection>) {
        let connection = Arc::new(MockConnection::new());
        (
            Transaction::new(Arc::clone(&connection), config, None),
            connection,
        )
    }

    fn integer(n: i64) -> CommandReply {
        CommandReply::Ok(RawValue::Integer(n))
    }

    #[test]
    fn queued_results_stay_pending_until_execute() {
        let (mut tx, connection) = create_transaction(ClientConfig::default());
        let a = tx.string_increment("k", 10, CommandFlags::None).unwrap();
        let b = tx.string_increment("k", 5, CommandFlags::None).unwrap();

        assert!(!a.is_completed());
        assert!(!b.is_completed());
        assert_eq!(connection.request_count(), 0);
        assert_eq!(tx.state(), TransactionState::Building);

        connection.push_reply(AtomicReply::committed(vec![], vec![integer(10), integer(15)]));
        assert_eq!(tx.execute(), Ok(true));

        assert_eq!(a.try_result(), Some(Ok(10)));
        assert_eq!(b.try_result(), Some(Ok(15)));
        assert_eq!(tx.state(), TransactionState::Committed);
    }

    #[test]
    fn request_preserves_order_and_flags() {
        let (mut tx, connection) = create_transaction(ClientConfig::new(4));
        tx.add_condition(Condition::key_not_exists("guard")).unwrap();
        tx.string_increment("a", 1, CommandFlags::None).unwrap();
        tx.string_increment("b", 2, CommandFlags::FireAndForget).unwrap();
        tx.hash_set("h", "f", "v", CommandFlags::None).unwrap();

        connection.push_reply(AtomicReply::aborted(vec![false]));
        assert_eq!(tx.execute(), Ok(false));

        let requests = connection.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.database, 4);
        assert_eq!(request.conditions, vec![Condition::key_not_exists("guard")]);
        let names: Vec<_> = request.commands.iter().map(|c| c.command.name()).collect();
        assert_eq!(names, vec!["INCRBY", "INCRBY", "HSET"]);
        let flags: Vec<_> = request.commands.iter().map(|c| c.fire_and_forget).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn abort_cancels_results() {
        let (mut tx, connection) = create_transaction(ClientConfig::default());
        let guard = tx.add_condition(Condition::key_exists("guard")).unwrap();
        let result = tx.string_increment("k", 1, CommandFlags::None).unwrap();
        assert_eq!(guard.was_satisfied(), None);

        connection.push_reply(AtomicReply::aborted(vec![false]));
        assert_eq!(tx.execute(), Ok(false));

        assert_eq!(guard.was_satisfied(), Some(false));
        assert_eq!(result.status(), ResultStatus::Cancelled);
        assert_eq!(tx.state(), TransactionState::Aborted);
    }

    #[test]
    fn fire_and_forget_completes_immediately() {
        let (mut tx, connection) = create_transaction(ClientConfig::default());
        let result = tx
            .string_increment("k", 10, CommandFlags::FireAndForget)
            .unwrap();
        assert_eq!(result.try_result(), Some(Ok(0)));

        connection.push_reply(AtomicReply::committed(vec![], vec![integer(10)]));
        assert_eq!(tx.execute(), Ok(true));
        assert_eq!(result.try_result(), Some(Ok(0)));
    }

    #[test]
    fn empty_transaction_commits_without_round_trip() {
        let (mut tx, connection) = create_transaction(ClientConfig::default());
        connection.set_connected(false);

        assert_eq!(tx.execute(), Ok(true));
        assert_eq!(connection.request_count(), 0);
        assert_eq!(tx.state(), TransactionState::Committed);
    }

    #[test]
    fn transport_failure_reaches_every_result() {
        let (mut tx, connection) = create_transaction(ClientConfig::default());
        let guard = tx.add_condition(Condition::key_exists("g")).unwrap();
        let a = tx.string_get("k", CommandFlags::None).unwrap();
        let b = tx.key_delete("k", CommandFlags::FireAndForget).unwrap();

        connection.push_error(ClientError::transport_retryable("connection reset"));
        let err = tx.execute().unwrap_err();

        assert!(err.is_transport_failure());
        assert_eq!(a.try_result(), Some(Err(err.clone())));
        assert_eq!(b.try_result(), Some(Ok(false)));
        assert_eq!(guard.was_satisfied(), None);
        assert_eq!(tx.state(), TransactionState::Failed);
    }

    #[test]
    fn misuse_after_submission_is_rejected() {
        let (mut tx, connection) = create_transaction(ClientConfig::default());
        tx.key_exists("k", CommandFlags::None).unwrap();
        connection.push_reply(AtomicReply::committed(vec![], vec![integer(0)]));
        tx.execute().unwrap();

        let err = tx.key_exists("k", CommandFlags::None).unwrap_err();
        assert!(err.is_misuse());
        assert!(matches!(
            tx.add_condition(Condition::key_exists("k")),
            Err(ClientError::InvalidState { .. })
        ));
        assert_eq!(
            tx.execute(),
            Err(ClientError::invalid_state("committed", "execute"))
        );
        assert_eq!(connection.request_count(), 1);
        assert_eq!(tx.operation_count(), 1);
    }

    #[test]
    fn limits_are_enforced_at_queuing_time() {
        let config = ClientConfig::default()
            .with_max_operations(1)
            .with_max_conditions(1);
        let (mut tx, _) = create_transaction(config);

        tx.key_exists("a", CommandFlags::None).unwrap();
        assert!(matches!(
            tx.key_exists("b", CommandFlags::None),
            Err(ClientError::TooManyOperations { limit: 1, .. })
        ));

        tx.add_condition(Condition::key_exists("a")).unwrap();
        assert!(tx.add_condition(Condition::key_exists("b")).is_err());
        assert_eq!(tx.condition_count(), 1);
        assert_eq!(tx.state(), TransactionState::Building);
    }

    #[test]
    fn malformed_condition_is_rejected() {
        let (mut tx, _) = create_transaction(ClientConfig::default());
        let condition = Condition::new(
            txkv_protocol::ConditionKind::HashFieldExists,
            "h",
            None,
            txkv_protocol::Comparand::Absent,
        );
        assert!(condition.is_err());

        let condition = Condition::new(
            txkv_protocol::ConditionKind::KeyExists,
            "k",
            None,
            txkv_protocol::Comparand::Absent,
        )
        .unwrap();
        assert!(tx.add_condition(condition).is_ok());
    }

    #[test]
    fn execute_async_without_runtime_uses_thread() {
        let (mut tx, connection) = create_transaction(ClientConfig::default());
        let result = tx.string_increment("k", 3, CommandFlags::None).unwrap();
        connection.push_reply(AtomicReply::committed(vec![], vec![integer(3)]));

        let outcome = tx.execute_async().unwrap();
        assert_eq!(outcome.wait_timeout(Duration::from_secs(5)), Ok(true));
        assert_eq!(result.try_result(), Some(Ok(3)));
        assert!(tx.execute_async().is_err());
    }

    #[tokio::test]
    async fn execute_async_inside_runtime() {
        let (mut tx, connection) = create_transaction(ClientConfig::default());
        let result = tx.string_increment("k", 7, CommandFlags::None).unwrap();
        connection.push_reply(AtomicReply::committed(vec![], vec![integer(7)]));

        let outcome = tx.execute_async().unwrap();
        assert_eq!(outcome.await, Ok(true));
        assert_eq!(result.await, Ok(7));
    }

    struct PanickingConnection;

    impl Connection for PanickingConnection {
        fn execute_atomic(
            &self,
            _request: &AtomicRequest,
            _timeout: Duration,
        ) -> ClientResult<AtomicReply> {
            panic!("connection lost mid-call");
        }

        fn is_connected(&self) -> bool {
            true
        }

        fn close(&self) -> ClientResult<()> {
            Ok(())
        }
    }

    #[test]
    fn panicking_worker_faults_every_result() {
        let mut tx = Transaction::new(Arc::new(PanickingConnection), ClientConfig::default(), None);
        let result = tx.string_increment("k", 1, CommandFlags::None).unwrap();

        let outcome = tx.execute_async().unwrap();
        assert!(matches!(
            outcome.wait_timeout(Duration::from_secs(5)),
            Err(ClientError::Transport {
                retryable: false,
                ..
            })
        ));
        assert_eq!(result.status(), ResultStatus::Faulted);
        assert_eq!(tx.state(), TransactionState::Failed);
    }

    #[test]
    fn panic_during_execute_faults_every_result() {
        let mut tx = Transaction::new(Arc::new(PanickingConnection), ClientConfig::default(), None);
        let result = tx.string_increment("k", 1, CommandFlags::None).unwrap();

        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| tx.execute()));
        assert!(unwound.is_err());
        assert!(matches!(
            result.try_result(),
            Some(Err(ClientError::Transport { .. }))
        ));
        assert_eq!(tx.state(), TransactionState::Failed);
    }

    #[test]
    fn ids_are_unique() {
        let (a, _) = create_transaction(ClientConfig::default());
        let (b, _) = create_transaction(ClientConfig::default());
        assert_ne!(a.id(), b.id());
    }
}
