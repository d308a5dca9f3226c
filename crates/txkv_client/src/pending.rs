//! Deferred, single-assignment results for queued operations.
//!
//! A [`PendingResult`] is an explicit result cell. It starts `Pending` and is
//! settled exactly once: completed with a value, cancelled because the
//! transaction aborted, or faulted with an error. It can be polled, blocked
//! on, or awaited as a [`Future`].

use crate::error::{ClientError, ClientResult};
use crate::reply::FromRawValue;
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};
use tracing::warn;
use txkv_protocol::CommandReply;

/// Caller-supplied correlation state attached to results.
pub type AsyncState = Arc<dyn Any + Send + Sync>;

/// Observable state of a [`PendingResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    /// Not settled yet.
    Pending,
    /// Settled with a value.
    Completed,
    /// The transaction aborted; no value will ever be produced.
    Cancelled,
    /// Settled with an error.
    Faulted,
}

impl ResultStatus {
    /// Returns true for every state except `Pending`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResultStatus::Pending)
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultStatus::Pending => write!(f, "pending"),
            ResultStatus::Completed => write!(f, "completed"),
            ResultStatus::Cancelled => write!(f, "cancelled"),
            ResultStatus::Faulted => write!(f, "faulted"),
        }
    }
}

enum Outcome<T> {
    Pending,
    Completed(T),
    Cancelled,
    Faulted(ClientError),
}

impl<T> Outcome<T> {
    fn status(&self) -> ResultStatus {
        match self {
            Outcome::Pending => ResultStatus::Pending,
            Outcome::Completed(_) => ResultStatus::Completed,
            Outcome::Cancelled => ResultStatus::Cancelled,
            Outcome::Faulted(_) => ResultStatus::Faulted,
        }
    }
}

impl<T: Clone> Outcome<T> {
    fn to_result(&self) -> Option<ClientResult<T>> {
        match self {
            Outcome::Pending => None,
            Outcome::Completed(value) => Some(Ok(value.clone())),
            Outcome::Cancelled => Some(Err(ClientError::Cancelled)),
            Outcome::Faulted(error) => Some(Err(error.clone())),
        }
    }
}

struct Slot<T> {
    outcome: Outcome<T>,
    wakers: Vec<Waker>,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    settled: Condvar,
    async_state: Option<AsyncState>,
}

/// The deferred result of one queued operation.
///
/// Clones share the same cell.
pub struct PendingResult<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for PendingResult<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> PendingResult<T> {
    fn with_outcome(outcome: Outcome<T>, async_state: Option<AsyncState>) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    outcome,
                    wakers: Vec::new(),
                }),
                settled: Condvar::new(),
                async_state,
            }),
        }
    }

    /// Creates an unsettled result carrying `async_state`.
    pub(crate) fn pending(async_state: Option<AsyncState>) -> Self {
        Self::with_outcome(Outcome::Pending, async_state)
    }

    /// Creates a result that is already completed and carries no state.
    pub(crate) fn ready(value: T) -> Self {
        Self::with_outcome(Outcome::Completed(value), None)
    }

    /// Returns the current status.
    pub fn status(&self) -> ResultStatus {
        self.shared.slot.lock().outcome.status()
    }

    /// Returns true once the result reached any terminal state.
    pub fn is_completed(&self) -> bool {
        self.status().is_terminal()
    }

    /// Returns true if the owning transaction aborted.
    pub fn is_cancelled(&self) -> bool {
        self.status() == ResultStatus::Cancelled
    }

    /// Returns the correlation state supplied when the transaction was created.
    ///
    /// Fire-and-forget results never carry state.
    pub fn async_state(&self) -> Option<&AsyncState> {
        self.shared.async_state.as_ref()
    }

    /// Returns the correlation state if it is an `S`.
    pub fn state_as<S: Any + Send + Sync>(&self) -> Option<&S> {
        self.shared.async_state.as_deref()?.downcast_ref::<S>()
    }

    pub(crate) fn resolve(&self, value: T) -> bool {
        self.settle(Outcome::Completed(value))
    }

    pub(crate) fn cancel(&self) -> bool {
        self.settle(Outcome::Cancelled)
    }

    pub(crate) fn fail(&self, error: ClientError) -> bool {
        self.settle(Outcome::Faulted(error))
    }

    fn settle(&self, outcome: Outcome<T>) -> bool {
        let wakers = {
            let mut slot = self.shared.slot.lock();
            if slot.outcome.status().is_terminal() {
                warn!(
                    current = %slot.outcome.status(),
                    discarded = %outcome.status(),
                    "result already settled"
                );
                return false;
            }
            slot.outcome = outcome;
            std::mem::take(&mut slot.wakers)
        };

        self.shared.settled.notify_all();
        for waker in wakers {
            waker.wake();
        }
        true
    }
}

impl<T: Clone> PendingResult<T> {
    /// Returns the outcome if settled, without blocking.
    ///
    /// A cancelled result yields [`ClientError::Cancelled`].
    pub fn try_result(&self) -> Option<ClientResult<T>> {
        self.shared.slot.lock().outcome.to_result()
    }

    /// Blocks the calling thread until the result is settled.
    pub fn wait(&self) -> ClientResult<T> {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(result) = slot.outcome.to_result() {
                return result;
            }
            self.shared.settled.wait(&mut slot);
        }
    }

    /// Blocks for at most `timeout`.
    ///
    /// Returns [`ClientError::Timeout`] if the result is still pending. The
    /// result itself is left untouched and may settle later.
    pub fn wait_timeout(&self, timeout: Duration) -> ClientResult<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(result) = slot.outcome.to_result() {
                return result;
            }
            if self
                .shared
                .settled
                .wait_until(&mut slot, deadline)
                .timed_out()
            {
                return slot.outcome.to_result().unwrap_or(Err(ClientError::Timeout));
            }
        }
    }
}

impl<T: Clone> Future for PendingResult<T> {
    type Output = ClientResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.shared.slot.lock();
        if let Some(result) = slot.outcome.to_result() {
            return Poll::Ready(result);
        }
        if !slot.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            slot.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl<T> fmt::Debug for PendingResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult")
            .field("status", &self.status())
            .field("has_state", &self.shared.async_state.is_some())
            .finish()
    }
}

/// Type-erased sink the demultiplexer settles a queued operation through.
pub(crate) trait Completion: Send + Sync {
    /// Settles with the operation's reply, decoding it to the result type.
    fn complete(&self, reply: CommandReply);

    /// Settles as cancelled.
    fn cancel(&self);

    /// Settles with an error.
    fn fail(&self, error: ClientError);
}

impl<T: FromRawValue + Send + 'static> Completion for PendingResult<T> {
    fn complete(&self, reply: CommandReply) {
        let decoded = match reply {
            CommandReply::Ok(raw) => T::from_raw(raw),
            CommandReply::Err(message) => Err(ClientError::Command(message)),
        };
        match decoded {
            Ok(value) => self.resolve(value),
            Err(error) => PendingResult::fail(self, error),
        };
    }

    fn cancel(&self) {
        PendingResult::cancel(self);
    }

    fn fail(&self, error: ClientError) {
        PendingResult::fail(self, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use txkv_protocol::RawValue;

    #[test]
    fn starts_pending() {
        let result = PendingResult::<i64>::pending(None);
        assert_eq!(result.status(), ResultStatus::Pending);
        assert!(!result.is_completed());
        assert!(result.try_result().is_none());
    }

    #[test]
    fn settles_exactly_once() {
        let result = PendingResult::<i64>::pending(None);
        assert!(result.resolve(5));
        assert!(!result.resolve(6));
        assert!(!result.cancel());

        assert_eq!(result.status(), ResultStatus::Completed);
        assert_eq!(result.wait(), Ok(5));
    }

    #[test]
    fn cancelled_result_reports_cancelled() {
        let result = PendingResult::<i64>::pending(None);
        result.cancel();

        assert!(result.is_cancelled());
        assert!(result.is_completed());
        assert_eq!(result.wait(), Err(ClientError::Cancelled));
    }

    #[test]
    fn ready_result_has_no_state() {
        let result = PendingResult::ready(0i64);
        assert_eq!(result.try_result(), Some(Ok(0)));
        assert!(result.async_state().is_none());
    }

    #[test]
    fn correlation_state_downcasts() {
        let state: AsyncState = Arc::new("state");
        let result = PendingResult::<i64>::pending(Some(state));

        assert_eq!(result.state_as::<&str>(), Some(&"state"));
        assert!(result.state_as::<u32>().is_none());
    }

    #[test]
    fn wait_timeout_leaves_result_pending() {
        let result = PendingResult::<i64>::pending(None);
        assert_eq!(
            result.wait_timeout(Duration::from_millis(10)),
            Err(ClientError::Timeout)
        );
        assert_eq!(result.status(), ResultStatus::Pending);
    }

    #[test]
    fn wait_wakes_on_other_thread() {
        let result = PendingResult::<i64>::pending(None);
        let settler = result.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            settler.resolve(42);
        });

        assert_eq!(result.wait(), Ok(42));
        handle.join().unwrap();
    }

    #[test]
    fn completion_decodes_reply() {
        let result = PendingResult::<i64>::pending(None);
        Completion::complete(&result, CommandReply::Ok(RawValue::Integer(10)));
        assert_eq!(result.try_result(), Some(Ok(10)));

        let result = PendingResult::<i64>::pending(None);
        Completion::complete(&result, CommandReply::error("WRONGTYPE"));
        assert_eq!(
            result.try_result(),
            Some(Err(ClientError::Command("WRONGTYPE".into())))
        );

        let result = PendingResult::<i64>::pending(None);
        Completion::complete(&result, CommandReply::Ok(RawValue::Nil));
        assert_eq!(result.status(), ResultStatus::Faulted);
    }

    #[tokio::test]
    async fn awaits_as_future() {
        let result = PendingResult::<Option<String>>::pending(None);
        let settler = result.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            settler.resolve(Some("done".into()));
        });

        assert_eq!(result.await, Ok(Some("done".to_string())));
    }
}
