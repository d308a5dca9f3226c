//! Connection abstraction for atomic units.

use crate::error::{ClientError, ClientResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use txkv_protocol::{AtomicReply, AtomicRequest};

/// A connection delivers atomic units to the store.
///
/// Implementations must have the store evaluate the whole unit indivisibly:
/// every condition, then every command iff all conditions held, with no
/// other client's commands interleaved. A failure to deliver the unit or to
/// receive its reply is an error, never an aborted reply.
pub trait Connection: Send + Sync {
    /// Sends one unit and waits at most `timeout` for its reply.
    fn execute_atomic(&self, request: &AtomicRequest, timeout: Duration)
        -> ClientResult<AtomicReply>;

    /// Checks if the connection is usable.
    fn is_connected(&self) -> bool;

    /// Closes the connection.
    fn close(&self) -> ClientResult<()>;
}

/// A mock connection for testing.
///
/// Replies are scripted in order; every request is captured.
#[derive(Debug)]
pub struct MockConnection {
    connected: AtomicBool,
    replies: Mutex<VecDeque<ClientResult<AtomicReply>>>,
    requests: Mutex<Vec<AtomicRequest>>,
}

impl MockConnection {
    /// Creates a new connected mock.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a reply for the next unit.
    pub fn push_reply(&self, reply: AtomicReply) {
        self.replies.lock().push_back(Ok(reply));
    }

    /// Queues a failure for the next unit.
    pub fn push_error(&self, error: ClientError) {
        self.replies.lock().push_back(Err(error));
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Returns every unit received so far.
    pub fn requests(&self) -> Vec<AtomicRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of units received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection for MockConnection {
    fn execute_atomic(
        &self,
        request: &AtomicRequest,
        _timeout: Duration,
    ) -> ClientResult<AtomicReply> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.requests.lock().push(request.clone());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Protocol("no mock reply set".into())))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) -> ClientResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AtomicRequest {
        AtomicRequest::new(0, vec![], vec![])
    }

    #[test]
    fn mock_connection_lifecycle() {
        let connection = MockConnection::new();
        assert!(connection.is_connected());

        connection.set_connected(false);
        assert!(!connection.is_connected());

        connection.set_connected(true);
        connection.close().unwrap();
        assert!(!connection.is_connected());
    }

    #[test]
    fn mock_connection_not_connected_error() {
        let connection = MockConnection::new();
        connection.set_connected(false);

        let result = connection.execute_atomic(&request(), Duration::from_secs(1));
        assert!(matches!(result, Err(ClientError::NotConnected)));
        assert_eq!(connection.request_count(), 0);
    }

    #[test]
    fn mock_connection_scripted_replies() {
        let connection = MockConnection::new();
        connection.push_reply(AtomicReply::aborted(vec![false]));
        connection.push_error(ClientError::Timeout);

        let first = connection
            .execute_atomic(&request(), Duration::from_secs(1))
            .unwrap();
        assert!(!first.committed);

        let second = connection.execute_atomic(&request(), Duration::from_secs(1));
        assert_eq!(second, Err(ClientError::Timeout));

        let third = connection.execute_atomic(&request(), Duration::from_secs(1));
        assert!(matches!(third, Err(ClientError::Protocol(_))));
        assert_eq!(connection.request_count(), 3);
    }
}
