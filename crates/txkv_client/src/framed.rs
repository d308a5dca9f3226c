//! Framed connection implementation.
//!
//! Each atomic unit travels as one CBOR request frame and comes back as one
//! response frame. The byte transport is abstracted via [`FrameClient`] so
//! that sockets, pipes or an in-process server can carry the frames.

use crate::connection::Connection;
use crate::error::{ClientError, ClientResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::warn;
use txkv_protocol::{AtomicReply, AtomicRequest, ResponseFrame};

/// Byte transport for frames.
pub trait FrameClient: Send + Sync {
    /// Sends one request frame and returns the response frame.
    fn send(&self, frame: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, String>;

    /// Checks if the transport is healthy.
    fn is_healthy(&self) -> bool;
}

/// Connection that encodes atomic units as CBOR frames.
pub struct FramedConnection<C: FrameClient> {
    client: C,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl<C: FrameClient> FramedConnection<C> {
    /// Creates a new framed connection.
    pub fn new(client: C) -> Self {
        Self {
            client,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }
}

impl<C: FrameClient> Connection for FramedConnection<C> {
    fn execute_atomic(
        &self,
        request: &AtomicRequest,
        timeout: Duration,
    ) -> ClientResult<AtomicReply> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let frame = request
            .encode()
            .map_err(|e| ClientError::Protocol(format!("failed to encode request: {e}")))?;

        let body = self.client.send(frame, timeout).map_err(|e| {
            warn!(error = %e, "frame transport failed");
            *self.last_error.write() = Some(e.clone());
            self.connected.store(false, Ordering::SeqCst);
            ClientError::transport_retryable(e)
        })?;
        *self.last_error.write() = None;

        match ResponseFrame::decode(&body)
            .map_err(|e| ClientError::Protocol(format!("failed to decode response: {e}")))?
        {
            ResponseFrame::Reply(reply) => Ok(reply),
            ResponseFrame::Rejected(message) => Err(ClientError::Server(message)),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }

    fn close(&self) -> ClientResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Trait for servers that can handle frames in-process.
pub trait LoopbackServer {
    /// Handles one request frame and returns the response frame.
    fn handle_frame(&self, frame: &[u8]) -> Result<Vec<u8>, String>;
}

/// A frame client that routes frames directly to an in-process server.
///
/// Useful for testing the full encode/decode path without a network.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

impl<S: LoopbackServer + Send + Sync> FrameClient for LoopbackClient<S> {
    fn send(&self, frame: Vec<u8>, _timeout: Duration) -> Result<Vec<u8>, String> {
        self.server.handle_frame(&frame)
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
