//! Turns a transaction's accumulated contents into one atomic unit.

use crate::condition::ConditionHandle;
use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::{ClientError, ClientResult};
use crate::operation::PendingOperation;
use tracing::{trace, warn};
use txkv_protocol::{AtomicReply, AtomicRequest};

/// Sends atomic units over a [`Connection`] and checks the shape of replies.
///
/// The conditions and commands of one transaction always travel in a single
/// request, so the store checks and executes them in one indivisible step.
pub struct AtomicDispatcher<'a, C: Connection + ?Sized> {
    connection: &'a C,
    config: &'a ClientConfig,
}

impl<'a, C: Connection + ?Sized> AtomicDispatcher<'a, C> {
    /// Creates a dispatcher over `connection`.
    pub fn new(connection: &'a C, config: &'a ClientConfig) -> Self {
        Self { connection, config }
    }

    /// Builds the request for the given conditions and operations, in order.
    pub(crate) fn build_request(
        &self,
        conditions: &[ConditionHandle],
        operations: &[PendingOperation],
    ) -> AtomicRequest {
        AtomicRequest::new(
            self.config.database,
            conditions
                .iter()
                .map(|handle| handle.condition().clone())
                .collect(),
            operations.iter().map(PendingOperation::to_queued).collect(),
        )
    }

    /// Performs the round trip for `request`.
    ///
    /// # Errors
    ///
    /// Returns the connection's error if the unit could not be delivered or
    /// no reply arrived, and [`ClientError::Protocol`] if the reply does not
    /// match the request.
    pub fn dispatch(&self, request: &AtomicRequest) -> ClientResult<AtomicReply> {
        if !self.connection.is_connected() {
            return Err(ClientError::NotConnected);
        }

        trace!(
            database = request.database,
            conditions = request.conditions.len(),
            commands = request.commands.len(),
            "dispatching atomic unit"
        );
        let reply = self
            .connection
            .execute_atomic(request, self.config.timeout)?;

        if let Err(e) = check_shape(request, &reply) {
            warn!(error = %e, "discarding malformed reply");
            return Err(e);
        }
        Ok(reply)
    }
}

fn check_shape(request: &AtomicRequest, reply: &AtomicReply) -> ClientResult<()> {
    if reply.condition_results.len() != request.conditions.len() {
        return Err(ClientError::Protocol(format!(
            "expected {} condition results, got {}",
            request.conditions.len(),
            reply.condition_results.len()
        )));
    }

    if reply.committed {
        if reply.condition_results.iter().any(|held| !held) {
            return Err(ClientError::Protocol(
                "committed reply reports an unsatisfied condition".into(),
            ));
        }
        let received = reply.command_results.as_ref().map_or(0, Vec::len);
        if reply.command_results.is_none() || received != request.commands.len() {
            return Err(ClientError::Protocol(format!(
                "expected {} command results, got {}",
                request.commands.len(),
                received
            )));
        }
    }
    Ok(())
}
