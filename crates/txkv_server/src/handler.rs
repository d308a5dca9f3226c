//! Check-and-execute evaluation of atomic units.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::keyspace::Keyspace;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};
use txkv_protocol::{AtomicReply, AtomicRequest, PROTOCOL_VERSION};

/// Context shared by request handlers.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// One keyspace per database index.
    databases: Vec<Mutex<Keyspace>>,
}

impl HandlerContext {
    /// Creates a new handler context with empty keyspaces.
    pub fn new(config: ServerConfig) -> Self {
        let databases = (0..config.databases)
            .map(|_| Mutex::new(Keyspace::new()))
            .collect();
        Self { config, databases }
    }

    /// Returns the keyspace for `index`.
    pub fn database(&self, index: u32) -> ServerResult<&Mutex<Keyspace>> {
        self.databases
            .get(index as usize)
            .ok_or(ServerError::UnknownDatabase(index))
    }
}

/// Evaluates atomic units against the shared keyspaces.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Evaluates every condition and, iff all hold, executes every command.
    ///
    /// The database lock is held across both phases, so no other unit or
    /// direct access can observe or modify the keyspace in between.
    pub fn handle_atomic(&self, request: &AtomicRequest) -> ServerResult<AtomicReply> {
        if let Err(e) = self.validate(request) {
            warn!(error = %e, "rejecting atomic unit");
            return Err(e);
        }

        let mut keyspace = self.context.database(request.database)?.lock();

        let condition_results: Vec<bool> = request
            .conditions
            .iter()
            .map(|condition| condition.is_satisfied_by(keyspace.observe(condition)))
            .collect();

        let reply = if condition_results.iter().all(|held| *held) {
            let command_results = request
                .commands
                .iter()
                .map(|queued| keyspace.execute(&queued.command))
                .collect();
            AtomicReply::committed(condition_results, command_results)
        } else {
            AtomicReply::aborted(condition_results)
        };

        debug!(
            database = request.database,
            conditions = request.conditions.len(),
            commands = request.commands.len(),
            committed = reply.committed,
            "evaluated atomic unit"
        );

        Ok(reply)
    }

    fn validate(&self, request: &AtomicRequest) -> ServerResult<()> {
        if request.protocol_version != PROTOCOL_VERSION {
            return Err(ServerError::ProtocolMismatch(format!(
                "expected {}, got {}",
                PROTOCOL_VERSION, request.protocol_version
            )));
        }

        let config = &self.context.config;
        if request.commands.len() > config.max_commands {
            return Err(ServerError::LimitExceeded {
                what: "command",
                actual: request.commands.len(),
                limit: config.max_commands,
            });
        }
        if request.conditions.len() > config.max_conditions {
            return Err(ServerError::LimitExceeded {
                what: "condition",
                actual: request.conditions.len(),
                limit: config.max_conditions,
            });
        }

        for condition in &request.conditions {
            condition
                .validate()
                .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
        }

        self.context.database(request.database).map(|_| ())
    }
}
