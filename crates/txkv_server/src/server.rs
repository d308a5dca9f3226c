//! Main store server.

use crate::config::ServerConfig;
use crate::error::{CommandError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler};
use crate::keyspace::Keyspace;
use parking_lot::Mutex;
use std::sync::Arc;
use txkv_protocol::{AtomicReply, AtomicRequest, Key, ResponseFrame};

/// The store server.
///
/// Hosts numbered in-memory keyspaces and evaluates atomic units against
/// them. Direct accessors bypass the unit path and are meant for seeding
/// and inspecting state.
///
/// # Example
///
/// ```
/// use txkv_server::{ServerConfig, StoreServer};
///
/// let server = StoreServer::new(ServerConfig::default());
/// let db = server.database(0).unwrap();
/// db.string_set("greeting", "hello");
/// assert_eq!(db.string_get("greeting").unwrap(), Some(b"hello".to_vec()));
/// ```
pub struct StoreServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl StoreServer {
    /// Creates a new store server.
    pub fn new(config: ServerConfig) -> Self {
        let context = Arc::new(HandlerContext::new(config));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Evaluates an atomic unit.
    pub fn handle_atomic(&self, request: &AtomicRequest) -> Result<AtomicReply, String> {
        self.handler
            .handle_atomic(request)
            .map_err(|e| e.to_string())
    }

    /// Handles an encoded request frame, returning an encoded response frame.
    ///
    /// Refusals travel in-band as [`ResponseFrame::Rejected`]; only a failure
    /// to encode the response itself is returned as `Err`.
    pub fn handle_frame(&self, body: &[u8]) -> Result<Vec<u8>, String> {
        let response = match AtomicRequest::decode(body) {
            Ok(request) => match self.handle_atomic(&request) {
                Ok(reply) => ResponseFrame::Reply(reply),
                Err(message) => ResponseFrame::Rejected(message),
            },
            Err(e) => ResponseFrame::Rejected(e.to_string()),
        };
        response.encode().map_err(|e| e.to_string())
    }

    /// Returns a handle for direct, non-transactional access to a database.
    pub fn database(&self, index: u32) -> ServerResult<DatabaseHandle<'_>> {
        Ok(DatabaseHandle {
            keyspace: self.context.database(index)?,
        })
    }

    /// Removes every key in one database.
    pub fn flush_database(&self, index: u32) -> ServerResult<()> {
        self.database(index).map(|db| db.flush())
    }

    /// Returns the total number of keys across all databases.
    pub fn key_count(&self) -> usize {
        (0..self.context.config.databases)
            .filter_map(|index| self.context.database(index).ok())
            .map(|keyspace| keyspace.lock().len())
            .sum()
    }
}

/// Direct access to one database.
///
/// Each call takes the database lock on its own; calls are not atomic with
/// respect to each other.
pub struct DatabaseHandle<'a> {
    keyspace: &'a Mutex<Keyspace>,
}

impl DatabaseHandle<'_> {
    /// Returns the string at `key`.
    pub fn string_get(&self, key: impl Into<Key>) -> Result<Option<Vec<u8>>, CommandError> {
        let keyspace = self.keyspace.lock();
        keyspace
            .get(&key.into())
            .map(|value| value.map(<[u8]>::to_vec))
    }

    /// Stores a string.
    pub fn string_set(&self, key: impl Into<Key>, value: impl Into<Vec<u8>>) {
        self.keyspace.lock().set(key.into(), value.into());
    }

    /// Returns a hash field.
    pub fn hash_get(
        &self,
        key: impl Into<Key>,
        field: impl AsRef<[u8]>,
    ) -> Result<Option<Vec<u8>>, CommandError> {
        let keyspace = self.keyspace.lock();
        keyspace
            .hget(&key.into(), field.as_ref())
            .map(|value| value.map(<[u8]>::to_vec))
    }

    /// Sets a hash field, returning true if the field is new.
    pub fn hash_set(
        &self,
        key: impl Into<Key>,
        field: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Result<bool, CommandError> {
        self.keyspace
            .lock()
            .hset(key.into(), field.into(), value.into())
    }

    /// Returns true if `key` exists.
    pub fn key_exists(&self, key: impl Into<Key>) -> bool {
        self.keyspace.lock().exists(&key.into())
    }

    /// Removes `key`, returning true if it existed.
    pub fn key_delete(&self, key: impl Into<Key>) -> bool {
        self.keyspace.lock().delete(&key.into())
    }

    /// Removes every key in this database.
    pub fn flush(&self) {
        self.keyspace.lock().clear();
    }

    /// Returns the number of keys in this database.
    pub fn len(&self) -> usize {
        self.keyspace.lock().len()
    }

    /// Returns true if this database holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keyspace.lock().is_empty()
    }
}
