//! Entry point for creating transactions.

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::ClientResult;
use crate::pending::AsyncState;
use crate::transaction::Transaction;
use std::any::Any;
use std::sync::Arc;

/// A logical database reached through one connection.
///
/// Cheap to clone; clones share the connection.
pub struct Database<C: Connection> {
    connection: Arc<C>,
    config: ClientConfig,
}

impl<C: Connection> Database<C> {
    /// Creates a database handle over `connection`.
    pub fn new(connection: C, config: ClientConfig) -> Self {
        Self::with_shared(Arc::new(connection), config)
    }

    /// Creates a database handle over an already shared connection.
    pub fn with_shared(connection: Arc<C>, config: ClientConfig) -> Self {
        Self { connection, config }
    }

    /// Returns the connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns true if the connection is usable.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Closes the connection.
    pub fn close(&self) -> ClientResult<()> {
        self.connection.close()
    }

    /// Starts a new transaction.
    pub fn create_transaction(&self) -> Transaction<C> {
        Transaction::new(Arc::clone(&self.connection), self.config.clone(), None)
    }

    /// Starts a new transaction whose awaited results carry `state`.
    ///
    /// Fire-and-forget results never carry it.
    pub fn create_transaction_with_state<S: Any + Send + Sync>(&self, state: S) -> Transaction<C> {
        let state: AsyncState = Arc::new(state);
        Transaction::new(
            Arc::clone(&self.connection),
            self.config.clone(),
            Some(state),
        )
    }
}

impl<C: Connection> Clone for Database<C> {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MockConnection;
    use crate::operation::CommandFlags;

    #[test]
    fn transactions_share_connection() {
        let db = Database::new(MockConnection::new(), ClientConfig::new(1));
        let a = db.create_transaction();
        let b = db.clone().create_transaction();

        assert_ne!(a.id(), b.id());
        assert_eq!(db.config().database, 1);
        assert!(db.is_connected());

        db.close().unwrap();
        assert!(!db.connection().is_connected());
    }

    #[test]
    fn state_is_attached_to_awaited_results_only() {
        let db = Database::new(MockConnection::new(), ClientConfig::default());
        let mut tx = db.create_transaction_with_state("state");

        let awaited = tx.string_increment("k", 1, CommandFlags::None).unwrap();
        let ignored = tx
            .string_increment("k", 1, CommandFlags::FireAndForget)
            .unwrap();

        assert_eq!(awaited.state_as::<&str>(), Some(&"state"));
        assert!(ignored.async_state().is_none());
        assert!(tx.async_state().is_some());
    }
}
