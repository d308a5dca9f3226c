//! Configuration for the transactional client.

use std::time::Duration;

/// Configuration for transactions created from one [`Database`](crate::Database).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Database index every unit is evaluated against.
    pub database: u32,
    /// Round-trip timeout handed to the connection.
    pub timeout: Duration,
    /// Maximum number of queued operations per transaction.
    pub max_operations: usize,
    /// Maximum number of conditions per transaction.
    pub max_conditions: usize,
}

impl ClientConfig {
    /// Creates a configuration targeting `database`.
    pub fn new(database: u32) -> Self {
        Self {
            database,
            timeout: Duration::from_secs(30),
            max_operations: 10_000,
            max_conditions: 1_000,
        }
    }

    /// Sets the round-trip timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the per-transaction operation limit.
    pub fn with_max_operations(mut self, max: usize) -> Self {
        self.max_operations = max;
        self
    }

    /// Sets the per-transaction condition limit.
    pub fn with_max_conditions(mut self, max: usize) -> Self {
        self.max_conditions = max;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(0)
    }
}
