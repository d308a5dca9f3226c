//! Server configuration.

/// Configuration for the store server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Number of numbered databases (keyspaces).
    pub databases: u32,
    /// Maximum commands accepted in one atomic unit.
    pub max_commands: usize,
    /// Maximum conditions accepted in one atomic unit.
    pub max_conditions: usize,
}

impl ServerConfig {
    /// Creates a new server configuration with `databases` keyspaces.
    pub fn new(databases: u32) -> Self {
        Self {
            databases,
            max_commands: 10_000,
            max_conditions: 1_000,
        }
    }

    /// Sets the maximum commands per unit.
    pub fn with_max_commands(mut self, max: usize) -> Self {
        self.max_commands = max;
        self
    }

    /// Sets the maximum conditions per unit.
    pub fn with_max_conditions(mut self, max: usize) -> Self {
        self.max_conditions = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(16)
    }
}
