use crate::config::DatabaseConfig;
use crate::connection::ConnectionParams;

/// Default pool capacity
pub const DEFAULT_MAX_CONNECTIONS: usize = 5;

/// Capacity and connection parameters for a [`crate::pool::ConnectionPool`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: usize,
    pub params: ConnectionParams,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            params: ConnectionParams::default(),
        }
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            params: config.connection_params(),
        }
    }
}
