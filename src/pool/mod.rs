//! Connection pooling.
//!
//! [`ConnectionPool`] bounds how many connections are created, recycles returned ones,
//! and hands out [`PooledConnection`] guards for scoped use.

pub mod config;
pub mod manager;
pub mod types;

pub use config::PoolConfig;
pub use manager::ConnectionPool;
pub use types::PooledConnection;
