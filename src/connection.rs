//! Connection Module
//!
//! Opens and closes single handles to the document store.
//!
//! This module wraps a [`StoreDriver`] and provides:
//! - Connection parameter validation
//! - Connection establishment (with timing, metrics and tracing)
//! - The [`Connection`] handle the pool hands out
//!
//! The pool is the only component that should call [`ConnectionFactory::open`]; everything
//! else borrows connections through [`crate::pool::ConnectionPool::acquire`].

use crate::store::{StoreConnection, StoreDriver};
use serde::Deserialize;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Parameters used to open a connection
///
/// Defaults match a local development server: `localhost:28015`, database `test`, no
/// auth key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionParams {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub auth_key: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    28015
}

fn default_database() -> String {
    "test".to_string()
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            auth_key: String::new(),
        }
    }
}

/// Connection error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Invalid connection parameters
    InvalidParameters(String),
    /// The driver refused the connection (network, authentication, ...)
    Rejected(String),
    /// Closing the handle failed
    CloseFailed(String),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::InvalidParameters(s) => {
                write!(f, "Invalid connection parameters: {}", s)
            }
            ConnectionError::Rejected(s) => {
                write!(f, "Connection rejected: {}", s)
            }
            ConnectionError::CloseFailed(s) => {
                write!(f, "Failed to close connection: {}", s)
            }
        }
    }
}

impl std::error::Error for ConnectionError {}

/// Validates connection parameters
///
/// # Returns
///
/// Returns `Ok(())` if host and database are non-empty and the port is non-zero.
pub fn validate_params(params: &ConnectionParams) -> Result<(), ConnectionError> {
    if params.host.trim().is_empty() {
        return Err(ConnectionError::InvalidParameters(
            "host cannot be empty".to_string(),
        ));
    }
    if params.port == 0 {
        return Err(ConnectionError::InvalidParameters(
            "port must be non-zero".to_string(),
        ));
    }
    if params.database.trim().is_empty() {
        return Err(ConnectionError::InvalidParameters(
            "database cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// A live handle to one database
///
/// Dereferences to the driver's [`StoreConnection`], so queries are issued directly on
/// the connection. The serial number is unique per factory and identifies the handle in
/// logs and tests.
pub struct Connection {
    serial: u64,
    params: ConnectionParams,
    handle: Box<dyn StoreConnection>,
}

impl Connection {
    /// Serial number assigned by the factory that opened this handle
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Parameters the handle was opened with
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Close the underlying handle
    pub fn close(mut self) -> Result<(), ConnectionError> {
        log::debug!("closing connection #{}", self.serial);
        self.handle
            .close()
            .map_err(|e| ConnectionError::CloseFailed(e.to_string()))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("serial", &self.serial)
            .field("host", &self.params.host)
            .field("port", &self.params.port)
            .field("database", &self.params.database)
            .finish()
    }
}

impl Deref for Connection {
    type Target = dyn StoreConnection;

    fn deref(&self) -> &Self::Target {
        self.handle.as_ref()
    }
}

impl DerefMut for Connection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.handle.as_mut()
    }
}

/// Opens connections through a driver
pub struct ConnectionFactory {
    driver: Arc<dyn StoreDriver>,
    next_serial: AtomicU64,
}

impl ConnectionFactory {
    /// Create a factory over the given driver
    pub fn new(driver: Arc<dyn StoreDriver>) -> Self {
        Self {
            driver,
            next_serial: AtomicU64::new(1),
        }
    }

    /// Establishes a connection
    ///
    /// # Arguments
    ///
    /// * `params` - Host, port, database and auth key to connect with
    ///
    /// # Returns
    ///
    /// Returns a [`Connection`] on success, or a `ConnectionError` if the parameters are
    /// invalid or the driver refuses the connection.
    ///
    /// # Examples
    ///
    /// ```
    /// use docguard::connection::{ConnectionFactory, ConnectionParams};
    /// use docguard::store::memory::MemoryStore;
    /// use std::sync::Arc;
    ///
    /// let factory = ConnectionFactory::new(Arc::new(MemoryStore::new().with_database("test")));
    /// let conn = factory.open(&ConnectionParams::default())?;
    /// assert_eq!(conn.serial(), 1);
    /// # Ok::<(), docguard::connection::ConnectionError>(())
    /// ```
    pub fn open(&self, params: &ConnectionParams) -> Result<Connection, ConnectionError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::acquire_connection_span(&params.host, params.port).entered();

        let start = Instant::now();

        validate_params(params)?;
        let handle = self.driver.connect(params)?;
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);

        let duration = start.elapsed();
        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_connection_opened(duration);

        log::debug!(
            "opened connection #{} to {}:{}/{} in {:?}",
            serial,
            params.host,
            params.port,
            params.database,
            duration
        );

        Ok(Connection {
            serial,
            params: params.clone(),
            handle,
        })
    }

    /// Close a connection previously opened by this factory
    pub fn close(&self, connection: Connection) -> Result<(), ConnectionError> {
        connection.close()
    }
}

impl fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionFactory")
            .field("next_serial", &self.next_serial.load(Ordering::Relaxed))
            .finish()
    }
}
