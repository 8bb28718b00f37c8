//! Bounded, non-blocking connection pool.
//!
//! The pool keeps two pieces of state:
//! - an idle FIFO of released connections (a `crossbeam_channel`, safe to push and pop
//!   from any thread), and
//! - a mutex-guarded record of capacity, connection parameters and the `created` counter.
//!
//! `get` first tries the idle queue. Only when it is empty does it take the mutex and run
//! check → open → increment as one critical section, so concurrent callers can never
//! push `created` past `max_connections`. The pool never waits: if nothing is idle and
//! the cap is reached, `get` fails with [`OrmError::PoolExhausted`] immediately.
//!
//! `put` decrements `created`. The counter therefore tracks connections currently
//! checked out by pool-driven creation rather than handles alive in the process; a
//! recycled handle taken from the idle queue is not counted again.

use crate::config::DatabaseConfig;
use crate::connection::{Connection, ConnectionFactory, ConnectionParams};
use crate::error::OrmError;
use crate::pool::config::PoolConfig;
use crate::pool::types::PooledConnection;
use crate::store::StoreDriver;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

#[derive(Debug)]
struct PoolState {
    max_connections: usize,
    params: ConnectionParams,
    created: usize,
}

/// Connection pool shared by every mapper operation
///
/// # Examples
///
/// ```
/// use docguard::pool::ConnectionPool;
/// use docguard::connection::ConnectionParams;
/// use docguard::store::memory::MemoryStore;
/// use std::sync::Arc;
///
/// let pool = ConnectionPool::new(Arc::new(MemoryStore::new().with_database("test")));
/// pool.configure(2, ConnectionParams::default());
///
/// let a = pool.get()?;
/// let b = pool.get()?;
/// assert!(pool.get().is_err());
///
/// pool.put(a);
/// let c = pool.get()?;
/// assert!(pool.created() <= 2);
/// # pool.put(b);
/// # pool.put(c);
/// # Ok::<(), docguard::OrmError>(())
/// ```
pub struct ConnectionPool {
    factory: ConnectionFactory,
    idle_tx: Sender<Connection>,
    idle_rx: Receiver<Connection>,
    state: Mutex<PoolState>,
}

impl ConnectionPool {
    /// Create a pool with the default capacity and connection parameters
    pub fn new(driver: Arc<dyn StoreDriver>) -> Self {
        Self::with_config(driver, PoolConfig::default())
    }

    /// Create a pool with an explicit configuration
    pub fn with_config(driver: Arc<dyn StoreDriver>, config: PoolConfig) -> Self {
        let (idle_tx, idle_rx) = unbounded();
        Self {
            factory: ConnectionFactory::new(driver),
            idle_tx,
            idle_rx,
            state: Mutex::new(PoolState {
                max_connections: config.max_connections,
                params: config.params,
                created: 0,
            }),
        }
    }

    /// Create a pool from a loaded [`DatabaseConfig`]
    pub fn from_config(driver: Arc<dyn StoreDriver>, config: &DatabaseConfig) -> Self {
        Self::with_config(driver, PoolConfig::from(config))
    }

    /// Set capacity and the parameters used for new connections
    ///
    /// Call before first use. Reconfiguring while connections are checked out is not
    /// safe: the counter is kept, so a lowered cap can sit below `created` until enough
    /// connections are returned.
    pub fn configure(&self, max_connections: usize, params: ConnectionParams) {
        let mut state = self.lock_state();
        log::info!(
            "configuring pool: max_connections={} host={}:{} database={}",
            max_connections,
            params.host,
            params.port,
            params.database
        );
        state.max_connections = max_connections;
        state.params = params;
    }

    /// Take a connection without waiting
    ///
    /// # Returns
    ///
    /// An idle connection if one is queued, otherwise a newly opened one while
    /// `created < max_connections`.
    ///
    /// # Errors
    ///
    /// [`OrmError::PoolExhausted`] when nothing is idle and the cap is reached, or
    /// [`OrmError::Connection`] if opening a new handle fails (the counter is left
    /// untouched in that case).
    pub fn get(&self) -> Result<Connection, OrmError> {
        if let Ok(conn) = self.idle_rx.try_recv() {
            log::debug!("reusing idle connection #{}", conn.serial());
            return Ok(conn);
        }

        let mut state = self.lock_state();
        if state.created >= state.max_connections {
            log::warn!(
                "connection pool exhausted: {} of {} created",
                state.created,
                state.max_connections
            );
            #[cfg(feature = "metrics")]
            crate::metrics::METRICS.record_pool_exhausted();
            return Err(OrmError::PoolExhausted {
                max_connections: state.max_connections,
            });
        }

        let conn = self.factory.open(&state.params)?;
        state.created += 1;
        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_pool_created(state.created);
        Ok(conn)
    }

    /// Return a connection to the idle queue and decrement `created`
    pub fn put(&self, connection: Connection) {
        let mut state = self.lock_state();
        state.created = state.created.saturating_sub(1);
        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_pool_created(state.created);
        // Both channel ends live in `self`, so the send cannot fail.
        let _ = self.idle_tx.send(connection);
    }

    /// Current value of the creation counter
    pub fn created(&self) -> usize {
        self.lock_state().created
    }

    /// Configured capacity
    pub fn max_connections(&self) -> usize {
        self.lock_state().max_connections
    }

    /// Number of connections waiting in the idle queue
    pub fn idle(&self) -> usize {
        self.idle_rx.len()
    }

    /// Borrow a connection for the lifetime of the returned guard
    ///
    /// The guard returns the connection with [`ConnectionPool::put`] when dropped, on
    /// every exit path.
    pub fn acquire(&self) -> Result<PooledConnection<'_>, OrmError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::pool_acquire_span().entered();

        let conn = self.get()?;
        Ok(PooledConnection::new(self, conn))
    }

    /// Run `f` with a borrowed connection, returning it afterwards
    pub fn with_connection<T, F>(&self, f: F) -> Result<T, OrmError>
    where
        F: FnOnce(&mut Connection) -> Result<T, OrmError>,
    {
        let mut conn = self.acquire()?;
        f(&mut conn)
    }

    /// Close and discard every idle connection
    ///
    /// Intended for shutdown. `created` is not changed: idle connections were already
    /// uncounted by `put`.
    ///
    /// # Returns
    ///
    /// The number of connections closed.
    pub fn close_idle(&self) -> usize {
        let mut closed = 0;
        while let Ok(conn) = self.idle_rx.try_recv() {
            let serial = conn.serial();
            if let Err(e) = self.factory.close(conn) {
                log::warn!("failed to close idle connection #{}: {}", serial, e);
            }
            closed += 1;
        }
        closed
    }

    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("ConnectionPool")
            .field("max_connections", &state.max_connections)
            .field("created", &state.created)
            .field("idle", &self.idle_rx.len())
            .finish()
    }
}
