//! Document-store collaborator interface.
//!
//! The mapper never talks to a database directly. It drives a [`StoreDriver`] that opens
//! [`StoreConnection`] handles, and every query goes through those handles. Anything that
//! can answer `get`/`filter`/`insert`/`replace`/`delete` on JSON documents can back the
//! mapper; [`memory::MemoryStore`] is the in-process implementation.

pub mod memory;
pub mod predicate;

pub use predicate::Predicate;

use crate::connection::{ConnectionError, ConnectionParams};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// A stored document: one JSON object per entity instance
pub type Document = serde_json::Map<String, JsonValue>;

/// Name of the primary-key field in every document
pub const ID_FIELD: &str = "id";

/// Store error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Database does not exist
    DatabaseNotFound(String),
    /// Table does not exist in the connection's database
    TableNotFound(String),
    /// Document is not usable for the requested write (e.g. no primary key)
    InvalidDocument(String),
    /// The handle was closed before use
    ConnectionClosed,
    /// Operation not supported by this driver
    Unsupported(&'static str),
    /// Other driver errors
    Other(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DatabaseNotFound(name) => write!(f, "Database `{name}` does not exist"),
            StoreError::TableNotFound(name) => write!(f, "Table `{name}` does not exist"),
            StoreError::InvalidDocument(s) => write!(f, "Invalid document: {s}"),
            StoreError::ConnectionClosed => write!(f, "Connection is closed"),
            StoreError::Unsupported(op) => write!(f, "Operation not supported: {op}"),
            StoreError::Other(s) => write!(f, "Store error: {s}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Outcome of a write, as reported by the store
///
/// Mirrors the counters a document store returns for insert/replace/delete. A write can
/// "succeed" at the protocol level and still report `errors > 0` (for instance, inserting
/// a duplicate primary key).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub inserted: u64,
    pub replaced: u64,
    pub unchanged: u64,
    pub deleted: u64,
    pub skipped: u64,
    pub errors: u64,
    /// First error message reported by the store, if any
    pub first_error: Option<String>,
}

impl WriteOutcome {
    /// Whether the store reported no errors
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Opens handles to a document store
///
/// Implementations must be shareable across threads: the pool keeps one driver and calls
/// `connect` from whichever thread needs a new handle.
pub trait StoreDriver: Send + Sync {
    /// Open a handle bound to `params.database`
    fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn StoreConnection>, ConnectionError>;
}

/// A live handle to one database
///
/// Each method is one round trip. Handles are owned by a single caller at a time, hence
/// `&mut self` throughout.
pub trait StoreConnection: Send {
    /// Names of every database on the server
    fn list_databases(&mut self) -> Result<Vec<String>, StoreError>;

    fn create_database(&mut self, name: &str) -> Result<(), StoreError>;

    fn drop_database(&mut self, name: &str) -> Result<(), StoreError>;

    /// Names of every table in the handle's database
    fn list_tables(&mut self) -> Result<Vec<String>, StoreError>;

    fn create_table(&mut self, name: &str) -> Result<(), StoreError>;

    fn drop_table(&mut self, name: &str) -> Result<(), StoreError>;

    /// Fetch a document by primary key
    fn get(&mut self, table: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Scan a table for documents matching `predicate`
    ///
    /// `Ok(None)` is the store's "nothing" sentinel, distinct from `Ok(Some(vec![]))`.
    fn filter(&mut self, table: &str, predicate: &Predicate) -> Result<Option<Vec<Document>>, StoreError>;

    /// Insert a new document
    fn insert(&mut self, table: &str, document: Document) -> Result<WriteOutcome, StoreError>;

    /// Replace the document with the same primary key (inserting it if absent)
    fn replace(&mut self, table: &str, document: Document) -> Result<WriteOutcome, StoreError>;

    /// Delete the document with the given primary key
    fn delete(&mut self, table: &str, id: &str) -> Result<WriteOutcome, StoreError>;

    /// Close the handle; later calls fail with [`StoreError::ConnectionClosed`]
    fn close(&mut self) -> Result<(), StoreError>;
}
