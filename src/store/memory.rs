//! In-process document store.
//!
//! `MemoryStore` implements [`StoreDriver`] over a shared, mutex-protected map of
//! databases → tables → documents. It follows the write semantics of a document server:
//! inserting an existing primary key is reported as an error in the [`WriteOutcome`]
//! rather than failing the call, `replace` upserts, and deleting a missing key is
//! "skipped". Tables keep documents ordered by primary key, so scans are deterministic.
//!
//! Cloning a `MemoryStore` shares the same data, which is how tests inspect what the
//! mapper wrote.

use crate::connection::{ConnectionError, ConnectionParams};
use crate::store::{Document, Predicate, StoreConnection, StoreDriver, StoreError, WriteOutcome, ID_FIELD};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Table = BTreeMap<String, Document>;

#[derive(Debug, Default)]
struct MemoryState {
    databases: BTreeMap<String, BTreeMap<String, Table>>,
    auth_key: Option<String>,
    opened: usize,
    closed: usize,
}

/// Shared in-memory document store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store with no databases
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty database (builder style)
    pub fn with_database(self, name: &str) -> Self {
        self.lock().databases.entry(name.to_string()).or_default();
        self
    }

    /// Require this auth key from every connection (builder style)
    pub fn with_auth_key(self, auth_key: &str) -> Self {
        self.lock().auth_key = Some(auth_key.to_string());
        self
    }

    /// Number of handles opened so far
    pub fn opened_connections(&self) -> usize {
        self.lock().opened
    }

    /// Number of handles explicitly closed so far
    pub fn closed_connections(&self) -> usize {
        self.lock().closed
    }

    /// Copy of a stored document, bypassing the mapper
    pub fn document(&self, database: &str, table: &str, id: &str) -> Option<Document> {
        self.lock()
            .databases
            .get(database)
            .and_then(|tables| tables.get(table))
            .and_then(|rows| rows.get(id))
            .cloned()
    }

    /// Number of documents in a table (0 if it does not exist)
    pub fn document_count(&self, database: &str, table: &str) -> usize {
        self.lock()
            .databases
            .get(database)
            .and_then(|tables| tables.get(table))
            .map_or(0, BTreeMap::len)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StoreDriver for MemoryStore {
    fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn StoreConnection>, ConnectionError> {
        let mut state = self.lock();
        if let Some(expected) = &state.auth_key {
            if *expected != params.auth_key {
                return Err(ConnectionError::Rejected(format!(
                    "authentication failed for {}:{}",
                    params.host, params.port
                )));
            }
        }
        state.opened += 1;
        Ok(Box::new(MemoryConnection {
            state: Arc::clone(&self.state),
            database: params.database.clone(),
            closed: false,
        }))
    }
}

/// Handle returned by [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
    database: String,
    closed: bool,
}

impl MemoryConnection {
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        if self.closed {
            return Err(StoreError::ConnectionClosed);
        }
        Ok(self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Run `f` against one table of this handle's database
    fn with_table<T>(&self, table: &str, f: impl FnOnce(&mut Table) -> T) -> Result<T, StoreError> {
        let mut state = self.lock()?;
        let tables = state
            .databases
            .get_mut(&self.database)
            .ok_or_else(|| StoreError::DatabaseNotFound(self.database.clone()))?;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        Ok(f(rows))
    }
}

fn primary_key(document: &Document) -> Result<String, StoreError> {
    match document.get(ID_FIELD).and_then(|v| v.as_str()) {
        Some(id) => Ok(id.to_string()),
        None => Err(StoreError::InvalidDocument(format!(
            "document has no string `{ID_FIELD}` field"
        ))),
    }
}

impl StoreConnection for MemoryConnection {
    fn list_databases(&mut self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock()?.databases.keys().cloned().collect())
    }

    fn create_database(&mut self, name: &str) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.databases.contains_key(name) {
            return Err(StoreError::Other(format!("Database `{name}` already exists")));
        }
        state.databases.insert(name.to_string(), BTreeMap::new());
        Ok(())
    }

    fn drop_database(&mut self, name: &str) -> Result<(), StoreError> {
        self.lock()?
            .databases
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::DatabaseNotFound(name.to_string()))
    }

    fn list_tables(&mut self) -> Result<Vec<String>, StoreError> {
        let state = self.lock()?;
        state
            .databases
            .get(&self.database)
            .map(|tables| tables.keys().cloned().collect())
            .ok_or_else(|| StoreError::DatabaseNotFound(self.database.clone()))
    }

    fn create_table(&mut self, name: &str) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let tables = state
            .databases
            .get_mut(&self.database)
            .ok_or_else(|| StoreError::DatabaseNotFound(self.database.clone()))?;
        if tables.contains_key(name) {
            return Err(StoreError::Other(format!("Table `{name}` already exists")));
        }
        tables.insert(name.to_string(), Table::new());
        Ok(())
    }

    fn drop_table(&mut self, name: &str) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let tables = state
            .databases
            .get_mut(&self.database)
            .ok_or_else(|| StoreError::DatabaseNotFound(self.database.clone()))?;
        tables
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    fn get(&mut self, table: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.with_table(table, |rows| rows.get(id).cloned())
    }

    fn filter(&mut self, table: &str, predicate: &Predicate) -> Result<Option<Vec<Document>>, StoreError> {
        self.with_table(table, |rows| {
            Some(rows.values().filter(|doc| predicate.matches(doc)).cloned().collect())
        })
    }

    fn insert(&mut self, table: &str, document: Document) -> Result<WriteOutcome, StoreError> {
        let id = primary_key(&document)?;
        self.with_table(table, |rows| {
            if rows.contains_key(&id) {
                WriteOutcome {
                    errors: 1,
                    first_error: Some(format!("Duplicate primary key `{ID_FIELD}`: {id}")),
                    ..WriteOutcome::default()
                }
            } else {
                rows.insert(id, document);
                WriteOutcome {
                    inserted: 1,
                    ..WriteOutcome::default()
                }
            }
        })
    }

    fn replace(&mut self, table: &str, document: Document) -> Result<WriteOutcome, StoreError> {
        let id = primary_key(&document)?;
        self.with_table(table, |rows| match rows.insert(id, document.clone()) {
            Some(previous) if previous == document => WriteOutcome {
                unchanged: 1,
                ..WriteOutcome::default()
            },
            Some(_) => WriteOutcome {
                replaced: 1,
                ..WriteOutcome::default()
            },
            None => WriteOutcome {
                inserted: 1,
                ..WriteOutcome::default()
            },
        })
    }

    fn delete(&mut self, table: &str, id: &str) -> Result<WriteOutcome, StoreError> {
        self.with_table(table, |rows| match rows.remove(id) {
            Some(_) => WriteOutcome {
                deleted: 1,
                ..WriteOutcome::default()
            },
            None => WriteOutcome {
                skipped: 1,
                ..WriteOutcome::default()
            },
        })
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if !self.closed {
            self.closed = true;
            self.state.lock().unwrap_or_else(PoisonError::into_inner).closed += 1;
        }
        Ok(())
    }
}
