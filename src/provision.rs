//! Idempotent database and table provisioning.
//!
//! Each helper lists what exists first and only issues the create/drop when needed, so
//! they are safe to call on every start-up.

use crate::connection::Connection;
use crate::store::StoreError;

/// Create `name` unless it exists; returns whether it was created
pub fn create_database(conn: &mut Connection, name: &str) -> Result<bool, StoreError> {
    if conn.list_databases()?.iter().any(|db| db == name) {
        return Ok(false);
    }
    conn.create_database(name)?;
    log::info!("created database {}", name);
    Ok(true)
}

/// Drop `name` if it exists; returns whether it was dropped
pub fn drop_database(conn: &mut Connection, name: &str) -> Result<bool, StoreError> {
    if !conn.list_databases()?.iter().any(|db| db == name) {
        return Ok(false);
    }
    conn.drop_database(name)?;
    log::info!("dropped database {}", name);
    Ok(true)
}

/// Create `table` in the connection's database unless it exists
pub fn ensure_table(conn: &mut Connection, table: &str) -> Result<bool, StoreError> {
    if conn.list_tables()?.iter().any(|t| t == table) {
        return Ok(false);
    }
    conn.create_table(table)?;
    log::debug!("created table {}", table);
    Ok(true)
}

/// Drop `table` from the connection's database if it exists
pub fn drop_table(conn: &mut Connection, table: &str) -> Result<bool, StoreError> {
    if !conn.list_tables()?.iter().any(|t| t == table) {
        return Ok(false);
    }
    conn.drop_table(table)?;
    log::debug!("dropped table {}", table);
    Ok(true)
}
