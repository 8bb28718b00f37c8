//! Error types for mapper operations.
//!
//! `OrmError` is the single error surfaced by pool, registry, relation and lifecycle
//! operations. Driver-level failures arrive as [`ConnectionError`] or [`StoreError`] and
//! are wrapped through `From`, so `?` works across layers. Nothing in the crate retries
//! or swallows an error: whatever fails is returned to the immediate caller.

use crate::connection::ConnectionError;
use crate::store::StoreError;
use std::fmt;

/// Error type for mapper operations
#[derive(Debug)]
pub enum OrmError {
    /// No idle connection and the creation cap has been reached
    PoolExhausted {
        max_connections: usize,
    },
    /// A required argument (id, filter attribute, ...) was empty
    MissingArgument(&'static str),
    /// Registry lookup miss
    UnknownEntityType(String),
    /// A relation value is not a well-formed (type, field) pair, or does not match
    /// the remote type's declared fields
    InvalidRelationDescriptor(String),
    /// A stored record could not be turned into an instance of the declared type
    InstantiationFailure {
        entity_type: String,
        reason: String,
    },
    /// The store returned its "nothing" sentinel where a sequence was expected
    NoResult {
        entity_type: String,
    },
    /// Field is not declared on the entity type, or has a different kind
    UnknownField {
        entity_type: String,
        field: String,
    },
    /// An entity of the wrong type was given to a relation
    TypeMismatch {
        expected: String,
        actual: String,
    },
    /// Collection index out of range
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
    /// Entity type declaration rejected (duplicate name, duplicate field, reserved name)
    InvalidEntityType(String),
    /// The store accepted the request but reported a write error
    WriteRejected {
        table: String,
        message: String,
    },
    /// Value could not be normalized to a timestamp string
    InvalidTimestamp(String),
    /// Opening or closing a connection failed
    Connection(ConnectionError),
    /// A store round trip failed
    Store(StoreError),
    /// JSON encoding failed
    Serialization(serde_json::Error),
}

impl fmt::Display for OrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrmError::PoolExhausted { max_connections } => {
                write!(f, "Connection pool exhausted ({max_connections} connections created)")
            }
            OrmError::MissingArgument(name) => write!(f, "Missing argument: {name} must be supplied"),
            OrmError::UnknownEntityType(name) => write!(f, "Unknown entity type: {name}"),
            OrmError::InvalidRelationDescriptor(msg) => {
                write!(f, "Invalid relation descriptor: {msg}")
            }
            OrmError::InstantiationFailure { entity_type, reason } => {
                write!(f, "{entity_type} failed to build from stored record: {reason}")
            }
            OrmError::NoResult { entity_type } => {
                write!(f, "Filter on {entity_type} returned nothing")
            }
            OrmError::UnknownField { entity_type, field } => {
                write!(f, "{entity_type} has no field {field} of that kind")
            }
            OrmError::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {expected}, got {actual}")
            }
            OrmError::IndexOutOfRange { index, len } => {
                write!(f, "Index {index} out of range for collection of length {len}")
            }
            OrmError::InvalidEntityType(msg) => write!(f, "Invalid entity type: {msg}"),
            OrmError::WriteRejected { table, message } => {
                write!(f, "Write to {table} rejected: {message}")
            }
            OrmError::InvalidTimestamp(msg) => write!(f, "Invalid timestamp: {msg}"),
            OrmError::Connection(e) => write!(f, "Connection error: {e}"),
            OrmError::Store(e) => write!(f, "Store error: {e}"),
            OrmError::Serialization(e) => write!(f, "Serialization error: {e}"),
        }
    }
}

impl std::error::Error for OrmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrmError::Connection(e) => Some(e),
            OrmError::Store(e) => Some(e),
            OrmError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConnectionError> for OrmError {
    fn from(err: ConnectionError) -> Self {
        OrmError::Connection(err)
    }
}

impl From<StoreError> for OrmError {
    fn from(err: StoreError) -> Self {
        OrmError::Store(err)
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::Serialization(err)
    }
}
