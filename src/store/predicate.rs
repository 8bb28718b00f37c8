//! Filter predicates understood by every driver.

use crate::store::Document;
use serde_json::Value as JsonValue;

/// A row filter
///
/// Only the two combinators the relation engine needs are provided: field equality
/// (owning references, attribute filters) and list containment (has-many lookups).
/// Rows that lack the field never match.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `row[field] == value`
    Eq { field: String, value: JsonValue },
    /// `row[field]` is an array containing `value`
    Contains { field: String, value: JsonValue },
}

impl Predicate {
    /// Build a field-equality predicate
    pub fn eq(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Build a field-contains predicate
    pub fn contains(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Predicate::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Name of the field the predicate inspects
    pub fn field(&self) -> &str {
        match self {
            Predicate::Eq { field, .. } | Predicate::Contains { field, .. } => field,
        }
    }

    /// Evaluate against a document
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Predicate::Eq { field, value } => document.get(field) == Some(value),
            Predicate::Contains { field, value } => match document.get(field) {
                Some(JsonValue::Array(items)) => items.contains(value),
                _ => false,
            },
        }
    }
}
