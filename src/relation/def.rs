//! Relation descriptors and kinds
//!
//! A [`RelationDescriptor`] names the other side of an inverse relation: the remote entity
//! type and the field on that type which stores references back to us. Descriptors are
//! declared on the [`EntityType`](crate::model::EntityType) by its author and resolved
//! against the registry only when a relation is traversed, so a descriptor may name a
//! type that is registered later.

use crate::error::OrmError;
use crate::model::{EntityType, FieldKind};
use crate::store::ID_FIELD;
use serde_json::Value as JsonValue;
use std::fmt;

/// How two entity types reference each other
///
/// The kinds differ in which side stores the foreign key:
///
/// | Kind | Stored on | Read as |
/// |---|---|---|
/// | `OwningReference` | this entity, one remote id | `RemoteType.get(id)` |
/// | `Collection` | this entity, ordered list of remote ids | lazy per-element `get` |
/// | `HasManyInverse` | remote entities, a list containing our id | filter on list contains |
/// | `HasOneInverse` | remote entities, a scalar equal to our id | filter on field equality |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Many-to-one: this entity stores the remote id in a scalar field
    OwningReference,
    /// One-to-many, owning side: this entity stores a list of remote ids
    Collection,
    /// Remote entities each store a list containing this entity's id
    HasManyInverse,
    /// Remote entities each store a scalar equal to this entity's id
    HasOneInverse,
}

impl RelationKind {
    /// Whether the relation is resolved by querying the remote table
    pub fn is_inverse(&self) -> bool {
        matches!(self, RelationKind::HasManyInverse | RelationKind::HasOneInverse)
    }
}

/// A (remote entity type, remote field) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationDescriptor {
    remote_type: String,
    remote_field: String,
}

impl RelationDescriptor {
    /// Build a descriptor, rejecting malformed pairs
    ///
    /// # Errors
    ///
    /// [`OrmError::InvalidRelationDescriptor`] if either part is blank or the remote field
    /// is the primary key.
    ///
    /// # Example
    ///
    /// ```
    /// use docguard::relation::RelationDescriptor;
    ///
    /// let d = RelationDescriptor::new("Organization", "persons").unwrap();
    /// assert_eq!(d.remote_type(), "Organization");
    /// assert!(RelationDescriptor::new("", "persons").is_err());
    /// ```
    pub fn new(remote_type: impl Into<String>, remote_field: impl Into<String>) -> Result<Self, OrmError> {
        let remote_type = remote_type.into();
        let remote_field = remote_field.into();
        if remote_type.trim().is_empty() {
            return Err(OrmError::InvalidRelationDescriptor(
                "remote entity type name is empty".to_string(),
            ));
        }
        if remote_field.trim().is_empty() {
            return Err(OrmError::InvalidRelationDescriptor(format!(
                "remote field name for {remote_type} is empty"
            )));
        }
        if remote_field == ID_FIELD {
            return Err(OrmError::InvalidRelationDescriptor(format!(
                "{remote_type}.{ID_FIELD} is the primary key, not a reference field"
            )));
        }
        Ok(Self {
            remote_type,
            remote_field,
        })
    }

    /// Parse a descriptor from a two-element JSON array `["Type", "field"]`
    pub fn from_json(value: &JsonValue) -> Result<Self, OrmError> {
        match value {
            JsonValue::Array(parts) if parts.len() == 2 => match (&parts[0], &parts[1]) {
                (JsonValue::String(remote_type), JsonValue::String(remote_field)) => {
                    Self::new(remote_type.as_str(), remote_field.as_str())
                }
                _ => Err(OrmError::InvalidRelationDescriptor(format!(
                    "expected a pair of strings, got {value}"
                ))),
            },
            _ => Err(OrmError::InvalidRelationDescriptor(format!(
                "expected a (type, field) pair, got {value}"
            ))),
        }
    }

    /// The descriptor as a `["Type", "field"]` JSON pair
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Array(vec![
            JsonValue::String(self.remote_type.clone()),
            JsonValue::String(self.remote_field.clone()),
        ])
    }

    pub fn remote_type(&self) -> &str {
        &self.remote_type
    }

    pub fn remote_field(&self) -> &str {
        &self.remote_field
    }
}

impl fmt::Display for RelationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.remote_type, self.remote_field)
    }
}

/// Check that an inverse descriptor declared on `owner` matches the remote type
///
/// For has-many the remote field must be a collection of `owner` ids (or a plain
/// attribute holding a list); for has-one it must be an owning reference to `owner` (or a
/// plain attribute holding a scalar id).
pub(crate) fn check_inverse(
    owner: &str,
    kind: RelationKind,
    descriptor: &RelationDescriptor,
    remote: &EntityType,
) -> Result<(), OrmError> {
    let field = remote.field(descriptor.remote_field()).ok_or_else(|| {
        OrmError::InvalidRelationDescriptor(format!(
            "{} has no field {} (declared by {owner})",
            remote.name(),
            descriptor.remote_field()
        ))
    })?;

    let compatible = match (kind, field.kind()) {
        (_, FieldKind::Attribute { .. }) => true,
        (RelationKind::HasManyInverse, FieldKind::Collection { remote_type }) => remote_type == owner,
        (RelationKind::HasOneInverse, FieldKind::Reference { remote_type }) => remote_type == owner,
        _ => false,
    };
    if compatible {
        Ok(())
    } else {
        Err(OrmError::InvalidRelationDescriptor(format!(
            "{descriptor} cannot back a {kind:?} relation on {owner}"
        )))
    }
}
