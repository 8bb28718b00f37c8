//! Entity type declarations.
//!
//! An [`EntityType`] is declared once, with every stored field and every inverse relation
//! spelled out, and then registered with the [`EntityRegistry`](crate::EntityRegistry).
//! Relations are part of the declaration, so nothing has to be inferred from the shape of
//! instance data.
//!
//! ```
//! use docguard::model::EntityType;
//!
//! let person = EntityType::builder("Person")
//!     .attribute("name")
//!     .optional_attribute("nickname")
//!     .reference("family", "Family")
//!     .collection("friends", "Person")
//!     .has_many("orgs", "Organization", "persons")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(person.table_name(), "Person_table");
//! assert_eq!(person.inverse_relations().count(), 1);
//! ```

use crate::error::OrmError;
use crate::relation::def::{RelationDescriptor, RelationKind};
use crate::store::ID_FIELD;
use std::collections::HashSet;

/// Table name for an entity type name
pub fn table_name_for(type_name: &str) -> String {
    format!("{type_name}_table")
}

/// What a declared field holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain JSON value, stored as-is
    Attribute { required: bool },
    /// Owning reference: the id of one remote entity, or null
    Reference { remote_type: String },
    /// Ordered list of remote ids, read through a lazy collection
    Collection { remote_type: String },
    /// Inverse has-many: remote entities list our id in `descriptor.remote_field`
    HasMany(RelationDescriptor),
    /// Inverse has-one: remote entities store our id in `descriptor.remote_field`
    HasOne(RelationDescriptor),
}

impl FieldKind {
    /// The relation kind, or `None` for plain attributes
    pub fn relation_kind(&self) -> Option<RelationKind> {
        match self {
            FieldKind::Attribute { .. } => None,
            FieldKind::Reference { .. } => Some(RelationKind::OwningReference),
            FieldKind::Collection { .. } => Some(RelationKind::Collection),
            FieldKind::HasMany(_) => Some(RelationKind::HasManyInverse),
            FieldKind::HasOne(_) => Some(RelationKind::HasOneInverse),
        }
    }

    /// Entity type on the other side of the relation
    pub fn remote_type(&self) -> Option<&str> {
        match self {
            FieldKind::Attribute { .. } => None,
            FieldKind::Reference { remote_type } | FieldKind::Collection { remote_type } => {
                Some(remote_type.as_str())
            }
            FieldKind::HasMany(d) | FieldKind::HasOne(d) => Some(d.remote_type()),
        }
    }

    /// Descriptor of an inverse relation
    pub fn descriptor(&self) -> Option<&RelationDescriptor> {
        match self {
            FieldKind::HasMany(d) | FieldKind::HasOne(d) => Some(d),
            _ => None,
        }
    }

    /// Whether the field is part of the stored document
    pub fn is_stored(&self) -> bool {
        !matches!(self, FieldKind::HasMany(_) | FieldKind::HasOne(_))
    }
}

/// A named field on an entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    name: String,
    kind: FieldKind,
}

impl FieldDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }
}

/// Descriptor of one entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityType {
    name: String,
    table_name: String,
    fields: Vec<FieldDef>,
}

impl EntityType {
    /// Start declaring an entity type
    pub fn builder(name: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder {
            name: name.into(),
            fields: Vec::new(),
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `"<Name>_table"`
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields that carry a relation of any kind
    pub fn relations(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.kind.relation_kind().is_some())
    }

    /// Has-many and has-one inverse relations, the ones a cascading delete visits
    pub fn inverse_relations(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.kind.is_stored())
    }
}

/// Builder returned by [`EntityType::builder`]
///
/// The first invalid declaration is remembered and reported by [`build`](Self::build).
#[derive(Debug)]
#[must_use]
pub struct EntityTypeBuilder {
    name: String,
    fields: Vec<FieldDef>,
    error: Option<OrmError>,
}

impl EntityTypeBuilder {
    /// Required attribute: stored records without it fail to instantiate
    pub fn attribute(self, name: impl Into<String>) -> Self {
        self.field(name.into(), FieldKind::Attribute { required: true })
    }

    /// Attribute that may be absent from stored records
    pub fn optional_attribute(self, name: impl Into<String>) -> Self {
        self.field(name.into(), FieldKind::Attribute { required: false })
    }

    /// Owning reference to one entity of `remote_type`
    pub fn reference(self, name: impl Into<String>, remote_type: impl Into<String>) -> Self {
        let remote_type = remote_type.into();
        self.field(name.into(), FieldKind::Reference { remote_type })
    }

    /// Ordered list of ids of `remote_type` entities
    pub fn collection(self, name: impl Into<String>, remote_type: impl Into<String>) -> Self {
        let remote_type = remote_type.into();
        self.field(name.into(), FieldKind::Collection { remote_type })
    }

    /// Inverse has-many: `remote_type` entities list our id in `remote_field`
    pub fn has_many(
        self,
        name: impl Into<String>,
        remote_type: impl Into<String>,
        remote_field: impl Into<String>,
    ) -> Self {
        match RelationDescriptor::new(remote_type, remote_field) {
            Ok(d) => self.field(name.into(), FieldKind::HasMany(d)),
            Err(e) => self.fail(e),
        }
    }

    /// Inverse has-one: `remote_type` entities store our id in `remote_field`
    pub fn has_one(
        self,
        name: impl Into<String>,
        remote_type: impl Into<String>,
        remote_field: impl Into<String>,
    ) -> Self {
        match RelationDescriptor::new(remote_type, remote_field) {
            Ok(d) => self.field(name.into(), FieldKind::HasOne(d)),
            Err(e) => self.fail(e),
        }
    }

    /// Finish the declaration
    ///
    /// # Errors
    ///
    /// - [`OrmError::InvalidRelationDescriptor`] for a malformed relation
    /// - [`OrmError::InvalidEntityType`] for a blank type name, a blank or duplicate field
    ///   name, a field named `id`, or a reference/collection with a blank remote type
    pub fn build(self) -> Result<EntityType, OrmError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.name.trim().is_empty() || self.name.chars().any(char::is_whitespace) {
            return Err(OrmError::InvalidEntityType(format!(
                "entity type name {:?} must be non-empty and contain no whitespace",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(OrmError::InvalidEntityType(format!(
                    "{} declares a field with an empty name",
                    self.name
                )));
            }
            if field.name == ID_FIELD {
                return Err(OrmError::InvalidEntityType(format!(
                    "{}.{ID_FIELD} is reserved for the identifier",
                    self.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(OrmError::InvalidEntityType(format!(
                    "{} declares field {} twice",
                    self.name, field.name
                )));
            }
            if let Some(remote) = field.kind.remote_type() {
                if remote.trim().is_empty() {
                    return Err(OrmError::InvalidEntityType(format!(
                        "{}.{} references an unnamed entity type",
                        self.name, field.name
                    )));
                }
            }
        }

        Ok(EntityType {
            table_name: table_name_for(&self.name),
            name: self.name,
            fields: self.fields,
        })
    }

    fn field(mut self, name: String, kind: FieldKind) -> Self {
        self.fields.push(FieldDef { name, kind });
        self
    }

    fn fail(mut self, err: OrmError) -> Self {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self
    }
}
