//! Entity instances.
//!
//! An [`Entity`] is one document's worth of data bound to its [`EntityType`]: an immutable
//! identifier, the declared attributes, owning references (stored as ids) and lazy
//! collections. Instances come from [`Mapper::create`] (transient) or from stored records
//! through `get`/`filter`/relation resolution (persisted).

use crate::error::OrmError;
use crate::mapper::Mapper;
use crate::model::{EntityType, FieldKind};
use crate::relation::lazy::LazyRelatedCollection;
use crate::store::{Document, ID_FIELD};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Generate a new client-side identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Whether an instance has been written to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Created in memory, never saved
    Transient,
    /// Saved by this process or loaded from a stored record
    Persisted,
}

/// Value accepted by an owning-reference setter
///
/// Converts from a remote [`Entity`], a raw id, or nothing; all of them normalize to an
/// optional id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    Entity { entity_type: String, id: String },
    Id(String),
    None,
}

impl From<&Entity> for ReferenceTarget {
    fn from(entity: &Entity) -> Self {
        ReferenceTarget::Entity {
            entity_type: entity.type_name().to_string(),
            id: entity.id().to_string(),
        }
    }
}

impl From<Option<&Entity>> for ReferenceTarget {
    fn from(entity: Option<&Entity>) -> Self {
        entity.map_or(ReferenceTarget::None, ReferenceTarget::from)
    }
}

impl From<&str> for ReferenceTarget {
    fn from(id: &str) -> Self {
        ReferenceTarget::Id(id.to_string())
    }
}

impl From<String> for ReferenceTarget {
    fn from(id: String) -> Self {
        ReferenceTarget::Id(id)
    }
}

/// One entity instance
#[derive(Clone)]
pub struct Entity {
    entity_type: Arc<EntityType>,
    id: String,
    attributes: BTreeMap<String, JsonValue>,
    references: BTreeMap<String, Option<String>>,
    collections: BTreeMap<String, LazyRelatedCollection>,
    state: EntityState,
}

impl Entity {
    /// Fresh transient instance with empty references and collections
    pub(crate) fn new(entity_type: Arc<EntityType>, mapper: &Mapper, id: String) -> Self {
        let mut references = BTreeMap::new();
        let mut collections = BTreeMap::new();
        for field in entity_type.fields() {
            match field.kind() {
                FieldKind::Reference { .. } => {
                    references.insert(field.name().to_string(), None);
                }
                FieldKind::Collection { remote_type } => {
                    collections.insert(
                        field.name().to_string(),
                        LazyRelatedCollection::new(mapper.clone(), remote_type.clone(), Vec::new()),
                    );
                }
                _ => {}
            }
        }
        Self {
            entity_type,
            id,
            attributes: BTreeMap::new(),
            references,
            collections,
            state: EntityState::Transient,
        }
    }

    /// Build an instance from a stored record
    ///
    /// Every key of the record must be a declared stored field, every required attribute
    /// must be present, references must be strings or null and collections arrays of
    /// strings or nulls. A record without an `id` gets a fresh one.
    ///
    /// # Errors
    ///
    /// [`OrmError::InstantiationFailure`] when the record does not fit the declaration.
    pub(crate) fn from_document(
        entity_type: Arc<EntityType>,
        mapper: &Mapper,
        mut document: Document,
    ) -> Result<Self, OrmError> {
        let fail = |reason: String| OrmError::InstantiationFailure {
            entity_type: entity_type.name().to_string(),
            reason,
        };

        let id = match document.remove(ID_FIELD) {
            None | Some(JsonValue::Null) => new_id(),
            Some(JsonValue::String(id)) => id,
            Some(other) => return Err(fail(format!("`{ID_FIELD}` must be a string, got {other}"))),
        };

        let mut attributes = BTreeMap::new();
        let mut references = BTreeMap::new();
        let mut collections = BTreeMap::new();

        for field in entity_type.fields() {
            let name = field.name();
            match field.kind() {
                FieldKind::Attribute { required } => match document.remove(name) {
                    Some(value) => {
                        attributes.insert(name.to_string(), value);
                    }
                    None if *required => {
                        return Err(fail(format!("missing required attribute `{name}`")));
                    }
                    None => {}
                },
                FieldKind::Reference { .. } => {
                    let id = match document.remove(name) {
                        None | Some(JsonValue::Null) => None,
                        Some(JsonValue::String(id)) => Some(id),
                        Some(other) => {
                            return Err(fail(format!("reference `{name}` must be an id string, got {other}")));
                        }
                    };
                    references.insert(name.to_string(), id);
                }
                FieldKind::Collection { remote_type } => {
                    let ids = match document.remove(name) {
                        None | Some(JsonValue::Null) => Vec::new(),
                        Some(JsonValue::Array(items)) => items
                            .into_iter()
                            .map(|item| match item {
                                JsonValue::String(id) => Ok(Some(id)),
                                JsonValue::Null => Ok(None),
                                other => Err(fail(format!("collection `{name}` holds a non-id value {other}"))),
                            })
                            .collect::<Result<Vec<_>, _>>()?,
                        Some(other) => {
                            return Err(fail(format!("collection `{name}` must be a list, got {other}")));
                        }
                    };
                    collections.insert(
                        name.to_string(),
                        LazyRelatedCollection::new(mapper.clone(), remote_type.clone(), ids),
                    );
                }
                FieldKind::HasMany(_) | FieldKind::HasOne(_) => {}
            }
        }

        if let Some(extra) = document.keys().next() {
            return Err(fail(format!("unexpected field `{extra}`")));
        }

        Ok(Self {
            entity_type,
            id,
            attributes,
            references,
            collections,
            state: EntityState::Persisted,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.entity_type
    }

    pub fn type_name(&self) -> &str {
        self.entity_type.name()
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub fn is_persisted(&self) -> bool {
        self.state == EntityState::Persisted
    }

    /// Value of a declared attribute, if set
    pub fn attribute(&self, name: &str) -> Option<&JsonValue> {
        self.attributes.get(name)
    }

    /// All attributes that are set
    pub fn attributes(&self) -> &BTreeMap<String, JsonValue> {
        &self.attributes
    }

    /// Set a declared attribute
    ///
    /// # Errors
    ///
    /// [`OrmError::UnknownField`] if `name` is not declared as an attribute.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<JsonValue>) -> Result<(), OrmError> {
        match self.entity_type.field(name).map(|f| f.kind()) {
            Some(FieldKind::Attribute { .. }) => {
                self.attributes.insert(name.to_string(), value.into());
                Ok(())
            }
            _ => Err(self.unknown_field(name)),
        }
    }

    /// Stored id of an owning reference
    pub fn reference_id(&self, field: &str) -> Result<Option<&str>, OrmError> {
        self.references
            .get(field)
            .map(Option::as_deref)
            .ok_or_else(|| self.unknown_field(field))
    }

    /// Point an owning reference at a remote entity, a raw id, or nothing
    ///
    /// # Errors
    ///
    /// - [`OrmError::UnknownField`] if `field` is not an owning reference
    /// - [`OrmError::TypeMismatch`] if an entity of another type is given
    ///
    /// # Example
    ///
    /// ```ignore
    /// person.set_reference("family", &family)?;        // entity
    /// person.set_reference("family", "8c1f...")?;      // raw id
    /// person.set_reference("family", None::<&Entity>)?; // clear
    /// ```
    pub fn set_reference(&mut self, field: &str, target: impl Into<ReferenceTarget>) -> Result<(), OrmError> {
        let remote_type = match self.entity_type.field(field).map(|f| f.kind()) {
            Some(FieldKind::Reference { remote_type }) => remote_type.clone(),
            _ => return Err(self.unknown_field(field)),
        };
        let id = match target.into() {
            ReferenceTarget::Entity { entity_type, id } => {
                if entity_type != remote_type {
                    return Err(OrmError::TypeMismatch {
                        expected: remote_type,
                        actual: entity_type,
                    });
                }
                Some(id)
            }
            ReferenceTarget::Id(id) => Some(id),
            ReferenceTarget::None => None,
        };
        self.references.insert(field.to_string(), id);
        Ok(())
    }

    /// Lazy collection stored in `field`
    pub fn collection(&self, field: &str) -> Result<&LazyRelatedCollection, OrmError> {
        self.collections.get(field).ok_or_else(|| self.unknown_field(field))
    }

    /// Mutable lazy collection stored in `field`
    pub fn collection_mut(&mut self, field: &str) -> Result<&mut LazyRelatedCollection, OrmError> {
        let entity_type = &self.entity_type;
        self.collections
            .get_mut(field)
            .ok_or_else(|| OrmError::UnknownField {
                entity_type: entity_type.name().to_string(),
                field: field.to_string(),
            })
    }

    /// The document written by `save`: collections as raw id lists, references as id or null
    pub fn to_document(&self) -> Document {
        self.serialize(false)
    }

    /// The document written by `update`: like [`to_document`](Self::to_document) with null
    /// ids dropped from collections
    pub fn to_update_document(&self) -> Document {
        self.serialize(true)
    }

    /// Flat JSON text of [`to_document`](Self::to_document)
    pub fn to_json(&self) -> Result<String, OrmError> {
        Ok(serde_json::to_string(&self.to_document())?)
    }

    fn serialize(&self, drop_null_ids: bool) -> Document {
        let mut document = Document::new();
        document.insert(ID_FIELD.to_string(), JsonValue::String(self.id.clone()));
        for (name, value) in &self.attributes {
            document.insert(name.clone(), value.clone());
        }
        for (name, id) in &self.references {
            let value = id.clone().map_or(JsonValue::Null, JsonValue::String);
            document.insert(name.clone(), value);
        }
        for (name, collection) in &self.collections {
            let ids = collection
                .raw_ids()
                .iter()
                .filter(|id| !drop_null_ids || id.is_some())
                .map(|id| id.clone().map_or(JsonValue::Null, JsonValue::String))
                .collect();
            document.insert(name.clone(), JsonValue::Array(ids));
        }
        document
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.state = EntityState::Persisted;
    }

    /// Remove every reference to `id` from `field`
    ///
    /// Works on collections, owning references and plain attributes holding an id or a
    /// list of ids.
    ///
    /// # Returns
    ///
    /// Whether anything changed.
    pub(crate) fn scrub_reference(&mut self, field: &str, id: &str) -> Result<bool, OrmError> {
        if let Some(collection) = self.collections.get_mut(field) {
            return Ok(collection.purge_id(id) > 0);
        }
        if let Some(current) = self.references.get_mut(field) {
            if current.as_deref() == Some(id) {
                *current = None;
                return Ok(true);
            }
            return Ok(false);
        }
        if let Some(value) = self.attributes.get_mut(field) {
            match value {
                JsonValue::Array(items) => {
                    let before = items.len();
                    items.retain(|item| item.as_str() != Some(id));
                    return Ok(items.len() != before);
                }
                JsonValue::String(current) if current.as_str() == id => {}
                _ => return Ok(false),
            }
            *value = JsonValue::Null;
            return Ok(true);
        }
        match self.entity_type.field(field).map(|f| f.kind()) {
            // Declared but unset optional attribute: nothing to scrub
            Some(FieldKind::Attribute { .. }) => Ok(false),
            _ => Err(self.unknown_field(field)),
        }
    }

    fn unknown_field(&self, field: &str) -> OrmError {
        OrmError::UnknownField {
            entity_type: self.entity_type.name().to_string(),
            field: field.to_string(),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("type", &self.entity_type.name())
            .field("id", &self.id)
            .field("state", &self.state)
            .field("attributes", &self.attributes)
            .field("references", &self.references)
            .field("collections", &self.collections)
            .finish()
    }
}

/// Instances are equal when they have the same type and identifier
impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name() && self.id == other.id
    }
}
