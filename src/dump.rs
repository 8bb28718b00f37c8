//! Cycle-safe export of entity graphs.
//!
//! [`GraphDumper::dump`] turns an entity and everything reachable through its declared
//! relations into a plain [`serde_json::Value`]. While descending it keeps the set of
//! entity *type* names on the current path. A related entity is expanded only if its type
//! is not on the path yet; each branch gets its own copy of the path, so siblings do not
//! affect each other.
//!
//! The guard is keyed by type, not by instance. It always terminates on cyclic graphs,
//! but two distinct entities of the same type on one path are never both expanded (a
//! `Person` reached from another `Person` shows up as its id). When a branch is not
//! expanded, owning references and collections keep their raw ids and inverse relations
//! are left out.
//!
//! ```text
//! Organization            path {}
//! └─ persons[0]: Person   path {Organization}
//!    ├─ family: Family    path {Organization, Person}
//!    │  └─ members        omitted, Person on path
//!    └─ orgs              omitted, Organization on path
//! ```

use crate::error::OrmError;
use crate::mapper::Mapper;
use crate::model::{Entity, FieldKind};
use crate::relation::RelatedSequence;
use crate::store::ID_FIELD;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;

/// Recursive graph exporter bound to a [`Mapper`]
#[derive(Debug, Clone, Copy)]
pub struct GraphDumper<'m> {
    mapper: &'m Mapper,
}

impl<'m> GraphDumper<'m> {
    pub(crate) fn new(mapper: &'m Mapper) -> Self {
        Self { mapper }
    }

    /// Export `entity` and its reachable relations
    ///
    /// Owning references become nested objects (or `null` when unset or dangling);
    /// collections and inverse relations become arrays.
    pub fn dump(&self, entity: &Entity) -> Result<JsonValue, OrmError> {
        self.dump_entity(entity, &BTreeSet::new())
    }

    /// [`dump`](Self::dump) rendered as pretty-printed JSON text
    pub fn dump_json(&self, entity: &Entity) -> Result<String, OrmError> {
        Ok(serde_json::to_string_pretty(&self.dump(entity)?)?)
    }

    fn dump_entity(&self, entity: &Entity, path: &BTreeSet<String>) -> Result<JsonValue, OrmError> {
        let mut path = path.clone();
        path.insert(entity.type_name().to_string());

        let mut out = Map::new();
        out.insert(ID_FIELD.to_string(), JsonValue::String(entity.id().to_string()));

        for field in entity.entity_type().fields() {
            let name = field.name();
            let value = match field.kind() {
                FieldKind::Attribute { .. } => match entity.attribute(name) {
                    Some(value) => value.clone(),
                    None => continue,
                },
                FieldKind::Reference { remote_type } => {
                    let id = entity.reference_id(name)?;
                    match id {
                        None => JsonValue::Null,
                        Some(id) if path.contains(remote_type.as_str()) => JsonValue::String(id.to_string()),
                        Some(_) => match self.mapper.dereference(entity, name)? {
                            Some(remote) => self.dump_entity(&remote, &path)?,
                            None => JsonValue::Null,
                        },
                    }
                }
                FieldKind::Collection { remote_type } => {
                    let collection = entity.collection(name)?;
                    if path.contains(remote_type.as_str()) {
                        let ids = collection
                            .raw_ids()
                            .iter()
                            .map(|id| id.clone().map_or(JsonValue::Null, JsonValue::String))
                            .collect();
                        JsonValue::Array(ids)
                    } else {
                        let mut items = Vec::with_capacity(collection.len());
                        for remote in collection.iter() {
                            items.push(match remote? {
                                Some(remote) => self.dump_entity(&remote, &path)?,
                                None => JsonValue::Null,
                            });
                        }
                        JsonValue::Array(items)
                    }
                }
                FieldKind::HasMany(descriptor) | FieldKind::HasOne(descriptor) => {
                    if path.contains(descriptor.remote_type()) {
                        continue;
                    }
                    let remotes = self.mapper.relations().inverse(entity, field)?;
                    let items = remotes
                        .iter()
                        .map(|remote| self.dump_entity(remote, &path))
                        .collect::<Result<Vec<_>, _>>()?;
                    JsonValue::Array(items)
                }
            };
            out.insert(name.to_string(), value);
        }

        Ok(JsonValue::Object(out))
    }
}
