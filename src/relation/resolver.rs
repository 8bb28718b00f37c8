//! Relation resolution.
//!
//! Every traversal runs in two sequential steps: the remote entity type is resolved through
//! the registry (and, for inverse relations, the remote field is checked against its
//! declaration), then one store round trip fetches the related records. Resolution only
//! reads; remote entities are never modified here.

use crate::error::OrmError;
use crate::mapper::Mapper;
use crate::model::{Entity, FieldDef, FieldKind};
use crate::relation::def::{check_inverse, RelationKind};
use crate::store::Predicate;

/// Resolves declared relations of entities through a [`Mapper`]
#[derive(Debug, Clone, Copy)]
pub struct RelationResolver<'m> {
    mapper: &'m Mapper,
}

impl<'m> RelationResolver<'m> {
    pub(crate) fn new(mapper: &'m Mapper) -> Self {
        Self { mapper }
    }

    /// Fetch the entity an owning reference points at
    ///
    /// # Returns
    ///
    /// `None` when the reference is unset or its id no longer exists.
    ///
    /// # Errors
    ///
    /// [`OrmError::UnknownField`] if `field` is not an owning reference on `entity`'s type.
    pub fn dereference(&self, entity: &Entity, field: &str) -> Result<Option<Entity>, OrmError> {
        let remote_type = match entity.entity_type().field(field).map(FieldDef::kind) {
            Some(FieldKind::Reference { remote_type }) => remote_type,
            _ => return Err(unknown_field(entity, field)),
        };
        match entity.reference_id(field)? {
            Some(id) => self.mapper.get(remote_type, id),
            None => Ok(None),
        }
    }

    /// Remote entities whose list field contains `entity`'s id
    ///
    /// `name` must be a has-many relation declared on `entity`'s type. An empty vector
    /// means nothing references the entity.
    pub fn has_many(&self, entity: &Entity, name: &str) -> Result<Vec<Entity>, OrmError> {
        match entity.entity_type().field(name) {
            Some(field) if matches!(field.kind(), FieldKind::HasMany(_)) => self.inverse(entity, field),
            _ => Err(unknown_field(entity, name)),
        }
    }

    /// Remote entities whose scalar field equals `entity`'s id
    ///
    /// Every match is returned; nothing enforces that at most one remote entity holds the
    /// reference.
    pub fn has_one(&self, entity: &Entity, name: &str) -> Result<Vec<Entity>, OrmError> {
        match entity.entity_type().field(name) {
            Some(field) if matches!(field.kind(), FieldKind::HasOne(_)) => self.inverse(entity, field),
            _ => Err(unknown_field(entity, name)),
        }
    }

    /// Resolve any inverse relation field declared on `entity`'s type
    ///
    /// # Errors
    ///
    /// - [`OrmError::UnknownField`] if `field` is not an inverse relation
    /// - [`OrmError::UnknownEntityType`] if the remote type is not registered
    /// - [`OrmError::InvalidRelationDescriptor`] if the remote field is missing or of an
    ///   incompatible kind
    /// - [`OrmError::InstantiationFailure`] if a matching record does not fit the remote type
    pub fn inverse(&self, entity: &Entity, field: &FieldDef) -> Result<Vec<Entity>, OrmError> {
        let (kind, descriptor) = match field.kind() {
            FieldKind::HasMany(d) => (RelationKind::HasManyInverse, d),
            FieldKind::HasOne(d) => (RelationKind::HasOneInverse, d),
            _ => return Err(unknown_field(entity, field.name())),
        };

        let remote = self.mapper.resolve(descriptor.remote_type())?;
        check_inverse(entity.type_name(), kind, descriptor, &remote)?;

        let predicate = match kind {
            RelationKind::HasManyInverse => Predicate::contains(descriptor.remote_field(), entity.id()),
            _ => Predicate::eq(descriptor.remote_field(), entity.id()),
        };
        let table = remote.table_name();
        log::debug!("resolving {}.{} via {}", entity.type_name(), field.name(), descriptor);

        // A "nothing" answer to a relation scan is the same as no matches
        let rows = self
            .mapper
            .run("filter", table, |conn| conn.filter(table, &predicate))?
            .unwrap_or_default();

        rows.into_iter()
            .map(|document| self.mapper.instantiate(&remote, document))
            .collect()
    }
}

fn unknown_field(entity: &Entity, field: &str) -> OrmError {
    OrmError::UnknownField {
        entity_type: entity.type_name().to_string(),
        field: field.to_string(),
    }
}
