//! Entity type registry.
//!
//! Maps entity-type names to their [`EntityType`] declarations. Relation descriptors name
//! remote types as strings and are resolved here on each traversal, so types may be
//! registered in any order. Types are never unregistered.

use crate::error::OrmError;
use crate::model::EntityType;
use crate::relation::def::check_inverse;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Name → entity type lookup shared by every mapper clone
#[derive(Default)]
pub struct EntityRegistry {
    types: RwLock<HashMap<String, Arc<EntityType>>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type under its name
    ///
    /// # Errors
    ///
    /// [`OrmError::InvalidEntityType`] if the name is already registered.
    pub fn register(&self, entity_type: EntityType) -> Result<Arc<EntityType>, OrmError> {
        let mut types = self.types.write().unwrap_or_else(PoisonError::into_inner);
        if types.contains_key(entity_type.name()) {
            return Err(OrmError::InvalidEntityType(format!(
                "{} is already registered",
                entity_type.name()
            )));
        }
        log::info!(
            "registered entity type {} (table {}, {} fields)",
            entity_type.name(),
            entity_type.table_name(),
            entity_type.fields().len()
        );
        let entity_type = Arc::new(entity_type);
        types.insert(entity_type.name().to_string(), Arc::clone(&entity_type));
        Ok(entity_type)
    }

    /// Look up a registered type
    pub fn resolve(&self, name: &str) -> Result<Arc<EntityType>, OrmError> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| OrmError::UnknownEntityType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Every registered type, sorted by name
    pub fn entity_types(&self) -> Vec<Arc<EntityType>> {
        let mut types: Vec<Arc<EntityType>> = self
            .types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        types.sort_by(|a, b| a.name().cmp(b.name()));
        types
    }

    pub fn len(&self) -> usize {
        self.types.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check every declared relation against the registered types
    ///
    /// Traversal resolves relations lazily and reports the same problems on first use;
    /// calling this once all types are registered surfaces them at start-up instead.
    ///
    /// # Errors
    ///
    /// - [`OrmError::UnknownEntityType`] if a relation names an unregistered type
    /// - [`OrmError::InvalidRelationDescriptor`] if an inverse relation's remote field is
    ///   missing or of an incompatible kind
    pub fn validate(&self) -> Result<(), OrmError> {
        for entity_type in self.entity_types() {
            for field in entity_type.relations() {
                let kind = field.kind();
                let Some(remote_name) = kind.remote_type() else {
                    continue;
                };
                let remote = self.resolve(remote_name)?;
                if let (Some(relation), Some(descriptor)) = (kind.relation_kind(), kind.descriptor()) {
                    check_inverse(entity_type.name(), relation, descriptor, &remote)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry").field("types", &self.names()).finish()
    }
}
