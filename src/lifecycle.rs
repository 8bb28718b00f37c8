//! Entity lifecycle operations.
//!
//! Loading (`get`, `filter`), persisting (`save`, `update`), reloading (`refresh`) and
//! cascading removal (`delete`) of entity instances. Each store round trip borrows a
//! pooled connection for that round trip only.
//!
//! None of these operations is transactional. A cascading delete that fails half-way
//! leaves the remotes it already updated as they are; concurrent deletes over overlapping
//! entities race and the last write wins.

use crate::error::OrmError;
use crate::mapper::Mapper;
use crate::model::{Entity, FieldKind};
use crate::provision;
use crate::store::{Document, Predicate, WriteOutcome, ID_FIELD};
use serde_json::Value as JsonValue;

impl Mapper {
    /// Fetch one entity by identifier
    ///
    /// # Returns
    ///
    /// `None` when no document has that id.
    ///
    /// # Errors
    ///
    /// - [`OrmError::MissingArgument`] if `id` is empty
    /// - [`OrmError::UnknownEntityType`] if `type_name` is not registered
    /// - [`OrmError::InstantiationFailure`] if the stored record no longer fits the type
    pub fn get(&self, type_name: &str, id: &str) -> Result<Option<Entity>, OrmError> {
        if id.is_empty() {
            return Err(OrmError::MissingArgument(ID_FIELD));
        }
        let entity_type = self.resolve(type_name)?;
        let table = entity_type.table_name();
        self.run("get", table, |conn| conn.get(table, id))?
            .map(|document| self.instantiate(&entity_type, document))
            .transpose()
    }

    /// Every entity whose `attribute` equals `value`
    ///
    /// An empty vector is a valid answer.
    ///
    /// # Errors
    ///
    /// - [`OrmError::MissingArgument`] if `attribute` is empty
    /// - [`OrmError::NoResult`] if the store answers with its "nothing" sentinel
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let does = mapper.filter("Person", "name", "Doe")?;
    /// for person in &does {
    ///     println!("{}", person.id());
    /// }
    /// ```
    pub fn filter(
        &self,
        type_name: &str,
        attribute: &str,
        value: impl Into<JsonValue>,
    ) -> Result<Vec<Entity>, OrmError> {
        if attribute.is_empty() {
            return Err(OrmError::MissingArgument("attribute"));
        }
        self.filter_by(type_name, Predicate::eq(attribute, value))
    }

    /// Every entity matching an arbitrary predicate
    pub fn filter_by(&self, type_name: &str, predicate: Predicate) -> Result<Vec<Entity>, OrmError> {
        let entity_type = self.resolve(type_name)?;
        let table = entity_type.table_name();
        match self.run("filter", table, |conn| conn.filter(table, &predicate))? {
            Some(rows) => rows
                .into_iter()
                .map(|document| self.instantiate(&entity_type, document))
                .collect(),
            None => Err(OrmError::NoResult {
                entity_type: entity_type.name().to_string(),
            }),
        }
    }

    /// Insert the entity as a new document and mark it persisted
    ///
    /// Collections are written as raw id lists (nulls included) and references as an id or
    /// null. There is no duplicate-id guard: saving an id that already exists is rejected
    /// by the store and reported as [`OrmError::WriteRejected`].
    pub fn save<'e>(&self, entity: &'e mut Entity) -> Result<&'e mut Entity, OrmError> {
        let table = entity.entity_type().table_name().to_string();
        let document = entity.to_document();
        let outcome = self.run("insert", &table, |conn| conn.insert(&table, document))?;
        check_outcome(&table, &outcome)?;

        entity.mark_persisted();
        log::debug!("saved {} {}", entity.type_name(), entity.id());
        Ok(entity)
    }

    /// Replace the stored document with the entity's current state
    ///
    /// Null ids are dropped from collections before writing. The store inserts the
    /// document if it is absent.
    pub fn update(&self, entity: &Entity) -> Result<WriteOutcome, OrmError> {
        let table = entity.entity_type().table_name();
        let document = entity.to_update_document();
        let outcome = self.run("replace", table, |conn| conn.replace(table, document))?;
        check_outcome(table, &outcome)?;
        Ok(outcome)
    }

    /// Reload the entity from storage, replacing every field in place
    ///
    /// # Returns
    ///
    /// `false` (and the entity untouched) when no document with its id exists.
    pub fn refresh(&self, entity: &mut Entity) -> Result<bool, OrmError> {
        match self.get(entity.type_name(), entity.id())? {
            Some(fresh) => {
                *entity = fresh;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete the entity, first scrubbing its id from every entity that references it
    ///
    /// For each has-many and has-one relation declared on the entity's type, the
    /// referencing remotes are loaded, the id is removed from their referencing field and
    /// each changed remote is written back with [`update`](Self::update). Then the entity's
    /// own document is deleted.
    ///
    /// # Returns
    ///
    /// `true` if exactly one document was deleted.
    pub fn delete(&self, entity: &Entity) -> Result<bool, OrmError> {
        let entity_type = entity.entity_type();
        for field in entity_type.inverse_relations() {
            let Some(descriptor) = field.kind().descriptor() else {
                continue;
            };
            for mut remote in self.relations().inverse(entity, field)? {
                if remote.scrub_reference(descriptor.remote_field(), entity.id())? {
                    self.update(&remote)?;
                    log::debug!(
                        "scrubbed {} {} from {} {}",
                        entity.type_name(),
                        entity.id(),
                        remote.type_name(),
                        remote.id()
                    );
                }
            }
        }

        let table = entity_type.table_name();
        let id = entity.id();
        let outcome = self.run("delete", table, |conn| conn.delete(table, id))?;
        Ok(outcome.deleted == 1)
    }

    /// The raw stored document for the entity, bypassing instantiation
    pub fn fetch_document(&self, entity: &Entity) -> Result<Option<Document>, OrmError> {
        let table = entity.entity_type().table_name();
        let id = entity.id();
        self.run("get", table, |conn| conn.get(table, id))
    }

    /// Create the table of a registered type if it does not exist
    ///
    /// # Returns
    ///
    /// Whether the table was created.
    pub fn ensure_table(&self, type_name: &str) -> Result<bool, OrmError> {
        let entity_type = self.resolve(type_name)?;
        let table = entity_type.table_name();
        self.run("ensure_table", table, |conn| provision::ensure_table(conn, table))
    }

    /// Create the tables of every registered type
    ///
    /// # Returns
    ///
    /// The names of the tables that were created.
    pub fn provision(&self) -> Result<Vec<String>, OrmError> {
        let mut created = Vec::new();
        for entity_type in self.registry().entity_types() {
            if self.ensure_table(entity_type.name())? {
                created.push(entity_type.table_name().to_string());
            }
        }
        if !created.is_empty() {
            log::info!("created tables: {}", created.join(", "));
        }
        Ok(created)
    }

    /// Create a database if it does not exist
    pub fn create_database(&self, name: &str) -> Result<bool, OrmError> {
        self.run("create_database", name, |conn| provision::create_database(conn, name))
    }

    /// Drop a database if it exists
    pub fn drop_database(&self, name: &str) -> Result<bool, OrmError> {
        self.run("drop_database", name, |conn| provision::drop_database(conn, name))
    }

    /// Entity an owning reference points at (see [`RelationResolver::dereference`])
    ///
    /// [`RelationResolver::dereference`]: crate::relation::RelationResolver::dereference
    pub fn dereference(&self, entity: &Entity, field: &str) -> Result<Option<Entity>, OrmError> {
        self.relations().dereference(entity, field)
    }

    /// Has-many inverse relation (see [`RelationResolver::has_many`])
    ///
    /// [`RelationResolver::has_many`]: crate::relation::RelationResolver::has_many
    pub fn has_many(&self, entity: &Entity, name: &str) -> Result<Vec<Entity>, OrmError> {
        self.relations().has_many(entity, name)
    }

    /// Has-one inverse relation (see [`RelationResolver::has_one`])
    ///
    /// [`RelationResolver::has_one`]: crate::relation::RelationResolver::has_one
    pub fn has_one(&self, entity: &Entity, name: &str) -> Result<Vec<Entity>, OrmError> {
        self.relations().has_one(entity, name)
    }
}

fn check_outcome(table: &str, outcome: &WriteOutcome) -> Result<(), OrmError> {
    if outcome.is_ok() {
        return Ok(());
    }
    let message = outcome
        .first_error
        .clone()
        .unwrap_or_else(|| format!("{} write error(s) reported", outcome.errors));
    log::warn!("write to {} rejected: {}", table, message);
    Err(OrmError::WriteRejected {
        table: table.to_string(),
        message,
    })
}
