//! The mapper context.
//!
//! A [`Mapper`] bundles the shared [`ConnectionPool`] and [`EntityRegistry`]. It is cheap
//! to clone (two `Arc`s) and every entity-level operation goes through it: lifecycle
//! methods (`get`, `filter`, `save`, `update`, `refresh`, `delete`), relation resolution
//! and graph export. Entities keep a clone so their lazy collections can load remote
//! entities on access.
//!
//! # Examples
//!
//! ```
//! use docguard::{EntityType, Mapper};
//! use docguard::store::memory::MemoryStore;
//! use std::sync::Arc;
//!
//! let mapper = Mapper::in_memory(Arc::new(MemoryStore::new().with_database("test")));
//! mapper.register(EntityType::builder("Family").attribute("name").build()?)?;
//! mapper.provision()?;
//!
//! let mut family = mapper.create("Family")?;
//! family.set_attribute("name", "Doe")?;
//! mapper.save(&mut family)?;
//!
//! let loaded = mapper.get("Family", family.id())?.expect("saved");
//! assert_eq!(loaded.attribute("name"), Some(&serde_json::json!("Doe")));
//! # Ok::<(), docguard::OrmError>(())
//! ```

use crate::config::DatabaseConfig;
use crate::connection::Connection;
use crate::dump::GraphDumper;
use crate::error::OrmError;
use crate::model::{new_id, Entity, EntityType};
use crate::pool::ConnectionPool;
use crate::registry::EntityRegistry;
use crate::relation::RelationResolver;
use crate::store::{Document, StoreDriver, StoreError};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Shared pool and registry, the context of every entity operation
#[derive(Clone)]
pub struct Mapper {
    pool: Arc<ConnectionPool>,
    registry: Arc<EntityRegistry>,
}

impl Mapper {
    pub fn new(pool: Arc<ConnectionPool>, registry: Arc<EntityRegistry>) -> Self {
        Self { pool, registry }
    }

    /// Mapper over a fresh pool (default capacity and parameters) and an empty registry
    pub fn in_memory(driver: Arc<dyn StoreDriver>) -> Self {
        Self::new(Arc::new(ConnectionPool::new(driver)), Arc::new(EntityRegistry::new()))
    }

    /// Mapper over a pool built from a loaded configuration and an empty registry
    pub fn from_config(driver: Arc<dyn StoreDriver>, config: &DatabaseConfig) -> Self {
        Self::new(
            Arc::new(ConnectionPool::from_config(driver, config)),
            Arc::new(EntityRegistry::new()),
        )
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    /// Register an entity type with this mapper's registry
    pub fn register(&self, entity_type: EntityType) -> Result<Arc<EntityType>, OrmError> {
        self.registry.register(entity_type)
    }

    /// Look up a registered entity type
    pub fn resolve(&self, type_name: &str) -> Result<Arc<EntityType>, OrmError> {
        self.registry.resolve(type_name)
    }

    /// New transient instance with a fresh identifier
    pub fn create(&self, type_name: &str) -> Result<Entity, OrmError> {
        self.create_with_id(type_name, new_id())
    }

    /// New transient instance with a caller-chosen identifier
    pub fn create_with_id(&self, type_name: &str, id: impl Into<String>) -> Result<Entity, OrmError> {
        let id = id.into();
        if id.is_empty() {
            return Err(OrmError::MissingArgument("id"));
        }
        let entity_type = self.resolve(type_name)?;
        Ok(Entity::new(entity_type, self, id))
    }

    /// Relation resolution bound to this mapper
    pub fn relations(&self) -> RelationResolver<'_> {
        RelationResolver::new(self)
    }

    /// Graph export bound to this mapper
    pub fn dumper(&self) -> GraphDumper<'_> {
        GraphDumper::new(self)
    }

    /// Run one store round trip on a pooled connection
    ///
    /// The connection is acquired for the duration of `f` only and returned to the pool
    /// on every exit path.
    pub(crate) fn run<T, F>(&self, op: &'static str, table: &str, f: F) -> Result<T, OrmError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::store_op_span(op, table).entered();

        let mut conn = self.pool.acquire()?;
        let started = Instant::now();
        let result = f(&mut *conn);
        let elapsed = started.elapsed();

        #[cfg(feature = "metrics")]
        {
            crate::metrics::METRICS.record_store_op(op, elapsed);
            if result.is_err() {
                crate::metrics::METRICS.record_store_error(op);
            }
        }

        match &result {
            Ok(_) => log::debug!("{} on {} took {:?} (connection #{})", op, table, elapsed, conn.serial()),
            Err(e) => log::debug!("{} on {} failed after {:?}: {}", op, table, elapsed, e),
        }
        Ok(result?)
    }

    /// Build an instance of `entity_type` from a stored record
    pub(crate) fn instantiate(&self, entity_type: &Arc<EntityType>, document: Document) -> Result<Entity, OrmError> {
        Entity::from_document(Arc::clone(entity_type), self, document)
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("pool", &self.pool)
            .field("registry", &self.registry)
            .finish()
    }
}
