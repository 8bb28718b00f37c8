//! # docguard
//!
//! Thread-safe object mapper over schema-less document stores.
//!
//! Entities are declared once as [`EntityType`]s and registered with an
//! [`EntityRegistry`]; a [`Mapper`] bundles that registry with a bounded
//! [`ConnectionPool`] and runs every operation: `get`, `filter`, `save`, `update`,
//! `refresh`, cascading `delete`, relation traversal and graph export.
//!
//! - **Pool**: non-blocking, capped creation; idle handles are recycled FIFO
//! - **Relations**: owning references, lazy collections of ids, has-many and has-one
//!   inverses resolved with one filter query
//! - **Store**: anything implementing [`store::StoreDriver`]; [`store::memory::MemoryStore`]
//!   ships in-process
//!
//! ```
//! use docguard::{EntityType, Mapper, RelatedSequence};
//! use docguard::store::memory::MemoryStore;
//! use std::sync::Arc;
//!
//! let mapper = Mapper::in_memory(Arc::new(MemoryStore::new().with_database("test")));
//! mapper.register(
//!     EntityType::builder("Organization")
//!         .attribute("name")
//!         .collection("persons", "Person")
//!         .build()?,
//! )?;
//! mapper.register(
//!     EntityType::builder("Person")
//!         .attribute("name")
//!         .has_many("orgs", "Organization", "persons")
//!         .build()?,
//! )?;
//! mapper.provision()?;
//!
//! let mut ada = mapper.create("Person")?;
//! ada.set_attribute("name", "Ada")?;
//! mapper.save(&mut ada)?;
//!
//! let mut org = mapper.create("Organization")?;
//! org.set_attribute("name", "Analytical Engines")?;
//! org.collection_mut("persons")?.push(&ada)?;
//! mapper.save(&mut org)?;
//!
//! assert_eq!(mapper.has_many(&ada, "orgs")?.len(), 1);
//! assert_eq!(org.collection("persons")?.len(), 1);
//! # Ok::<(), docguard::OrmError>(())
//! ```

pub mod config;
pub mod connection;
pub mod dump;
pub mod error;
mod lifecycle;
pub mod mapper;
pub mod metrics;
pub mod model;
pub mod pool;
pub mod provision;
pub mod registry;
pub mod relation;
pub mod store;
pub mod timestamp;

pub use config::DatabaseConfig;
pub use connection::{Connection, ConnectionError, ConnectionParams};
pub use dump::GraphDumper;
pub use error::OrmError;
pub use mapper::Mapper;
pub use model::{Entity, EntityState, EntityType, FieldKind, ReferenceTarget};
pub use pool::{ConnectionPool, PooledConnection};
pub use registry::EntityRegistry;
pub use relation::{LazyRelatedCollection, RelatedSequence, RelationDescriptor, RelationKind, RelationResolver};
pub use store::{Document, Predicate, StoreConnection, StoreDriver, StoreError, WriteOutcome};
