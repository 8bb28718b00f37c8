//! Entity types and instances.
//!
//! - [`EntityType`]: declared fields and relations of one kind of document
//! - [`Entity`]: one instance, bound to its type

pub mod entity;
pub mod entity_type;

pub use entity::{new_id, Entity, EntityState, ReferenceTarget};
pub use entity_type::{table_name_for, EntityType, EntityTypeBuilder, FieldDef, FieldKind};
