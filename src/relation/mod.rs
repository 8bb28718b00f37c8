//! Relations between entity types.
//!
//! Four kinds are supported (see [`RelationKind`]):
//! - owning reference: one remote id stored on this entity
//! - collection: an ordered list of remote ids, read through [`LazyRelatedCollection`]
//! - has-many inverse: remote entities whose list field contains our id
//! - has-one inverse: remote entities whose scalar field equals our id
//!
//! Inverse relations are resolved by [`RelationResolver`] with one filter query on the
//! remote table.

pub mod def;
pub mod lazy;
pub mod resolver;

#[doc(inline)]
pub use def::{RelationDescriptor, RelationKind};
#[doc(inline)]
pub use lazy::{LazyRelatedCollection, RelatedIter, RelatedSequence};
#[doc(inline)]
pub use resolver::RelationResolver;
