//! Lazily dereferencing collections of related entities.
//!
//! A [`LazyRelatedCollection`] stores only remote identifiers, in order. Reading an
//! element (by index or through iteration) fetches that entity from the store with
//! `RemoteType.get(id)`; writing an element stores the given entity's id.
//!
//! There is no cache. Iterating a collection of N ids issues N queries, and iterating it
//! again issues N more. Callers that need the entities repeatedly should collect them once.
//!
//! # Example
//!
//! ```ignore
//! let mut org = mapper.create("Organization")?;
//! org.collection_mut("persons")?.push(&alice)?;
//! org.collection_mut("persons")?.push(&bob)?;
//!
//! // two `get` round trips, in stored order
//! for person in org.collection("persons")?.iter() {
//!     println!("{:?}", person?);
//! }
//! ```

use crate::error::OrmError;
use crate::mapper::Mapper;
use crate::model::Entity;
use std::fmt;

/// Iterator over dereferenced elements; each step is one store round trip
pub type RelatedIter<'a, T> = Box<dyn Iterator<Item = Result<Option<T>, OrmError>> + 'a>;

/// Ordered sequence of related entities
///
/// Reads return `Ok(None)` for an element whose id no longer resolves (or was stored as
/// null). Writes take the entity itself and keep only its identifier.
pub trait RelatedSequence {
    type Item;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dereference the element at `index`
    fn get(&self, index: usize) -> Result<Option<Self::Item>, OrmError>;

    /// Replace the element at `index`
    fn set(&mut self, index: usize, value: &Self::Item) -> Result<(), OrmError>;

    /// Insert before `index` (`index == len` appends)
    fn insert(&mut self, index: usize, value: &Self::Item) -> Result<(), OrmError>;

    /// Remove the element at `index`
    fn delete(&mut self, index: usize) -> Result<(), OrmError>;

    /// Dereference every element in order
    fn iter(&self) -> RelatedIter<'_, Self::Item>;
}

/// Ids of one remote entity type, dereferenced on access
#[derive(Clone)]
pub struct LazyRelatedCollection {
    mapper: Mapper,
    remote_type: String,
    ids: Vec<Option<String>>,
}

impl LazyRelatedCollection {
    pub(crate) fn new(mapper: Mapper, remote_type: String, ids: Vec<Option<String>>) -> Self {
        Self {
            mapper,
            remote_type,
            ids,
        }
    }

    /// Name of the entity type the ids refer to
    pub fn remote_type(&self) -> &str {
        &self.remote_type
    }

    /// Stored ids in order, including nulls read from the store
    pub fn raw_ids(&self) -> &[Option<String>] {
        &self.ids
    }

    /// Non-null stored ids in order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().filter_map(|id| id.as_deref())
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids().any(|stored| stored == id)
    }

    /// Append an entity's id
    pub fn push(&mut self, value: &Entity) -> Result<(), OrmError> {
        let index = self.ids.len();
        self.insert(index, value)
    }

    /// Remove the first element whose id equals `value.id()`
    ///
    /// # Returns
    ///
    /// Whether an element was removed.
    pub fn remove(&mut self, value: &Entity) -> bool {
        self.remove_id(value.id())
    }

    /// Remove the first element whose id equals `id`
    pub fn remove_id(&mut self, id: &str) -> bool {
        match self.ids.iter().position(|stored| stored.as_deref() == Some(id)) {
            Some(index) => {
                self.ids.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every element whose id equals `id`, returning how many were removed
    pub(crate) fn purge_id(&mut self, id: &str) -> usize {
        let before = self.ids.len();
        self.ids.retain(|stored| stored.as_deref() != Some(id));
        before - self.ids.len()
    }

    fn check_index(&self, index: usize, len: usize) -> Result<(), OrmError> {
        if index < len {
            Ok(())
        } else {
            Err(OrmError::IndexOutOfRange {
                index,
                len: self.ids.len(),
            })
        }
    }

    fn id_of(&self, value: &Entity) -> Result<String, OrmError> {
        if value.type_name() != self.remote_type {
            return Err(OrmError::TypeMismatch {
                expected: self.remote_type.clone(),
                actual: value.type_name().to_string(),
            });
        }
        Ok(value.id().to_string())
    }

    fn load(&self, id: Option<&str>) -> Result<Option<Entity>, OrmError> {
        match id {
            Some(id) => self.mapper.get(&self.remote_type, id),
            None => Ok(None),
        }
    }
}

impl RelatedSequence for LazyRelatedCollection {
    type Item = Entity;

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn get(&self, index: usize) -> Result<Option<Entity>, OrmError> {
        self.check_index(index, self.ids.len())?;
        self.load(self.ids[index].as_deref())
    }

    fn set(&mut self, index: usize, value: &Entity) -> Result<(), OrmError> {
        self.check_index(index, self.ids.len())?;
        let id = self.id_of(value)?;
        self.ids[index] = Some(id);
        Ok(())
    }

    fn insert(&mut self, index: usize, value: &Entity) -> Result<(), OrmError> {
        self.check_index(index, self.ids.len() + 1)?;
        let id = self.id_of(value)?;
        self.ids.insert(index, Some(id));
        Ok(())
    }

    fn delete(&mut self, index: usize) -> Result<(), OrmError> {
        self.check_index(index, self.ids.len())?;
        self.ids.remove(index);
        Ok(())
    }

    fn iter(&self) -> RelatedIter<'_, Entity> {
        Box::new(self.ids.iter().map(move |id| self.load(id.as_deref())))
    }
}

impl fmt::Debug for LazyRelatedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyRelatedCollection")
            .field("remote_type", &self.remote_type)
            .field("ids", &self.ids)
            .finish()
    }
}
