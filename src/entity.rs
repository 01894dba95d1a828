/*!

An [`Entity`] is an opaque handle naming one logical object. It carries no data of its own: it is
the key into every [`ComponentMapper`](crate::component::ComponentMapper) table and the element
type of every query's membership set.

Handles are minted only by the [`Manager`](crate::manager::Manager), starting at `1` and strictly
increasing. An id is never reused, even after the entity it named has been destroyed, so a stale
handle can never alias a newer entity.

*/

use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};

/// A type that can be named and used (copied, hashed, compared) but not created outside of this
/// crate.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(u64);

impl Entity {
    /// Only constructible from this crate.
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw integer id of this entity.
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

// The value `Entity(7)` has `Debug` display "Entity(7)".
impl Debug for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Entity").field(&self.0).finish()
    }
}

// The value `Entity(7)` will display as "7".
impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out strictly increasing entity ids. Ids are never returned to the allocator.
#[derive(Debug, Default)]
pub(crate) struct EntityAllocator {
    /// The id of the most recently allocated entity; `0` means none yet.
    last: u64,
}

impl EntityAllocator {
    pub(crate) fn next(&mut self) -> Entity {
        self.last += 1;
        Entity::new(self.last)
    }

    /// The number of ids handed out so far, including those of destroyed entities.
    pub(crate) fn allocated(&self) -> u64 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_starts_at_one_and_increases() {
        let mut allocator = EntityAllocator::default();
        assert_eq!(allocator.next(), Entity::new(1));
        assert_eq!(allocator.next(), Entity::new(2));
        assert_eq!(allocator.next(), Entity::new(3));
        assert_eq!(allocator.allocated(), 3);
    }

    #[test]
    fn entity_formats() {
        let entity = Entity::new(7);
        assert_eq!(format!("{entity:?}"), "Entity(7)");
        assert_eq!(format!("{entity}"), "7");
        assert_eq!(entity.id(), 7);
    }

    #[test]
    fn entity_serializes_transparently() {
        let entity = Entity::new(42);
        assert_eq!(serde_json::to_string(&entity).unwrap(), "42");
        let back: Entity = serde_json::from_str("42").unwrap();
        assert_eq!(back, entity);
    }
}
