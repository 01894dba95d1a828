/*!

A `ComponentRegistry` implements the registry pattern for component mappers: it wraps a vector of
type-erased [`ComponentMapper`]s, one per registered component kind. The position of a mapper in
the vector is its [`ComponentKind`].

Typed access (`mapper::<C>()`) goes through a `TypeId -> ComponentKind` map and then downcasts.
Untyped access (`has(kind, entity)`), which is what query predicates use on every offer, is a
plain index into the vector followed by a virtual call.

*/

use std::any::{Any, TypeId};
use std::fmt::Debug;

use crate::component::{Component, ComponentKind, ComponentMapper, ComponentType};
use crate::entity::Entity;
use crate::hashing::HashMap;

/// This trait encapsulates the type-erased API of a `ComponentMapper<C>`.
pub(crate) trait ErasedMapper {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn component_type(&self) -> ComponentType;
    fn contains(&self, entity: Entity) -> bool;
    fn debug_value(&self, entity: Entity) -> Option<&dyn Debug>;
    fn committed_len(&self) -> usize;
    fn pending_len(&self) -> usize;

    fn destroy(&mut self, entity: Entity);
    fn destroy_all(&mut self, entities: &[Entity]);
    fn flush(&mut self, notify: bool) -> Vec<Entity>;
}

// Implements the type-erased API for ComponentMapper<C>.
impl<C: Component> ErasedMapper for ComponentMapper<C> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn component_type(&self) -> ComponentType {
        ComponentMapper::component_type(self)
    }

    fn contains(&self, entity: Entity) -> bool {
        ComponentMapper::contains(self, entity)
    }

    fn debug_value(&self, entity: Entity) -> Option<&dyn Debug> {
        self.get(entity).map(|component| component as &dyn Debug)
    }

    fn committed_len(&self) -> usize {
        self.len()
    }

    fn pending_len(&self) -> usize {
        ComponentMapper::pending_len(self)
    }

    fn destroy(&mut self, entity: Entity) {
        ComponentMapper::destroy(self, entity);
    }

    fn destroy_all(&mut self, entities: &[Entity]) {
        ComponentMapper::destroy_all(self, entities.iter().copied());
    }

    fn flush(&mut self, notify: bool) -> Vec<Entity> {
        ComponentMapper::flush(self, notify)
    }
}

/// Owns one mapper per registered component kind.
#[derive(Default)]
pub struct ComponentRegistry {
    kinds: HashMap<TypeId, ComponentKind>,
    mappers: Vec<Box<dyn ErasedMapper>>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a mapper for `C` if it does not have one yet. Returns the kind and whether it was
    /// newly registered; registering twice keeps the existing mapper and its data.
    pub(crate) fn register<C: Component>(&mut self) -> (ComponentKind, bool) {
        let type_id = TypeId::of::<C>();
        if let Some(kind) = self.kinds.get(&type_id) {
            return (*kind, false);
        }
        let kind = ComponentKind::new(self.mappers.len());
        self.mappers.push(Box::new(ComponentMapper::<C>::new()));
        self.kinds.insert(type_id, kind);
        (kind, true)
    }

    /// The number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    #[must_use]
    pub fn kind_of<C: Component>(&self) -> Option<ComponentKind> {
        self.kinds.get(&TypeId::of::<C>()).copied()
    }

    #[must_use]
    pub fn kind_of_type(&self, component_type: ComponentType) -> Option<ComponentKind> {
        self.kinds.get(&component_type.type_id()).copied()
    }

    #[must_use]
    pub fn component_type(&self, kind: ComponentKind) -> Option<ComponentType> {
        self.mappers
            .get(kind.index())
            .map(|mapper| mapper.component_type())
    }

    #[must_use]
    pub fn mapper<C: Component>(&self) -> Option<&ComponentMapper<C>> {
        let kind = self.kind_of::<C>()?;
        self.mapper_by_kind(kind)
    }

    /// Fetches the typed mapper stored at `kind`. Returns `None` if `kind` is out of range or does
    /// not hold a `ComponentMapper<C>`.
    #[must_use]
    pub fn mapper_by_kind<C: Component>(&self, kind: ComponentKind) -> Option<&ComponentMapper<C>> {
        self.mappers
            .get(kind.index())?
            .as_any()
            .downcast_ref::<ComponentMapper<C>>()
    }

    pub(crate) fn mapper_mut<C: Component>(
        &mut self,
    ) -> Option<(ComponentKind, &mut ComponentMapper<C>)> {
        let kind = self.kind_of::<C>()?;
        let mapper = self
            .mappers
            .get_mut(kind.index())?
            .as_any_mut()
            .downcast_mut::<ComponentMapper<C>>()?;
        Some((kind, mapper))
    }

    /// Whether `entity` has a committed component of the given kind. Unknown kinds have no
    /// components.
    #[must_use]
    pub fn has(&self, kind: ComponentKind, entity: Entity) -> bool {
        self.mappers
            .get(kind.index())
            .is_some_and(|mapper| mapper.contains(entity))
    }

    /// Typed read of a committed component by kind.
    #[must_use]
    pub fn get<C: Component>(&self, kind: ComponentKind, entity: Entity) -> Option<&C> {
        self.mapper_by_kind::<C>(kind)?.get(entity)
    }

    /// A debug view of every committed component `entity` has, in kind order.
    #[must_use]
    pub fn components_of(&self, entity: Entity) -> Vec<(ComponentType, &dyn Debug)> {
        self.mappers
            .iter()
            .filter_map(|mapper| {
                mapper
                    .debug_value(entity)
                    .map(|value| (mapper.component_type(), value))
            })
            .collect()
    }

    /// The total number of queued mutations across all mappers.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.mappers.iter().map(|mapper| mapper.pending_len()).sum()
    }

    /// Flushes the mapper at `kind`. See [`ComponentMapper::flush`].
    pub(crate) fn flush_kind(&mut self, kind: ComponentKind, notify: bool) -> Vec<Entity> {
        self.mappers
            .get_mut(kind.index())
            .map_or_else(Vec::new, |mapper| mapper.flush(notify))
    }

    /// The number of committed components of the given kind.
    #[must_use]
    pub fn committed_len(&self, kind: ComponentKind) -> usize {
        self.mappers
            .get(kind.index())
            .map_or(0, |mapper| mapper.committed_len())
    }

    pub(crate) fn destroy(&mut self, entity: Entity) {
        for mapper in &mut self.mappers {
            mapper.destroy(entity);
        }
    }

    pub(crate) fn destroy_all(&mut self, entities: &[Entity]) {
        for mapper in &mut self.mappers {
            mapper.destroy_all(entities);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::TickState;

    #[derive(Debug, Clone, PartialEq)]
    struct Position(i32, i32);

    #[derive(Debug)]
    struct Velocity;

    #[test]
    fn kinds_are_dense_and_registration_is_idempotent() {
        let mut registry = ComponentRegistry::new();
        let (position, new_position) = registry.register::<Position>();
        let (velocity, new_velocity) = registry.register::<Velocity>();
        assert!(new_position && new_velocity);
        assert_eq!(position.index(), 0);
        assert_eq!(velocity.index(), 1);

        registry
            .mapper_mut::<Position>()
            .unwrap()
            .1
            .set(Entity::new(1), Position(1, 2), TickState::Idle);

        let (again, newly) = registry.register::<Position>();
        assert_eq!(again, position);
        assert!(!newly);
        assert_eq!(registry.len(), 2);
        // The existing data survived.
        assert_eq!(
            registry.get::<Position>(position, Entity::new(1)),
            Some(&Position(1, 2))
        );
    }

    #[test]
    fn unregistered_kinds_are_absent() {
        let registry = ComponentRegistry::new();
        assert!(registry.kind_of::<Position>().is_none());
        assert!(registry.mapper::<Position>().is_none());
        assert!(!registry.has(ComponentKind::new(3), Entity::new(1)));
        assert!(registry.component_type(ComponentKind::new(0)).is_none());
    }

    #[test]
    fn wrong_type_at_kind_is_absent() {
        let mut registry = ComponentRegistry::new();
        let (position, _) = registry.register::<Position>();
        assert!(registry.mapper_by_kind::<Velocity>(position).is_none());
    }

    #[test]
    fn components_of_lists_committed_values() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Position>();
        registry.register::<Velocity>();
        let entity = Entity::new(4);
        registry
            .mapper_mut::<Position>()
            .unwrap()
            .1
            .set(entity, Position(3, 4), TickState::Idle);
        registry
            .mapper_mut::<Velocity>()
            .unwrap()
            .1
            .set(entity, Velocity, TickState::Ticking);

        let components = registry.components_of(entity);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].0.name(), "Position");
        assert_eq!(format!("{:?}", components[0].1), "Position(3, 4)");
        assert_eq!(registry.pending_len(), 1);

        registry.destroy(entity);
        assert!(registry.components_of(entity).is_empty());
        assert_eq!(registry.pending_len(), 0);
    }
}
