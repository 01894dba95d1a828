//! Per-kind component storage with a deferred-write double buffer.

use crate::component::{Component, ComponentType};
use crate::entity::Entity;
use crate::hashing::{HashMap, IndexMap, IndexSet};
use crate::manager::TickState;

/// Owns the committed `entity -> component` table for one component kind, plus the queued
/// mutations issued while a tick is in progress.
///
/// Reads always see the committed table. While the manager is [`TickState::Ticking`], `set` and
/// `remove` only append to the pending buffers; [`flush`](Self::flush) applies them between
/// ticks. The pending buffers are insertion ordered so that flushes are deterministic.
pub struct ComponentMapper<C: Component> {
    component_type: ComponentType,
    components: HashMap<Entity, C>,
    pending_add: IndexMap<Entity, C>,
    pending_remove: IndexSet<Entity>,
}

impl<C: Component> Default for ComponentMapper<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Component> ComponentMapper<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            component_type: ComponentType::of::<C>(),
            components: HashMap::default(),
            pending_add: IndexMap::default(),
            pending_remove: IndexSet::default(),
        }
    }

    #[must_use]
    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    /// Returns the committed component for `entity`, if any.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&C> {
        self.components.get(&entity)
    }

    /// Returns a copy of the committed component for `entity`, or `default` if there is none.
    #[must_use]
    pub fn get_or(&self, entity: Entity, default: C) -> C
    where
        C: Clone,
    {
        self.components.get(&entity).cloned().unwrap_or(default)
    }

    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.components.contains_key(&entity)
    }

    /// The number of committed components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Iterates over the committed components.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &C)> {
        self.components.iter().map(|(entity, component)| (*entity, component))
    }

    /// The number of queued adds plus queued removes.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending_add.len() + self.pending_remove.len()
    }

    /// Stores `component` for `entity`. While ticking the write is queued, replacing any earlier
    /// queued write for the same entity (which keeps its position in the queue).
    pub fn set(&mut self, entity: Entity, component: C, tick: TickState) {
        match tick {
            TickState::Ticking => {
                self.pending_add.insert(entity, component);
            }
            TickState::Idle => {
                self.components.insert(entity, component);
            }
        }
    }

    /// Removes the component for `entity`. While ticking the removal is queued. Returns `true` if
    /// a committed value was removed or a new removal was queued.
    pub fn remove(&mut self, entity: Entity, tick: TickState) -> bool {
        match tick {
            TickState::Ticking => self.pending_remove.insert(entity),
            TickState::Idle => self.components.remove(&entity).is_some(),
        }
    }

    /// Immediately removes `entity`'s component, bypassing the queue. Used for entity teardown.
    /// Queued mutations for the entity are dropped as well so a later flush cannot resurrect it.
    pub fn destroy(&mut self, entity: Entity) -> Option<C> {
        self.pending_add.shift_remove(&entity);
        self.pending_remove.shift_remove(&entity);
        self.components.remove(&entity)
    }

    pub fn destroy_all<I: IntoIterator<Item = Entity>>(&mut self, entities: I) {
        for entity in entities {
            self.destroy(entity);
        }
    }

    /// Commits the queued mutations: every queued removal first, then every queued add, each in
    /// queue order. A removal and an add queued for the same entity therefore resolve to the
    /// added value.
    ///
    /// When `notify` is set, returns the entities whose component of this kind changed, in
    /// commit order, so the caller can re-evaluate the queries watching this kind. Otherwise
    /// returns an empty vector.
    pub fn flush(&mut self, notify: bool) -> Vec<Entity> {
        let mut changed = Vec::new();
        if notify {
            changed.reserve(self.pending_len());
        }

        for entity in self.pending_remove.drain(..) {
            if self.components.remove(&entity).is_some() && notify {
                changed.push(entity);
            }
        }
        for (entity, component) in self.pending_add.drain(..) {
            self.components.insert(entity, component);
            if notify {
                changed.push(entity);
            }
        }

        changed
    }
}
