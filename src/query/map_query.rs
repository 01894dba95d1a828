use std::any::Any;

use crate::component::{ComponentKind, ComponentRegistry};
use crate::entity::Entity;
use crate::error::EcsError;
use crate::hashing::IndexSet;
use crate::query::keyed::{KeyComponent, KeyedMembership};
use crate::query::{Query, QueryFilter};

/// A query that also maintains a unique `K -> Entity` lookup over its members.
///
/// Keys are expected to be unique among members. When several members do hold the same key value,
/// the key resolves to the member that committed it most recently; if that member leaves the query
/// or changes its key, the key resolves to the previous holder again.
///
/// ```rust
/// use tessera::prelude::*;
///
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// struct Tag(&'static str);
///
/// let mut manager = Manager::new();
/// manager.register_component::<Tag>();
/// let tags = manager.register_query(MapQuery::<Tag>::new()).unwrap();
///
/// let player = manager.create_with(|manager, entity| {
///     manager.add_component(entity, Tag("player"));
/// });
/// assert_eq!(manager.query(tags).unwrap().get(&Tag("player")), Some(player));
/// ```
#[derive(Debug)]
pub struct MapQuery<K: KeyComponent> {
    inner: KeyedMembership<K>,
}

impl<K: KeyComponent> Default for MapQuery<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: KeyComponent> MapQuery<K> {
    /// A query over every entity that has a `K`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_filter(QueryFilter::new().with::<K>())
    }

    /// A query over an arbitrary filter. Members without a `K` are members, but cannot be looked
    /// up by key.
    #[must_use]
    pub fn with_filter(filter: QueryFilter) -> Self {
        Self {
            inner: KeyedMembership::new(filter),
        }
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<Entity> {
        self.inner.index.latest(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.index.holders(key).is_some()
    }

    /// The key `entity` is indexed under.
    #[must_use]
    pub fn key_of(&self, entity: Entity) -> Option<&K> {
        self.inner.index.key_of(entity)
    }

    /// Iterates over `(key, entity)` pairs, one per distinct key.
    pub fn iter(&self) -> impl Iterator<Item = (&K, Entity)> {
        self.inner
            .index
            .iter()
            .filter_map(|(key, holders)| holders.last().map(|entity| (key, *entity)))
    }

    /// The number of distinct keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.inner.index.key_count()
    }
}

impl<K: KeyComponent> Query for MapQuery<K> {
    fn filter(&self) -> &QueryFilter {
        self.inner.membership.filter()
    }

    fn bind(&mut self, components: &ComponentRegistry) -> Result<(), EcsError> {
        self.inner.bind(components)
    }

    fn is_bound(&self) -> bool {
        self.inner.is_bound()
    }

    fn watched_kinds(&self) -> Vec<ComponentKind> {
        self.inner.watched_kinds()
    }

    fn matches(&self, entity: Entity, components: &ComponentRegistry) -> bool {
        self.inner.membership.matches(entity, components)
    }

    fn entities(&self) -> &IndexSet<Entity> {
        self.inner.membership.entities()
    }

    fn offer(
        &mut self,
        entity: Entity,
        components: &ComponentRegistry,
        remove_if_applicable: bool,
    ) -> bool {
        self.inner.offer(entity, components, remove_if_applicable)
    }

    fn forget(&mut self, entity: Entity) -> bool {
        self.inner.forget(entity)
    }

    fn validate(
        &self,
        live: &IndexSet<Entity>,
        components: &ComponentRegistry,
    ) -> Result<(), String> {
        self.inner.validate(live, components)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
