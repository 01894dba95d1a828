use std::any::Any;

use crate::component::{ComponentKind, ComponentRegistry};
use crate::entity::Entity;
use crate::error::EcsError;
use crate::hashing::IndexSet;
use crate::query::keyed::{KeyComponent, KeyedMembership};
use crate::query::{Query, QueryFilter};

/// A query that also groups its members by the value of a key component `K`.
#[derive(Debug)]
pub struct MultimapQuery<K: KeyComponent> {
    inner: KeyedMembership<K>,
}

impl<K: KeyComponent> Default for MultimapQuery<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: KeyComponent> MultimapQuery<K> {
    /// A query over every entity that has a `K`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_filter(QueryFilter::new().with::<K>())
    }

    #[must_use]
    pub fn with_filter(filter: QueryFilter) -> Self {
        Self {
            inner: KeyedMembership::new(filter),
        }
    }

    /// The members holding `key`, in the order they last committed it. Never returns an empty set.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&IndexSet<Entity>> {
        self.inner.index.holders(key)
    }

    #[must_use]
    pub fn count(&self, key: &K) -> usize {
        self.inner.index.holders(key).map_or(0, |holders| holders.len())
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.index.holders(key).is_some()
    }

    #[must_use]
    pub fn key_of(&self, entity: Entity) -> Option<&K> {
        self.inner.index.key_of(entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &IndexSet<Entity>)> {
        self.inner.index.iter()
    }

    #[must_use]
    pub fn key_count(&self) -> usize {
        self.inner.index.key_count()
    }
}

impl<K: KeyComponent> Query for MultimapQuery<K> {
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
