/*!

A query is an incrementally maintained set of entities matching an include/exclude predicate over
component kinds:

```text
membership == { e : e has every `include` kind } ∩ { e : e has no `exclude` kind }
```

Queries never scan the population on their own. The [`Manager`](crate::manager::Manager) offers
them individual entities whenever something relevant changes: once per live entity at
registration, once per new entity, and once per committed (entity, kind) change for every query
whose [`watched_kinds`](Query::watched_kinds) contain that kind (routing is done by the
[`QueryContainer`]).

A query goes through two states. It is constructed unbound, naming its kinds by
[`ComponentType`]. [`Query::bind`] resolves those types against the manager's
[`ComponentRegistry`] and caches the resulting [`ComponentKind`]s, so each later predicate
evaluation is a handful of array lookups. An unbound query matches nothing.

Three query types are provided:

- [`FilterQuery`]: membership only.
- [`MapQuery<K>`]: membership plus a unique `K -> Entity` index over a key component.
- [`MultimapQuery<K>`]: membership plus a `K -> {Entity}` index over a key component.

Registering a query returns a typed [`QueryHandle<Q>`] that is used to read it back.

*/

use std::any::Any;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::component::{Component, ComponentKind, ComponentRegistry, ComponentType};
use crate::entity::Entity;
use crate::error::EcsError;
use crate::hashing::IndexSet;
use crate::log::trace;

mod container;
mod filter_query;
mod keyed;
mod map_query;
mod multimap_query;

pub use container::QueryContainer;
pub use filter_query::FilterQuery;
pub use keyed::KeyComponent;
pub use map_query::MapQuery;
pub use multimap_query::MultimapQuery;

/// The object-safe interface every query implements. The manager stores queries as
/// `Box<dyn Query>` and only ever talks to them through this trait.
pub trait Query: Any {
    /// The include/exclude filter this query was constructed with.
    fn filter(&self) -> &QueryFilter;

    /// Resolves the filter's component types (and any key type) against `components`. Fails if
    /// any of them is not registered, in which case the query must stay unbound.
    fn bind(&mut self, components: &ComponentRegistry) -> Result<(), EcsError>;

    fn is_bound(&self) -> bool;

    /// Every kind whose change for some entity can change this query's state for that entity.
    /// Only meaningful once bound.
    fn watched_kinds(&self) -> Vec<ComponentKind>;

    /// Evaluates the predicate for `entity` against committed component state.
    fn matches(&self, entity: Entity, components: &ComponentRegistry) -> bool;

    /// The current members.
    fn entities(&self) -> &IndexSet<Entity>;

    fn contains(&self, entity: Entity) -> bool {
        self.entities().contains(&entity)
    }

    fn len(&self) -> usize {
        self.entities().len()
    }

    fn is_empty(&self) -> bool {
        self.entities().is_empty()
    }

    /// Re-evaluates `entity`. If it matches it becomes (or stays) a member. If it does not match
    /// it is removed only when `remove_if_applicable` is set; callers that know the entity cannot
    /// currently be a member pass `false`. Returns whether the query's state changed.
    fn offer(
        &mut self,
        entity: Entity,
        components: &ComponentRegistry,
        remove_if_applicable: bool,
    ) -> bool;

    /// Unconditionally removes `entity`. Returns whether it was present.
    fn forget(&mut self, entity: Entity) -> bool;

    /// Compares the incrementally maintained state against a brute-force evaluation over `live`.
    fn validate(
        &self,
        live: &IndexSet<Entity>,
        components: &ComponentRegistry,
    ) -> Result<(), String> {
        validate_membership(self.entities(), live, |entity| {
            self.matches(entity, components)
        })
    }

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Checks `entities` against a full scan of `live` with the predicate `matches`.
pub(crate) fn validate_membership(
    entities: &IndexSet<Entity>,
    live: &IndexSet<Entity>,
    matches: impl Fn(Entity) -> bool,
) -> Result<(), String> {
    for &entity in live {
        let expected = matches(entity);
        let actual = entities.contains(&entity);
        if expected != actual {
            return Err(format!(
                "entity {entity}: predicate says member={expected}, membership says member={actual}"
            ));
        }
    }
    if let Some(dead) = entities.iter().find(|entity| !live.contains(*entity)) {
        return Err(format!("entity {dead} is a member but is not alive"));
    }
    Ok(())
}

/// The include/exclude component types of a query, before resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryFilter {
    include: Vec<ComponentType>,
    exclude: Vec<ComponentType>,
}

impl QueryFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires members to have a `C`.
    #[must_use]
    pub fn with<C: Component>(self) -> Self {
        self.with_type(ComponentType::of::<C>())
    }

    /// Requires members to lack a `C`.
    #[must_use]
    pub fn without<C: Component>(self) -> Self {
        self.without_type(ComponentType::of::<C>())
    }

    #[must_use]
    pub fn with_type(mut self, component_type: ComponentType) -> Self {
        if !self.include.contains(&component_type) {
            self.include.push(component_type);
        }
        self
    }

    #[must_use]
    pub fn without_type(mut self, component_type: ComponentType) -> Self {
        if !self.exclude.contains(&component_type) {
            self.exclude.push(component_type);
        }
        self
    }

    #[must_use]
    pub fn include(&self) -> &[ComponentType] {
        &self.include
    }

    #[must_use]
    pub fn exclude(&self) -> &[ComponentType] {
        &self.exclude
    }

    /// Whether the filter names `component_type` on either side.
    #[must_use]
    pub fn mentions(&self, component_type: ComponentType) -> bool {
        self.include.contains(&component_type) || self.exclude.contains(&component_type)
    }

    fn resolve(&self, components: &ComponentRegistry) -> Result<BoundFilter, EcsError> {
        let lookup = |component_type: &ComponentType| {
            components
                .kind_of_type(*component_type)
                .ok_or(EcsError::UnregisteredComponent(component_type.name()))
        };
        Ok(BoundFilter {
            include: self.include.iter().map(lookup).collect::<Result<_, _>>()?,
            exclude: self.exclude.iter().map(lookup).collect::<Result<_, _>>()?,
        })
    }
}

impl Display for QueryFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names = |types: &[ComponentType]| {
            types
                .iter()
                .map(ComponentType::name)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "include [{}] exclude [{}]",
            names(&self.include),
            names(&self.exclude)
        )
    }
}

/// A filter whose types have been resolved to kinds of one particular registry.
#[derive(Clone, Debug)]
struct BoundFilter {
    include: Vec<ComponentKind>,
    exclude: Vec<ComponentKind>,
}

impl BoundFilter {
    fn matches(&self, entity: Entity, components: &ComponentRegistry) -> bool {
        self.include.iter().all(|kind| components.has(*kind, entity))
            && !self.exclude.iter().any(|kind| components.has(*kind, entity))
    }
}

/// The membership half of a query: a filter, its resolved kinds once bound, and the member set.
/// The provided query types are built on it, and custom [`Query`] implementations can be too.
#[derive(Debug, Default)]
pub struct Membership {
    filter: QueryFilter,
    bound: Option<BoundFilter>,
    entities: IndexSet<Entity>,
}

impl Membership {
    #[must_use]
    pub fn new(filter: QueryFilter) -> Self {
        Self {
            filter,
            bound: None,
            entities: IndexSet::default(),
        }
    }

    #[must_use]
    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }

    pub fn bind(&mut self, components: &ComponentRegistry) -> Result<(), EcsError> {
        self.bound = Some(self.filter.resolve(components)?);
        Ok(())
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// The resolved include kinds followed by the resolved exclude kinds.
    #[must_use]
    pub fn kinds(&self) -> Vec<ComponentKind> {
        self.bound
            .as_ref()
            .map(|bound| {
                bound
                    .include
                    .iter()
                    .chain(bound.exclude.iter())
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// An unbound membership matches nothing.
    #[must_use]
    pub fn matches(&self, entity: Entity, components: &ComponentRegistry) -> bool {
        self.bound
            .as_ref()
            .is_some_and(|bound| bound.matches(entity, components))
    }

    #[must_use]
    pub fn entities(&self) -> &IndexSet<Entity> {
        &self.entities
    }

    /// Returns `true` if `entity` was not already a member.
    pub fn insert(&mut self, entity: Entity) -> bool {
        let inserted = self.entities.insert(entity);
        if inserted {
            trace!("entity {} joined query ({})", entity, self.filter);
        }
        inserted
    }

    /// Returns `true` if `entity` was a member.
    pub fn remove(&mut self, entity: Entity) -> bool {
        let removed = self.entities.swap_remove(&entity);
        if removed {
            trace!("entity {} left query ({})", entity, self.filter);
        }
        removed
    }
}

/// Identifies a query registered with a particular manager.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(usize);

impl QueryId {
    pub(crate) fn new(id: usize) -> Self {
        Self(id)
    }
}

/// A typed handle to a registered query of type `Q`, returned by
/// [`Manager::register_query`](crate::manager::Manager::register_query).
pub struct QueryHandle<Q: Query> {
    id: QueryId,
    _phantom: PhantomData<fn() -> Q>,
}
// Note: The generic on `QueryHandle<Q>` would otherwise require `Q` itself to be `Copy`/`Eq`/etc.
//       for derived impls, so we provide them by hand.

impl<Q: Query> QueryHandle<Q> {
    pub(crate) fn new(id: QueryId) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn id(&self) -> QueryId {
        self.id
    }
}

impl<Q: Query> Clone for QueryHandle<Q> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<Q: Query> Copy for QueryHandle<Q> {}

impl<Q: Query> PartialEq for QueryHandle<Q> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<Q: Query> Eq for QueryHandle<Q> {}

impl<Q: Query> Hash for QueryHandle<Q> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<Q: Query> Debug for QueryHandle<Q> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("QueryHandle").field(&self.id.0).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::TickState;

    #[derive(Debug)]
    struct Position;
    #[derive(Debug)]
    struct Frozen;
    #[derive(Debug)]
    struct Unregistered;

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register::<Position>();
        registry.register::<Frozen>();
        registry
    }

    fn give<C: Component>(registry: &mut ComponentRegistry, entity: Entity, component: C) {
        registry
            .mapper_mut::<C>()
            .unwrap()
            .1
            .set(entity, component, TickState::Idle);
    }

    #[test]
    fn filter_deduplicates_and_displays() {
        let filter = QueryFilter::new()
            .with::<Position>()
            .with::<Position>()
            .without::<Frozen>();
        assert_eq!(filter.include().len(), 1);
        assert!(filter.mentions(ComponentType::of::<Frozen>()));
        assert!(!filter.mentions(ComponentType::of::<Unregistered>()));
        assert_eq!(filter.to_string(), "include [Position] exclude [Frozen]");
    }

    #[test]
    fn binding_an_unregistered_type_fails() {
        let registry = registry();
        let mut membership = Membership::new(QueryFilter::new().with::<Unregistered>());
        let result = membership.bind(&registry);
        assert!(matches!(
            result,
            Err(EcsError::UnregisteredComponent("Unregistered"))
        ));
        assert!(!membership.is_bound());
    }

    #[test]
    fn unbound_membership_matches_nothing() {
        let mut registry = registry();
        let entity = Entity::new(1);
        give(&mut registry, entity, Position);
        let membership = Membership::new(QueryFilter::new().with::<Position>());
        assert!(!membership.matches(entity, &registry));
    }

    #[test]
    fn bound_membership_evaluates_include_and_exclude() {
        let mut registry = registry();
        let plain = Entity::new(1);
        let frozen = Entity::new(2);
        let bare = Entity::new(3);
        give(&mut registry, plain, Position);
        give(&mut registry, frozen, Position);
        give(&mut registry, frozen, Frozen);

        let mut membership =
            Membership::new(QueryFilter::new().with::<Position>().without::<Frozen>());
        membership.bind(&registry).unwrap();
        assert_eq!(membership.kinds().len(), 2);
        assert!(membership.matches(plain, &registry));
        assert!(!membership.matches(frozen, &registry));
        assert!(!membership.matches(bare, &registry));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let registry = registry();
        let mut membership = Membership::new(QueryFilter::new());
        membership.bind(&registry).unwrap();
        assert!(membership.matches(Entity::new(99), &registry));
        assert!(membership.kinds().is_empty());
    }

    #[test]
    fn validate_membership_reports_drift() {
        let live: IndexSet<Entity> = [Entity::new(1), Entity::new(2)].into_iter().collect();
        let mut members = IndexSet::default();
        members.insert(Entity::new(1));
        assert!(validate_membership(&members, &live, |entity| entity.id() == 1).is_ok());
        assert!(validate_membership(&members, &live, |_| true).is_err());

        members.insert(Entity::new(5));
        let error = validate_membership(&members, &live, |entity| entity.id() == 1).unwrap_err();
        assert!(error.contains("not alive"));
    }
}
