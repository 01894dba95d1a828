/*!

The [`Manager`] owns the whole world: the live entity set, one [`ComponentMapper`] per registered
component kind, the registered queries, and the ordered list of [`System`]s.

# The tick protocol

[`Manager::process`] runs one tick:

1. If a tick is already in progress (a system called `process`), return immediately.
2. Enter [`TickState::Ticking`].
3. Run every system in registration order. Component mutations made while ticking are queued in
   their mapper, so every system sees the component state, and therefore the query membership,
   that existed at the start of the tick.
4. Return to [`TickState::Idle`].
5. Flush every mapper in registration order, re-offering each changed entity to the queries that
   watch the changed kind.

Outside of a tick, component mutations are applied and propagated to queries immediately.

Creating and destroying entities is never deferred. A mid-tick `create` is offered to the queries
at once (it has no committed components yet, so only queries without `include` kinds can pick it
up); a mid-tick `destroy` removes the entity from every mapper and query at once, and discards any
mutation queued for it.

*/

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use crate::component::{Component, ComponentKind, ComponentMapper, ComponentRegistry, ComponentType};
use crate::config::ManagerConfig;
use crate::entity::{Entity, EntityAllocator};
use crate::error::EcsError;
use crate::hashing::{FxBuildHasher, IndexSet};
use crate::log::{debug, error, trace, warn};
use crate::query::{Query, QueryContainer, QueryHandle};
use crate::system::System;

/// Whether the manager is inside [`Manager::process`]. Mappers take this explicitly to decide
/// whether a mutation is applied or queued.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TickState {
    #[default]
    Idle,
    Ticking,
}

pub struct Manager {
    config: ManagerConfig,
    allocator: EntityAllocator,
    entities: IndexSet<Entity>,
    components: ComponentRegistry,
    queries: QueryContainer,
    systems: Vec<Box<dyn System>>,
    // The number of systems moved out of `systems` while a tick runs them.
    running_systems: usize,
    tick_state: TickState,
    tick_count: u64,
    // The result of the most recent end-of-tick validation that found drift.
    query_drift: Option<EcsError>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Builds a manager from `config`. Logging settings in `config` are not applied; see
    /// [`ManagerConfig::apply_logging`].
    #[must_use]
    pub fn with_config(config: ManagerConfig) -> Self {
        let entities =
            IndexSet::with_capacity_and_hasher(config.entity_capacity, FxBuildHasher);
        Self {
            config,
            allocator: EntityAllocator::default(),
            entities,
            components: ComponentRegistry::new(),
            queries: QueryContainer::new(),
            systems: Vec::new(),
            running_systems: 0,
            tick_state: TickState::Idle,
            tick_count: 0,
            query_drift: None,
        }
    }

    /// Loads a JSON configuration file, applies its logging settings and builds a manager from it.
    pub fn from_config_file(path: &Path) -> Result<Self, EcsError> {
        let config = ManagerConfig::from_json_file(path)?;
        config.apply_logging()?;
        debug!("loaded manager configuration from {}", path.display());
        Ok(Self::with_config(config))
    }

    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // region Components

    /// Allocates the mapper for `C`. Registering a kind again is harmless: the existing kind is
    /// returned and its data is kept.
    pub fn register_component<C: Component>(&mut self) -> ComponentKind {
        let (kind, newly_registered) = self.components.register::<C>();
        let name = ComponentType::of::<C>().name();
        if newly_registered {
            debug!("registered component {} as kind {}", name, kind.index());
        } else {
            warn!("component {} is already registered", name);
        }
        kind
    }

    #[must_use]
    pub fn component_kind<C: Component>(&self) -> Option<ComponentKind> {
        self.components.kind_of::<C>()
    }

    /// Read access to the mapper for `C`. Mutations go through the manager so that queries are
    /// kept up to date.
    #[must_use]
    pub fn mapper<C: Component>(&self) -> Option<&ComponentMapper<C>> {
        self.components.mapper::<C>()
    }

    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    #[must_use]
    pub fn get_component<C: Component>(&self, entity: Entity) -> Option<&C> {
        self.components.mapper::<C>()?.get(entity)
    }

    #[must_use]
    pub fn get_component_or<C: Component + Clone>(&self, entity: Entity, default: C) -> C {
        self.get_component::<C>(entity).cloned().unwrap_or(default)
    }

    #[must_use]
    pub fn has_component<C: Component>(&self, entity: Entity) -> bool {
        self.components
            .mapper::<C>()
            .is_some_and(|mapper| mapper.contains(entity))
    }

    /// Sets `entity`'s `C`, replacing any previous value. While ticking the write is queued until
    /// the end of the tick. Returns `false`, doing nothing, if `entity` is not alive or `C` is not
    /// registered.
    pub fn add_component<C: Component>(&mut self, entity: Entity, component: C) -> bool {
        if !self.is_alive(entity) {
            warn!(
                "ignoring {} for entity {}, which is not alive",
                ComponentType::of::<C>().name(),
                entity
            );
            return false;
        }
        let tick = self.tick_state;
        let Some((kind, mapper)) = self.components.mapper_mut::<C>() else {
            warn!(
                "ignoring {} for entity {}: {}",
                ComponentType::of::<C>().name(),
                entity,
                EcsError::UnregisteredComponent(ComponentType::of::<C>().name())
            );
            return false;
        };
        mapper.set(entity, component, tick);
        if tick == TickState::Idle {
            self.queries
                .offer_changed(entity, &[kind], &self.components);
        }
        true
    }

    /// Removes `entity`'s `C`. While ticking the removal is queued until the end of the tick.
    /// Returns whether a component was removed or a removal was queued.
    pub fn remove_component<C: Component>(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            warn!(
                "ignoring removal of {} from entity {}, which is not alive",
                ComponentType::of::<C>().name(),
                entity
            );
            return false;
        }
        let tick = self.tick_state;
        let Some((kind, mapper)) = self.components.mapper_mut::<C>() else {
            warn!(
                "ignoring removal of {} from entity {}: {}",
                ComponentType::of::<C>().name(),
                entity,
                EcsError::UnregisteredComponent(ComponentType::of::<C>().name())
            );
            return false;
        };
        let changed = mapper.remove(entity, tick);
        if changed && tick == TickState::Idle {
            self.queries
                .offer_changed(entity, &[kind], &self.components);
        }
        changed
    }

    /// A debug view of every committed component of `entity`.
    #[must_use]
    pub fn components_of(&self, entity: Entity) -> Vec<(ComponentType, &dyn Debug)> {
        self.components.components_of(entity)
    }

    // endregion Components

    // region Entities

    pub fn create(&mut self) -> Entity {
        self.create_with(|_, _| {})
    }

    /// Creates an entity and runs `init` on it before offering it to the queries, so that a
    /// query sees the entity's initial components (when idle) in a single evaluation.
    pub fn create_with<F>(&mut self, init: F) -> Entity
    where
        F: FnOnce(&mut Manager, Entity),
    {
        let entity = self.allocator.next();
        self.entities.insert(entity);
        trace!("created entity {}", entity);
        init(self, entity);
        self.queries.offer(entity, &self.components);
        entity
    }

    /// Looks up a live entity by its id.
    #[must_use]
    pub fn entity(&self, id: u64) -> Option<Entity> {
        let entity = Entity::new(id);
        self.is_alive(entity).then_some(entity)
    }

    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    /// The live entities in creation order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter().copied()
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// The number of entities ever created, including destroyed ones.
    #[must_use]
    pub fn created_count(&self) -> u64 {
        self.allocator.allocated()
    }

    /// Removes `entity` from every mapper and every query. Returns `false` if it was not alive.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.entities.shift_remove(&entity) {
            return false;
        }
        self.components.destroy(entity);
        self.queries.forget(entity);
        trace!("destroyed entity {}", entity);
        true
    }

    /// Destroys every live entity in `entities`. Returns how many were destroyed.
    pub fn destroy_all<I: IntoIterator<Item = Entity>>(&mut self, entities: I) -> usize {
        let doomed: IndexSet<Entity> = entities
            .into_iter()
            .filter(|entity| self.entities.contains(entity))
            .collect();
        if doomed.is_empty() {
            return 0;
        }
        self.entities.retain(|entity| !doomed.contains(entity));

        let doomed: Vec<Entity> = doomed.into_iter().collect();
        self.components.destroy_all(&doomed);
        for entity in &doomed {
            self.queries.forget(*entity);
        }
        debug!("destroyed {} entities", doomed.len());
        doomed.len()
    }

    // endregion Entities

    // region Queries

    /// Binds `query` to this manager's component kinds, registers it, and seeds its membership
    /// with a scan of the live entities. Fails if the query names an unregistered component.
    pub fn register_query<Q: Query>(&mut self, mut query: Q) -> Result<QueryHandle<Q>, EcsError> {
        query
            .bind(&self.components)
            .inspect_err(|error| warn!("cannot register query ({}): {}", query.filter(), error))?;
        let id = self.queries.add(Box::new(query));
        self.queries.seed(id, &self.entities, &self.components);
        Ok(QueryHandle::new(id))
    }

    /// Unregisters the query and hands it back.
    pub fn unregister_query<Q: Query>(&mut self, handle: QueryHandle<Q>) -> Option<Q> {
        // Check the type before removing anything.
        self.query(handle)?;
        let query = self.queries.remove(handle.id())?;
        query.into_any().downcast::<Q>().ok().map(|query| *query)
    }

    #[must_use]
    pub fn query<Q: Query>(&self, handle: QueryHandle<Q>) -> Option<&Q> {
        self.queries
            .get(handle.id())?
            .as_any()
            .downcast_ref::<Q>()
    }

    #[must_use]
    pub fn has_query<Q: Query>(&self, handle: QueryHandle<Q>) -> bool {
        self.query(handle).is_some()
    }

    #[must_use]
    pub fn queries(&self) -> &QueryContainer {
        &self.queries
    }

    /// Brute-force checks every query against a scan of the live entities.
    pub fn validate_queries(&self) -> Result<(), EcsError> {
        self.queries.validate(&self.entities, &self.components)
    }

    // endregion Queries

    // region Systems

    /// Appends a system. Systems registered during a tick first run on the next tick.
    pub fn register_system<S: System + 'static>(&mut self, system: S) {
        debug!("registered system {}", system.name());
        self.systems.push(Box::new(system));
    }

    pub fn register_systems<I>(&mut self, systems: I)
    where
        I: IntoIterator<Item = Box<dyn System>>,
    {
        for system in systems {
            debug!("registered system {}", system.name());
            self.systems.push(system);
        }
    }

    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len() + self.running_systems
    }

    // endregion Systems

    // region Ticking

    /// Runs one tick. See the [module documentation](self) for the protocol.
    pub fn process(&mut self, delta: Duration) {
        if self.tick_state == TickState::Ticking {
            trace!("ignoring re-entrant call to process");
            return;
        }

        self.tick_state = TickState::Ticking;
        let mut systems = std::mem::take(&mut self.systems);
        self.running_systems = systems.len();
        for system in &mut systems {
            trace!("running system {}", system.name());
            system.process(self, delta);
        }
        self.running_systems = 0;
        let registered_during_tick = std::mem::replace(&mut self.systems, systems);
        self.systems.extend(registered_during_tick);
        self.tick_state = TickState::Idle;

        let committed = self.flush();
        self.tick_count += 1;
        debug!(
            "tick {} committed {} component changes",
            self.tick_count, committed
        );

        if self.config.validate_queries {
            self.query_drift = self.validate_queries().err();
            if let Some(drift) = &self.query_drift {
                error!("tick {} left queries out of date: {}", self.tick_count, drift);
            }
        }
    }

    /// The drift found by the query validation at the end of the latest tick, if any. Always
    /// `None` unless [`ManagerConfig::validate_queries`] is set.
    #[must_use]
    pub fn query_drift(&self) -> Option<&EcsError> {
        self.query_drift.as_ref()
    }

    /// Commits every mapper's queued mutations in kind order and re-offers each changed entity to
    /// the queries watching the changed kind. Returns the number of committed mutations.
    fn flush(&mut self) -> usize {
        let pending = self.components.pending_len();
        if pending == 0 {
            return 0;
        }
        for index in 0..self.components.len() {
            let kind = ComponentKind::new(index);
            let notify = self.queries.queries_watching(kind).next().is_some();
            for entity in self.components.flush_kind(kind, notify) {
                self.queries
                    .offer_changed(entity, &[kind], &self.components);
            }
        }
        pending
    }

    #[must_use]
    pub fn tick_state(&self) -> TickState {
        self.tick_state
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.tick_state == TickState::Ticking
    }

    /// The number of completed ticks.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // endregion Ticking
}
