/*!

The `QueryContainer` owns every registered query and a reverse index from each component kind to
the queries that watch it. A committed change to `(entity, kind)` is routed to
`queries_by_kind[kind]` only, so the cost of a change is proportional to the number of queries
that could care about it rather than the number of queries overall.

*/

use crate::component::{ComponentKind, ComponentRegistry};
use crate::entity::Entity;
use crate::error::EcsError;
use crate::hashing::{IndexMap, IndexSet};
use crate::log::{debug, error};
use crate::query::{Query, QueryId};

#[derive(Default)]
pub struct QueryContainer {
    queries: IndexMap<QueryId, Box<dyn Query>>,
    // Indexed by `ComponentKind::index()`. Grown on demand.
    queries_by_kind: Vec<IndexSet<QueryId>>,
    next_id: usize,
}

impl QueryContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an already bound query and indexes it under each of its watched kinds.
    pub fn add(&mut self, query: Box<dyn Query>) -> QueryId {
        let id = QueryId::new(self.next_id);
        self.next_id += 1;

        for kind in query.watched_kinds() {
            let index = kind.index();
            if self.queries_by_kind.len() <= index {
                self.queries_by_kind.resize_with(index + 1, IndexSet::default);
            }
            self.queries_by_kind[index].insert(id);
        }
        debug!("registered query {:?} ({})", id, query.filter());
        self.queries.insert(id, query);
        id
    }

    pub fn remove(&mut self, id: QueryId) -> Option<Box<dyn Query>> {
        let query = self.queries.shift_remove(&id)?;
        for kind in query.watched_kinds() {
            if let Some(ids) = self.queries_by_kind.get_mut(kind.index()) {
                ids.shift_remove(&id);
            }
        }
        debug!("unregistered query {:?} ({})", id, query.filter());
        Some(query)
    }

    #[must_use]
    pub fn contains(&self, id: QueryId) -> bool {
        self.queries.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: QueryId) -> Option<&dyn Query> {
        self.queries.get(&id).map(|query| &**query)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// The queries indexed under `kind`, in registration order.
    pub fn queries_watching(&self, kind: ComponentKind) -> impl Iterator<Item = QueryId> + '_ {
        self.queries_by_kind
            .get(kind.index())
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    /// Offers `entity` to every query. Used when an entity is created.
    pub fn offer(&mut self, entity: Entity, components: &ComponentRegistry) {
        for query in self.queries.values_mut() {
            query.offer(entity, components, true);
        }
    }

    /// Offers `entity` to the queries watching any of `kinds`. A query watching several of the
    /// changed kinds is offered the entity once.
    pub fn offer_changed(
        &mut self,
        entity: Entity,
        kinds: &[ComponentKind],
        components: &ComponentRegistry,
    ) {
        if let [kind] = kinds {
            let Some(ids) = self.queries_by_kind.get(kind.index()) else {
                return;
            };
            for id in ids {
                if let Some(query) = self.queries.get_mut(id) {
                    query.offer(entity, components, true);
                }
            }
            return;
        }

        let mut offered = IndexSet::<QueryId>::default();
        for kind in kinds {
            let Some(ids) = self.queries_by_kind.get(kind.index()) else {
                continue;
            };
            for id in ids {
                if !offered.insert(*id) {
                    continue;
                }
                if let Some(query) = self.queries.get_mut(id) {
                    query.offer(entity, components, true);
                }
            }
        }
    }

    /// Offers every entity in `entities` to the query `id` only. Used to seed a newly added
    /// query, which cannot hold any of them yet.
    pub fn seed<'a, I>(&mut self, id: QueryId, entities: I, components: &ComponentRegistry)
    where
        I: IntoIterator<Item = &'a Entity>,
    {
        if let Some(query) = self.queries.get_mut(&id) {
            for entity in entities {
                query.offer(*entity, components, false);
            }
        }
    }

    /// Removes `entity` from every query.
    pub fn forget(&mut self, entity: Entity) {
        for query in self.queries.values_mut() {
            query.forget(entity);
        }
    }

    /// Validates every query against a full scan of `live`. Logs each drifting query and returns
    /// the first drift as an error.
    pub fn validate(
        &self,
        live: &IndexSet<Entity>,
        components: &ComponentRegistry,
    ) -> Result<(), EcsError> {
        let mut first = None;
        for (id, query) in &self.queries {
            if let Err(message) = query.validate(live, components) {
                error!("query {:?} ({}) drifted: {}", id, query.filter(), message);
                first.get_or_insert_with(|| format!("query {id:?}: {message}"));
            }
        }
        match first {
            Some(message) => Err(EcsError::QueryDrift(message)),
            None => Ok(()),
        }
    }
}
