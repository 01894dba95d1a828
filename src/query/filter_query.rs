use std::any::Any;

use crate::component::{ComponentKind, ComponentRegistry, ComponentType};
use crate::entity::Entity;
use crate::error::EcsError;
use crate::hashing::IndexSet;
use crate::query::{Membership, Query, QueryFilter};

/// A query that only maintains membership.
///
/// ```rust
/// use tessera::prelude::*;
///
/// #[derive(Debug)]
/// struct Position(f32, f32);
/// #[derive(Debug)]
/// struct Frozen;
///
/// let mut manager = Manager::new();
/// manager.register_component::<Position>();
/// manager.register_component::<Frozen>();
///
/// let movable = manager
///     .register_query(FilterQuery::new(QueryFilter::new().with::<Position>().without::<Frozen>()))
///     .unwrap();
/// let entity = manager.create_with(|manager, entity| {
///     manager.add_component(entity, Position(0.0, 0.0));
/// });
/// assert!(manager.query(movable).unwrap().contains(entity));
/// ```
#[derive(Debug)]
pub struct FilterQuery {
    membership: Membership,
}

impl FilterQuery {
    #[must_use]
    pub fn new(filter: QueryFilter) -> Self {
        Self {
            membership: Membership::new(filter),
        }
    }

    /// A query over entities that have every one of `types`.
    #[must_use]
    pub fn inclusive<I: IntoIterator<Item = ComponentType>>(types: I) -> Self {
        let filter = types.into_iter().fold(QueryFilter::new(), QueryFilter::with_type);
        Self::new(filter)
    }

    /// A query over entities that have none of `types`.
    #[must_use]
    pub fn exclusive<I: IntoIterator<Item = ComponentType>>(types: I) -> Self {
        let filter = types
            .into_iter()
            .fold(QueryFilter::new(), QueryFilter::without_type);
        Self::new(filter)
    }
}

impl Query for FilterQuery {
    fn filter(&self) -> &QueryFilter {
        self.membership.filter()
    }

    fn bind(&mut self, components: &ComponentRegistry) -> Result<(), EcsError> {
        self.membership.bind(components)
    }

    fn is_bound(&self) -> bool {
        self.membership.is_bound()
    }

    fn watched_kinds(&self) -> Vec<ComponentKind> {
        self.membership.kinds()
    }

    fn matches(&self, entity: Entity, components: &ComponentRegistry) -> bool {
        self.membership.matches(entity, components)
    }

    fn entities(&self) -> &IndexSet<Entity> {
        self.membership.entities()
    }

    fn offer(
        &mut self,
        entity: Entity,
        components: &ComponentRegistry,
        remove_if_applicable: bool,
    ) -> bool {
        if self.membership.matches(entity, components) {
            self.membership.insert(entity)
        } else if remove_if_applicable {
            self.membership.remove(entity)
        } else {
            false
        }
    }

    fn forget(&mut self, entity: Entity) -> bool {
        self.membership.remove(entity)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
