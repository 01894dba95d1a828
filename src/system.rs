//! Systems are the units of per-tick behavior. The [`Manager`] runs them in registration order on
//! every [`Manager::process`] call.

use std::time::Duration;

use crate::entity::Entity;
use crate::log::warn;
use crate::manager::Manager;
use crate::query::{Query, QueryHandle};

pub trait System {
    /// Runs one tick. Component mutations made through `manager` are queued until every system
    /// has run.
    fn process(&mut self, manager: &mut Manager, delta: Duration);

    /// A name for log messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> System for F
where
    F: FnMut(&mut Manager, Duration),
{
    fn process(&mut self, manager: &mut Manager, delta: Duration) {
        self(manager, delta);
    }
}

/// A system bound to one query. Each tick it receives the query's members as they stood at the
/// start of the tick.
///
/// ```rust
/// use std::time::Duration;
/// use tessera::prelude::*;
///
/// #[derive(Debug, Clone, Copy)]
/// struct Position(f32);
/// #[derive(Debug, Clone, Copy)]
/// struct Velocity(f32);
///
/// let mut manager = Manager::new();
/// manager.register_component::<Position>();
/// manager.register_component::<Velocity>();
/// let moving = manager
///     .register_query(FilterQuery::new(QueryFilter::new().with::<Position>().with::<Velocity>()))
///     .unwrap();
///
/// manager.register_system(QuerySystem::new(moving, |manager, entities, delta| {
///     for &entity in entities {
///         let (Some(&Position(x)), Some(&Velocity(v))) = (
///             manager.get_component::<Position>(entity),
///             manager.get_component::<Velocity>(entity),
///         ) else {
///             continue;
///         };
///         manager.add_component(entity, Position(x + v * delta.as_secs_f32()));
///     }
/// }));
///
/// let entity = manager.create_with(|manager, entity| {
///     manager.add_component(entity, Position(0.0));
///     manager.add_component(entity, Velocity(2.0));
/// });
/// manager.process(Duration::from_secs(1));
/// assert_eq!(manager.get_component::<Position>(entity).unwrap().0, 2.0);
/// ```
pub struct QuerySystem<Q, F>
where
    Q: Query,
    F: FnMut(&mut Manager, &[Entity], Duration),
{
    query: QueryHandle<Q>,
    run: F,
    snapshot: Vec<Entity>,
}

impl<Q, F> QuerySystem<Q, F>
where
    Q: Query,
    F: FnMut(&mut Manager, &[Entity], Duration),
{
    pub fn new(query: QueryHandle<Q>, run: F) -> Self {
        Self {
            query,
            run,
            snapshot: Vec::new(),
        }
    }

    #[must_use]
    pub fn query(&self) -> QueryHandle<Q> {
        self.query
    }
}

impl<Q, F> System for QuerySystem<Q, F>
where
    Q: Query,
    F: FnMut(&mut Manager, &[Entity], Duration),
{
    fn process(&mut self, manager: &mut Manager, delta: Duration) {
        let Some(query) = manager.query(self.query) else {
            warn!("skipping system bound to unregistered query {:?}", self.query);
            return;
        };
        // Reuse the buffer between ticks.
        self.snapshot.clear();
        self.snapshot.extend(query.entities().iter().copied());
        (self.run)(manager, &self.snapshot, delta);
    }
}
