//! An entity/component runtime with incrementally maintained queries
//!
//! Tessera keeps a world of lightweight [`Entity`] handles, each carrying any number of typed
//! components (at most one per component type). Per-tick behavior lives in [`System`]s, which the
//! [`Manager`] runs in registration order every time [`Manager::process`] is called.
//!
//! Systems usually do not look at the whole population. They look at a query: a set of entities
//! matching an include/exclude filter over component types, which the manager keeps up to date
//! incrementally as components are added and removed. Keyed queries ([`MapQuery`],
//! [`MultimapQuery`]) additionally index their members by the value of one component.
//!
//! Component mutations issued while a tick is running are queued and committed once every system
//! has run, so all systems in a tick observe the same state and a system can mutate the entities
//! it is iterating over without disturbing its own iteration.
//!
//! ```rust
//! use std::time::Duration;
//! use tessera::prelude::*;
//!
//! #[derive(Debug)]
//! struct Health(u32);
//! #[derive(Debug)]
//! struct Dead;
//!
//! let mut manager = Manager::new();
//! manager.register_component::<Health>();
//! manager.register_component::<Dead>();
//! let living = manager
//!     .register_query(FilterQuery::new(QueryFilter::new().with::<Health>().without::<Dead>()))
//!     .unwrap();
//!
//! manager.register_system(QuerySystem::new(living, |manager, entities, _| {
//!     for &entity in entities {
//!         if manager.get_component::<Health>(entity).is_some_and(|health| health.0 == 0) {
//!             manager.add_component(entity, Dead);
//!         }
//!     }
//! }));
//!
//! let entity = manager.create_with(|manager, entity| {
//!     manager.add_component(entity, Health(0));
//! });
//! manager.process(Duration::from_millis(16));
//! assert!(!manager.query(living).unwrap().contains(entity));
//! ```
pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod hashing;
pub mod log;
pub mod manager;
pub mod prelude;
pub mod query;
pub mod system;

pub use component::{Component, ComponentKind, ComponentMapper, ComponentRegistry, ComponentType};
pub use config::ManagerConfig;
pub use entity::Entity;
pub use error::EcsError;
pub use manager::{Manager, TickState};
pub use query::{
    FilterQuery, KeyComponent, MapQuery, Membership, MultimapQuery, Query, QueryContainer,
    QueryFilter, QueryHandle, QueryId,
};
pub use system::{QuerySystem, System};

// Logging macros
pub use crate::log::{debug, error, info, trace, warn};

// Hashing aliases
pub use hashing::{HashMap, HashMapExt, HashSet, HashSetExt, IndexMap, IndexSet};
