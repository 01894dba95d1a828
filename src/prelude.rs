pub use crate::component::{Component, ComponentKind, ComponentType};
pub use crate::config::ManagerConfig;
pub use crate::entity::Entity;
pub use crate::error::EcsError;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::manager::{Manager, TickState};
pub use crate::query::{
    FilterQuery, MapQuery, MultimapQuery, Query, QueryFilter, QueryHandle,
};
pub use crate::system::{QuerySystem, System};
