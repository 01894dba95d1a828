/*!

Components are plain data values attached to entities, at most one per kind per entity. The
"kind" of a component is its Rust type: `Position` and `Velocity` are two kinds.

Any `'static + Debug` type is a [`Component`]; there is nothing to derive. A kind has to be
registered with [`Manager::register_component`](crate::manager::Manager::register_component)
before it can be stored, which allocates its [`ComponentMapper`] and assigns it a dense
[`ComponentKind`] index. Everything that evaluates predicates per entity (queries, the query
container) works in terms of `ComponentKind`s so that a mapper lookup is an array index rather
than a type-keyed hash lookup; the `TypeId` map is only consulted on the typed entry points.

*/

use std::any::{Any, TypeId};
use std::fmt::Debug;

mod mapper;
mod registry;

pub use mapper::ComponentMapper;
pub use registry::ComponentRegistry;

/// Marker trait for component data. Implemented for every `'static + Debug` type.
pub trait Component: Any + Debug {}

impl<T: Any + Debug> Component for T {}

/// The dense index of a registered component kind. Only the manager that registered the kind
/// hands these out, and they are only meaningful for that manager.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKind(usize);

impl ComponentKind {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// The position of this kind's mapper in the registry.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A static description of a component type, used to name kinds before they are resolved against
/// a registry (e.g. in a query filter).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentType {
    type_id: TypeId,
    name: &'static str,
}

impl ComponentType {
    #[must_use]
    pub fn of<C: Component>() -> Self {
        let full = std::any::type_name::<C>();
        // Strip the module path of a named type, keeping generic arguments intact. Tuples, arrays,
        // slices and references keep their full name.
        let start = if full.starts_with(['(', '[', '&']) {
            0
        } else {
            let base = full.split('<').next().unwrap_or(full);
            base.rfind("::").map_or(0, |position| position + 2)
        };
        Self {
            type_id: TypeId::of::<C>(),
            name: &full[start..],
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The unqualified type name, e.g. `"Position"`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Position;

    #[derive(Debug)]
    struct Wrapper<T>(T);

    #[test]
    fn component_type_names_are_unqualified() {
        assert_eq!(ComponentType::of::<Position>().name(), "Position");
        assert_eq!(ComponentType::of::<u32>().name(), "u32");
        assert!(ComponentType::of::<Wrapper<Position>>()
            .name()
            .starts_with("Wrapper<"));
    }

    #[test]
    fn compound_type_names_are_kept_whole() {
        let pair = ComponentType::of::<(Position, u32)>().name();
        assert_eq!(pair, std::any::type_name::<(Position, u32)>());
        assert!(pair.starts_with('(') && pair.ends_with("u32)"));

        let array = ComponentType::of::<[Position; 2]>().name();
        assert_eq!(array, std::any::type_name::<[Position; 2]>());
        assert_eq!(ComponentType::of::<&'static str>().name(), "&str");
    }

    #[test]
    fn component_types_compare_by_type() {
        assert_eq!(ComponentType::of::<Position>(), ComponentType::of::<Position>());
        assert_ne!(ComponentType::of::<Position>(), ComponentType::of::<u32>());
    }
}
