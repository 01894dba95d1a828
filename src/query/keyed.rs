//! Shared machinery for the keyed query variants.

use std::hash::Hash;

use crate::component::{Component, ComponentKind, ComponentRegistry, ComponentType};
use crate::entity::Entity;
use crate::error::EcsError;
use crate::hashing::{HashMap, IndexSet};
use crate::query::{validate_membership, Membership, QueryFilter};

/// The bound a key component has to satisfy to be indexed.
pub trait KeyComponent: Component + Clone + Eq + Hash {}

impl<T: Component + Clone + Eq + Hash> KeyComponent for T {}

/// A secondary index from key values to the members currently holding them.
///
/// The key of each indexed entity is captured when it is inserted, so removing an entity never
/// needs to read the key mapper, whose value may already have changed. The holders of one key are
/// kept in the order they last committed it.
#[derive(Debug)]
pub(crate) struct KeyIndex<K: KeyComponent> {
    keys: HashMap<Entity, K>,
    holders: HashMap<K, IndexSet<Entity>>,
}

impl<K: KeyComponent> Default for KeyIndex<K> {
    fn default() -> Self {
        Self {
            keys: HashMap::default(),
            holders: HashMap::default(),
        }
    }
}

impl<K: KeyComponent> KeyIndex<K> {
    /// Records that `entity` now holds `key` (or no key). A changed key drops the stale entry
    /// before inserting the new one; an unchanged key moves `entity` to the back of its holders.
    /// Returns whether anything changed.
    pub(crate) fn update(&mut self, entity: Entity, key: Option<K>) -> bool {
        match (self.keys.get(&entity), &key) {
            (Some(current), Some(new)) if current == new => {
                let Some(holders) = self.holders.get_mut(new) else {
                    return false;
                };
                if holders.last() == Some(&entity) {
                    return false;
                }
                holders.shift_remove(&entity);
                holders.insert(entity);
                return true;
            }
            (None, None) => return false,
            _ => {}
        }
        self.remove(entity);
        if let Some(key) = key {
            self.holders.entry(key.clone()).or_default().insert(entity);
            self.keys.insert(entity, key);
        }
        true
    }

    /// Returns whether `entity` had an entry.
    pub(crate) fn remove(&mut self, entity: Entity) -> bool {
        let Some(key) = self.keys.remove(&entity) else {
            return false;
        };
        if let Some(holders) = self.holders.get_mut(&key) {
            holders.shift_remove(&entity);
            if holders.is_empty() {
                self.holders.remove(&key);
            }
        }
        true
    }

    pub(crate) fn key_of(&self, entity: Entity) -> Option<&K> {
        self.keys.get(&entity)
    }

    pub(crate) fn holders(&self, key: &K) -> Option<&IndexSet<Entity>> {
        self.holders.get(key)
    }

    /// The member that committed `key` most recently.
    pub(crate) fn latest(&self, key: &K) -> Option<Entity> {
        self.holders.get(key)?.last().copied()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &IndexSet<Entity>)> {
        self.holders.iter()
    }

    /// The number of distinct keys.
    pub(crate) fn key_count(&self) -> usize {
        self.holders.len()
    }
}

/// Membership plus a key index, with the offer/forget logic both keyed variants share.
#[derive(Debug)]
pub(crate) struct KeyedMembership<K: KeyComponent> {
    pub(crate) membership: Membership,
    key_type: ComponentType,
    key_kind: Option<ComponentKind>,
    pub(crate) index: KeyIndex<K>,
}

impl<K: KeyComponent> KeyedMembership<K> {
    pub(crate) fn new(filter: QueryFilter) -> Self {
        Self {
            membership: Membership::new(filter),
            key_type: ComponentType::of::<K>(),
            key_kind: None,
            index: KeyIndex::default(),
        }
    }

    pub(crate) fn bind(&mut self, components: &ComponentRegistry) -> Result<(), EcsError> {
        let key_kind = components
            .kind_of_type(self.key_type)
            .ok_or(EcsError::UnregisteredComponent(self.key_type.name()))?;
        self.membership.bind(components)?;
        self.key_kind = Some(key_kind);
        Ok(())
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.membership.is_bound() && self.key_kind.is_some()
    }

    /// The filter kinds, plus the key kind when the filter does not already mention it: a key
    /// change must re-index the entity even if it cannot change membership.
    pub(crate) fn watched_kinds(&self) -> Vec<ComponentKind> {
        let mut kinds = self.membership.kinds();
        if let Some(key_kind) = self.key_kind {
            if !kinds.contains(&key_kind) {
                kinds.push(key_kind);
            }
        }
        kinds
    }

    fn current_key(&self, entity: Entity, components: &ComponentRegistry) -> Option<K> {
        let kind = self.key_kind?;
        components.get::<K>(kind, entity).cloned()
    }

    pub(crate) fn offer(
        &mut self,
        entity: Entity,
        components: &ComponentRegistry,
        remove_if_applicable: bool,
    ) -> bool {
        if self.membership.matches(entity, components) {
            let inserted = self.membership.insert(entity);
            let key = self.current_key(entity, components);
            let rekeyed = self.index.update(entity, key);
            inserted || rekeyed
        } else if remove_if_applicable {
            self.forget(entity)
        } else {
            false
        }
    }

    pub(crate) fn forget(&mut self, entity: Entity) -> bool {
        let removed = self.membership.remove(entity);
        let unkeyed = self.index.remove(entity);
        removed || unkeyed
    }

    /// Checks membership by brute force, then checks that every member is indexed under its
    /// current key and that the index holds nothing else.
    pub(crate) fn validate(
        &self,
        live: &IndexSet<Entity>,
        components: &ComponentRegistry,
    ) -> Result<(), String> {
        let members = self.membership.entities();
        validate_membership(members, live, |entity| {
            self.membership.matches(entity, components)
        })?;

        let mut indexed = 0;
        for &entity in members {
            let current = self.current_key(entity, components);
            if current.as_ref() != self.index.key_of(entity) {
                return Err(format!(
                    "entity {entity}: key index holds {:?}, component holds {:?}",
                    self.index.key_of(entity),
                    current
                ));
            }
            if let Some(key) = current {
                if !self.index.holders(&key).is_some_and(|set| set.contains(&entity)) {
                    return Err(format!("entity {entity} is missing from the holders of {key:?}"));
                }
                indexed += 1;
            }
        }

        let held: usize = self.index.iter().map(|(_, set)| set.len()).sum();
        if held != indexed || self.index.keys.len() != indexed {
            return Err(format!(
                "key index holds {held} entries for {indexed} keyed members"
            ));
        }
        Ok(())
    }
}
