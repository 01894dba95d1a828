//! Drives a manager through random sequences of operations, both between and during ticks, and
//! checks every query against a brute-force scan after each committed change.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tessera::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Alpha(u32);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Beta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Key(u8);

struct Handles {
    alpha: QueryHandle<FilterQuery>,
    alpha_not_beta: QueryHandle<FilterQuery>,
    not_beta: QueryHandle<FilterQuery>,
    unique: QueryHandle<MapQuery<Key>>,
    grouped: QueryHandle<MultimapQuery<Key>>,
}

fn setup() -> (Manager, Handles) {
    let mut manager = Manager::new();
    manager.register_component::<Alpha>();
    manager.register_component::<Beta>();
    manager.register_component::<Key>();
    let handles = Handles {
        alpha: manager
            .register_query(FilterQuery::new(QueryFilter::new().with::<Alpha>()))
            .unwrap(),
        alpha_not_beta: manager
            .register_query(FilterQuery::new(
                QueryFilter::new().with::<Alpha>().without::<Beta>(),
            ))
            .unwrap(),
        not_beta: manager
            .register_query(FilterQuery::exclusive([ComponentType::of::<Beta>()]))
            .unwrap(),
        unique: manager.register_query(MapQuery::<Key>::new()).unwrap(),
        grouped: manager
            .register_query(MultimapQuery::<Key>::with_filter(
                QueryFilter::new().with::<Alpha>(),
            ))
            .unwrap(),
    };
    (manager, handles)
}

/// The expected commit history of `Key`: the holders of each key in the order they last committed
/// it, plus the writes queued during the current tick.
#[derive(Default)]
struct KeyLedger {
    holders: BTreeMap<Key, Vec<Entity>>,
    queued_sets: Vec<(Entity, Key)>,
    queued_removes: Vec<Entity>,
}

impl KeyLedger {
    fn commit(&mut self, entity: Entity, key: Key) {
        self.uncommit(entity);
        self.holders.entry(key).or_default().push(entity);
    }

    fn uncommit(&mut self, entity: Entity) {
        for holders in self.holders.values_mut() {
            holders.retain(|holder| *holder != entity);
        }
        self.holders.retain(|_, holders| !holders.is_empty());
    }

    fn set(&mut self, manager: &Manager, entity: Entity, key: Key) {
        if !manager.is_processing() {
            self.commit(entity, key);
        } else if let Some(queued) = self
            .queued_sets
            .iter_mut()
            .find(|queued| queued.0 == entity)
        {
            // A repeated write replaces the value but keeps its place in the queue.
            queued.1 = key;
        } else {
            self.queued_sets.push((entity, key));
        }
    }

    fn remove(&mut self, manager: &Manager, entity: Entity) {
        if !manager.is_processing() {
            self.uncommit(entity);
        } else if !self.queued_removes.contains(&entity) {
            self.queued_removes.push(entity);
        }
    }

    fn destroy(&mut self, entity: Entity) {
        self.uncommit(entity);
        self.queued_sets.retain(|queued| queued.0 != entity);
        self.queued_removes.retain(|queued| *queued != entity);
    }

    /// Removals commit before writes.
    fn flush(&mut self) {
        for entity in std::mem::take(&mut self.queued_removes) {
            self.uncommit(entity);
        }
        for (entity, key) in std::mem::take(&mut self.queued_sets) {
            self.commit(entity, key);
        }
    }

    fn latest(&self) -> BTreeMap<Key, Entity> {
        self.holders
            .iter()
            .filter_map(|(key, holders)| holders.last().map(|entity| (*key, *entity)))
            .collect()
    }
}

fn random_entity(manager: &Manager, rng: &mut SmallRng) -> Option<Entity> {
    let count = manager.entity_count();
    if count == 0 {
        return None;
    }
    manager.entities().nth(rng.random_range(0..count))
}

/// One random component mutation on a random live entity.
fn mutate(manager: &mut Manager, ledger: &mut KeyLedger, rng: &mut SmallRng) {
    let Some(entity) = random_entity(manager, rng) else {
        return;
    };
    match rng.random_range(0..6) {
        0 => {
            manager.add_component(entity, Alpha(rng.random_range(0..100)));
        }
        1 => {
            manager.remove_component::<Alpha>(entity);
        }
        2 => {
            manager.add_component(entity, Beta);
        }
        3 => {
            manager.remove_component::<Beta>(entity);
        }
        4 => {
            let key = Key(rng.random_range(0..4));
            ledger.set(manager, entity, key);
            manager.add_component(entity, key);
        }
        _ => {
            ledger.remove(manager, entity);
            manager.remove_component::<Key>(entity);
        }
    }
}

fn scan<F: Fn(&Manager, Entity) -> bool>(manager: &Manager, predicate: F) -> BTreeSet<Entity> {
    manager
        .entities()
        .filter(|entity| predicate(manager, *entity))
        .collect()
}

fn members<Q: Query>(manager: &Manager, handle: QueryHandle<Q>) -> BTreeSet<Entity> {
    manager
        .query(handle)
        .unwrap()
        .entities()
        .iter()
        .copied()
        .collect()
}

fn check(manager: &Manager, handles: &Handles, ledger: &KeyLedger) {
    assert_eq!(
        members(manager, handles.alpha),
        scan(manager, |manager, entity| manager.has_component::<Alpha>(entity))
    );
    assert_eq!(
        members(manager, handles.alpha_not_beta),
        scan(manager, |manager, entity| {
            manager.has_component::<Alpha>(entity) && !manager.has_component::<Beta>(entity)
        })
    );
    assert_eq!(
        members(manager, handles.not_beta),
        scan(manager, |manager, entity| !manager.has_component::<Beta>(entity))
    );

    // Expected key groups for the multimap query.
    let mut expected: BTreeMap<Key, BTreeSet<Entity>> = BTreeMap::new();
    for entity in members(manager, handles.grouped) {
        if let Some(key) = manager.get_component::<Key>(entity) {
            expected.entry(*key).or_default().insert(entity);
        }
    }
    let grouped = manager.query(handles.grouped).unwrap();
    let actual: BTreeMap<Key, BTreeSet<Entity>> = grouped
        .iter()
        .map(|(key, holders)| (*key, holders.iter().copied().collect()))
        .collect();
    assert_eq!(actual, expected);

    // The unique query maps each key to one of its holders, and to nothing else.
    let unique = manager.query(handles.unique).unwrap();
    assert_eq!(
        members(manager, handles.unique),
        scan(manager, |manager, entity| manager.has_component::<Key>(entity))
    );
    for (key, entity) in unique.iter() {
        assert_eq!(manager.get_component::<Key>(entity), Some(key));
    }
    let distinct_keys: BTreeSet<Key> = unique
        .entities()
        .iter()
        .filter_map(|entity| manager.get_component::<Key>(*entity).copied())
        .collect();
    assert_eq!(unique.key_count(), distinct_keys.len());

    // Each key resolves to the member that committed it last.
    let latest: BTreeMap<Key, Entity> =
        unique.iter().map(|(key, entity)| (*key, entity)).collect();
    assert_eq!(latest, ledger.latest());
    for (key, entity) in ledger.latest() {
        assert_eq!(unique.get(&key), Some(entity));
    }

    manager.validate_queries().unwrap();
}

#[test]
fn idle_operations_match_brute_force() {
    for seed in 0..8 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let (mut manager, handles) = setup();
        let mut ledger = KeyLedger::default();

        for _ in 0..400 {
            match rng.random_range(0..10) {
                0 | 1 => {
                    manager.create();
                }
                2 => {
                    if let Some(entity) = random_entity(&manager, &mut rng) {
                        ledger.destroy(entity);
                        manager.destroy(entity);
                    }
                }
                _ => mutate(&mut manager, &mut ledger, &mut rng),
            }
            check(&manager, &handles, &ledger);
        }
    }
}

#[test]
fn ticked_operations_match_brute_force() {
    for seed in 0..8 {
        let rng = Rc::new(RefCell::new(SmallRng::seed_from_u64(seed)));
        let ledger = Rc::new(RefCell::new(KeyLedger::default()));
        let (mut manager, handles) = setup();
        for _ in 0..20 {
            manager.create();
        }

        let alpha = handles.alpha;
        let system_rng = Rc::clone(&rng);
        let system_ledger = Rc::clone(&ledger);
        manager.register_system(move |manager: &mut Manager, _: Duration| {
            let mut rng = system_rng.borrow_mut();
            let mut ledger = system_ledger.borrow_mut();
            let before: BTreeSet<Entity> = members(manager, alpha);
            for _ in 0..rng.random_range(0..30) {
                mutate(manager, &mut ledger, &mut rng);
            }
            // Component mutations must not show up before the tick ends.
            assert_eq!(members(manager, alpha), before);

            if rng.random_bool(0.3) {
                manager.create();
            }
            if rng.random_bool(0.2) {
                if let Some(entity) = random_entity(manager, &mut rng) {
                    ledger.destroy(entity);
                    manager.destroy(entity);
                }
            }
        });

        for _ in 0..60 {
            manager.process(Duration::from_millis(16));
            ledger.borrow_mut().flush();
            check(&manager, &handles, &ledger.borrow());

            // Interleave a few idle mutations.
            let mut rng = rng.borrow_mut();
            let mut idle_ledger = ledger.borrow_mut();
            for _ in 0..rng.random_range(0..3) {
                mutate(&mut manager, &mut idle_ledger, &mut rng);
            }
            drop(idle_ledger);
            drop(rng);
            check(&manager, &handles, &ledger.borrow());
        }
    }
}
