use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tessera::prelude::*;

#[derive(Debug, Clone, Copy)]
struct Position(f32, f32);

#[derive(Debug, Clone, Copy)]
struct Velocity(f32, f32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Cell(i16, i16);

#[derive(Debug)]
struct Frozen;

const POPULATION: usize = 10_000;

fn populated_manager() -> (Manager, QueryHandle<FilterQuery>) {
    let mut rng = SmallRng::seed_from_u64(42);
    let mut manager = Manager::new();
    manager.register_component::<Position>();
    manager.register_component::<Velocity>();
    manager.register_component::<Cell>();
    manager.register_component::<Frozen>();

    for _ in 0..POPULATION {
        let frozen = rng.random_bool(0.1);
        let velocity = Velocity(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0));
        manager.create_with(|manager, entity| {
            manager.add_component(entity, Position(0.0, 0.0));
            manager.add_component(entity, velocity);
            manager.add_component(entity, Cell(0, 0));
            if frozen {
                manager.add_component(entity, Frozen);
            }
        });
    }

    let moving = manager
        .register_query(FilterQuery::new(
            QueryFilter::new()
                .with::<Position>()
                .with::<Velocity>()
                .without::<Frozen>(),
        ))
        .unwrap();
    manager
        .register_query(MultimapQuery::<Cell>::new())
        .unwrap();
    (manager, moving)
}

pub fn criterion_benchmark(criterion: &mut Criterion) {
    let mut criterion = criterion.benchmark_group("tick");

    let (mut manager, moving) = populated_manager();
    manager.register_system(QuerySystem::new(moving, |manager, entities, delta| {
        let seconds = delta.as_secs_f32();
        for &entity in entities {
            let (Some(&Position(x, y)), Some(&Velocity(dx, dy))) = (
                manager.get_component::<Position>(entity),
                manager.get_component::<Velocity>(entity),
            ) else {
                continue;
            };
            let position = Position(x + dx * seconds, y + dy * seconds);
            manager.add_component(entity, position);
            manager.add_component(entity, Cell(position.0 as i16, position.1 as i16));
        }
    }));

    criterion.bench_function("movement_with_keyed_query", |bencher| {
        bencher.iter(|| {
            manager.process(black_box(Duration::from_millis(16)));
        });
    });

    let (mut manager, moving) = populated_manager();
    let mut rng = SmallRng::seed_from_u64(7);
    criterion.bench_function("toggle_excluded_component", |bencher| {
        bencher.iter(|| {
            let entity = manager
                .entities()
                .nth(rng.random_range(0..POPULATION))
                .unwrap();
            if manager.has_component::<Frozen>(entity) {
                manager.remove_component::<Frozen>(entity);
            } else {
                manager.add_component(entity, Frozen);
            }
            black_box(manager.query(moving).unwrap().len());
        });
    });

    criterion.bench_function("register_query_full_scan", |bencher| {
        bencher.iter(|| {
            let handle = manager
                .register_query(FilterQuery::new(QueryFilter::new().with::<Velocity>()))
                .unwrap();
            black_box(manager.unregister_query(handle));
        });
    });

    criterion.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
