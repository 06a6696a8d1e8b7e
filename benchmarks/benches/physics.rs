//! Collision pipeline benchmarks (criterion - wall-clock time).
//!
//! Run all:    cargo bench --manifest-path benchmarks/Cargo.toml --bench physics
//! Filter:     cargo bench --manifest-path benchmarks/Cargo.toml --bench physics -- broadphase

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Mat4, Quat, Vec3};
use ricochet::physics::collider::{OrientedBox, Primitive, Sphere};
use ricochet::physics::narrowphase::{
    box_and_box, box_and_sphere, detect_collision, sphere_and_sphere,
};
use ricochet::{
    CollisionData, ContactResolver, GridConfig, IterationBudget, ResolverConfig, SpatialGrid,
};
use ricochet_bench::*;

// ---------------------------------------------------------------------------
// Broadphase
// ---------------------------------------------------------------------------

fn bench_broadphase(c: &mut Criterion) {
    let scenes: [(&str, fn(usize) -> hecs::World); 3] = [
        ("broadphase/uniform_spheres", setup_sphere_world),
        ("broadphase/mixed_shapes", setup_mixed_world),
        ("broadphase/sparse", setup_sparse_world),
    ];
    for (name, setup) in scenes {
        let mut group = c.benchmark_group(name);
        for &n in &[100, 500, 1000, 2000] {
            let world = setup(n);
            let mut grid = SpatialGrid::new(GridConfig::default());
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter(|| grid.find_pairs(&world));
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("broadphase/cell_size");
        let world = setup_sphere_world(1000);
        for &cell_size in &[1.0f32, 2.0, 4.0, 8.0, 16.0] {
            let mut grid = SpatialGrid::new(GridConfig {
                cell_size,
                ..GridConfig::default()
            });
            group.bench_with_input(BenchmarkId::from_parameter(cell_size), &cell_size, |b, _| {
                b.iter(|| grid.find_pairs(&world));
            });
        }
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Narrowphase
// ---------------------------------------------------------------------------

fn bench_narrowphase(c: &mut Criterion) {
    let mut world = hecs::World::new();
    let (ea, eb) = (world.spawn(()), world.spawn(()));

    let sphere_at = |body, x: f32| Sphere {
        body,
        center: Vec3::new(x, 0.0, 0.0),
        radius: 1.0,
    };
    let box_at = |body, transform: Mat4| OrientedBox {
        body,
        transform,
        half_extents: Vec3::splat(1.0),
    };

    {
        let mut group = c.benchmark_group("narrowphase/sphere_sphere");
        let a = sphere_at(ea, 0.0);
        let hit = sphere_at(eb, 1.5);
        let miss = sphere_at(eb, 5.0);
        let mut data = CollisionData::new(4);
        group.bench_function("intersecting", |b| {
            b.iter(|| {
                data.clear();
                sphere_and_sphere(&a, &hit, &mut data)
            });
        });
        group.bench_function("separated", |b| {
            b.iter(|| {
                data.clear();
                sphere_and_sphere(&a, &miss, &mut data)
            });
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/box_box");
        let a = box_at(ea, Mat4::IDENTITY);
        let hit = box_at(eb, Mat4::from_translation(Vec3::new(1.5, 0.0, 0.0)));
        let miss = box_at(eb, Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        let rotated = box_at(
            eb,
            Mat4::from_rotation_translation(Quat::from_rotation_y(0.785), Vec3::new(1.5, 0.0, 0.0)),
        );
        let mut data = CollisionData::new(4);
        for (name, other) in [("intersecting", hit), ("separated", miss), ("rotated", rotated)] {
            group.bench_function(name, |b| {
                b.iter(|| {
                    data.clear();
                    box_and_box(&a, &other, &mut data)
                });
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/box_sphere");
        let cuboid = box_at(ea, Mat4::IDENTITY);
        let hit = sphere_at(eb, 1.5);
        let miss = sphere_at(eb, 5.0);
        let mut data = CollisionData::new(4);
        group.bench_function("intersecting", |b| {
            b.iter(|| {
                data.clear();
                box_and_sphere(&cuboid, &hit, &mut data)
            });
        });
        group.bench_function("separated", |b| {
            b.iter(|| {
                data.clear();
                box_and_sphere(&cuboid, &miss, &mut data)
            });
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/batch");
        for &n in &[100, 500, 1000] {
            let pairs: Vec<_> = (0..n)
                .map(|i| {
                    let x = (i as f32) * 3.0;
                    (
                        Primitive::Sphere(sphere_at(ea, x)),
                        Primitive::Sphere(sphere_at(eb, x + 1.5)),
                    )
                })
                .collect();
            let mut data = CollisionData::new(n);

            group.bench_with_input(BenchmarkId::from_parameter(n), &pairs, |b, pairs| {
                b.iter(|| {
                    data.clear();
                    for (one, two) in pairs {
                        detect_collision(one, two, &mut data);
                    }
                });
            });
        }
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

fn bench_resolver(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("resolver/contact_count");
        for &n in &[10, 50, 100, 500] {
            let mut resolver = ContactResolver::new(ResolverConfig::default());
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
                b.iter_batched(
                    || setup_contacts(n).expect("contact scene setup"),
                    |(mut w, mut m)| resolver.resolve_contacts(&mut m, &mut w, 1.0 / 60.0),
                    criterion::BatchSize::SmallInput,
                );
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("resolver/per_contact_budget");
        for &k in &[1usize, 2, 4, 8] {
            let budget = IterationBudget::PerContact(k);
            let mut resolver = ContactResolver::new(ResolverConfig {
                velocity_iterations: budget,
                position_iterations: budget,
                ..ResolverConfig::default()
            });
            group.bench_with_input(BenchmarkId::from_parameter(k), &k, |b, _| {
                b.iter_batched(
                    || setup_contacts(100).expect("contact scene setup"),
                    |(mut w, mut m)| resolver.resolve_contacts(&mut m, &mut w, 1.0 / 60.0),
                    criterion::BatchSize::SmallInput,
                );
            });
        }
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

fn bench_pipeline(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("pipeline/step");
        group.sample_size(30);
        for &n in &[50, 100, 500, 1000] {
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
                b.iter_batched(
                    || setup_scene(n),
                    |(mut world, mut physics)| {
                        physics.step(&mut world, 1.0 / 60.0);
                    },
                    criterion::BatchSize::LargeInput,
                );
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("pipeline/sustained_10steps");
        group.sample_size(20);
        for &n in &[100, 500] {
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
                b.iter_batched(
                    || setup_scene(n),
                    |(mut world, mut physics)| {
                        for _ in 0..10 {
                            physics.step(&mut world, 1.0 / 60.0);
                        }
                    },
                    criterion::BatchSize::LargeInput,
                );
            });
        }
        group.finish();
    }
}

criterion_group!(
    benches,
    bench_broadphase,
    bench_narrowphase,
    bench_resolver,
    bench_pipeline
);
criterion_main!(benches);
