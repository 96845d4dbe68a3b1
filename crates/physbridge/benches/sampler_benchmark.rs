//! # Sampler Benchmark
//!
//! Cost of writing one frame into the scene, per display tick:
//! 1. Plain objects (position + orientation per body)
//! 2. One instanced object (matrix compose per instance, one dirty flag)

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use physbridge::core::{BodyRegistry, TransformBufferPair};
use physbridge::shared::{BodyId, Quaternion};
use physbridge::{apply_frame, InMemoryScene, ShapeKind, Vec3};

fn filled_frame(body_count: usize) -> TransformBufferPair {
    let mut pair = TransformBufferPair::with_slots(body_count);
    pair.prepare(1, body_count);
    for i in 0..body_count {
        pair.set(i, Vec3::new(i as f32, 1.0, 0.0), Quaternion::IDENTITY);
    }
    pair
}

fn bench_plain_objects(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_plain");

    for object_count in [100usize, 1_000, 10_000] {
        let mut scene = InMemoryScene::new();
        let mut registry = BodyRegistry::new();
        let mut bodies = Vec::with_capacity(object_count);
        for _ in 0..object_count {
            let object = scene.spawn();
            registry
                .register(object, ShapeKind::Box, None, Vec::new())
                .expect("fresh object");
            bodies.push(BodyId::single(object));
        }
        let acknowledged = registry.mutations_sent();
        registry.apply_sync(1, acknowledged, &bodies);
        let frame = filled_frame(object_count);

        group.throughput(criterion::Throughput::Elements(object_count as u64));
        group.bench_with_input(BenchmarkId::new("apply_frame", object_count), &frame, |b, frame| {
            b.iter(|| black_box(apply_frame(&registry, frame, &mut scene)));
        });
    }

    group.finish();
}

fn bench_instanced(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_instanced");

    for instance_count in [100u32, 1_000, 10_000] {
        let mut scene = InMemoryScene::new();
        let mut registry = BodyRegistry::new();
        let batch = scene.spawn_instanced(instance_count);
        let ids = registry
            .register(
                batch,
                ShapeKind::Sphere,
                Some(instance_count),
                vec![Vec3::ONE; instance_count as usize],
            )
            .expect("fresh object")
            .group
            .ids()
            .to_vec();
        let acknowledged = registry.mutations_sent();
        registry.apply_sync(1, acknowledged, &ids);
        let frame = filled_frame(instance_count as usize);

        group.throughput(criterion::Throughput::Elements(u64::from(instance_count)));
        group.bench_with_input(BenchmarkId::new("apply_frame", instance_count), &frame, |b, frame| {
            b.iter(|| black_box(apply_frame(&registry, frame, &mut scene)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_plain_objects, bench_instanced);
criterion_main!(benches);
