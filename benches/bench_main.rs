use std::hint::black_box;

use bevy_sylva_tree::options::TreeOptions;
use bevy_sylva_tree::presets::PresetLibrary;
use bevy_sylva_tree::{mesh, skeleton, wind};
use criterion::{Criterion, criterion_group, criterion_main};

fn bench_skeleton(c: &mut Criterion) {
    let options = TreeOptions::default();
    c.bench_function("skeleton_default", |b| {
        b.iter(|| skeleton::build(black_box(&options)))
    });
}

fn bench_emit(c: &mut Criterion) {
    let options = TreeOptions::default();
    let skeleton = skeleton::build(&options).unwrap();
    c.bench_function("emit_default", |b| {
        b.iter(|| mesh::emit(black_box(&skeleton), black_box(&options)))
    });
}

fn bench_generate_oak_large(c: &mut Criterion) {
    let options = PresetLibrary::builtin().unwrap().load("Oak Large");
    c.bench_function("generate_oak_large", |b| {
        b.iter(|| {
            let sk = skeleton::build(black_box(&options)).unwrap();
            mesh::emit(&sk, &options)
        })
    });
}

fn bench_wind_update(c: &mut Criterion) {
    let options = TreeOptions::default();
    let sk = skeleton::build(&options).unwrap();
    let mut geometry = mesh::emit(&sk, &options).unwrap();
    let mut t = 0.0f32;
    c.bench_function("wind_update_default", |b| {
        b.iter(|| {
            t += 0.016;
            wind::apply(black_box(&mut geometry), t, &options.wind)
        })
    });
}

criterion_group!(
    benches,
    bench_skeleton,
    bench_emit,
    bench_generate_oak_large,
    bench_wind_update
);
criterion_main!(benches);
