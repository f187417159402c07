#![allow(missing_docs)]

use atomstream::gpu::pack_frame;
use atomstream::selection::compute_groups;
use atomstream::trajectory::{synth, Trajectory};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn sample(num_atoms: usize) -> Trajectory {
    let doc = synth::nanocluster(num_atoms, 1, 7);
    match Trajectory::from_document(doc) {
        Ok(trajectory) => trajectory,
        Err(e) => panic!("sample trajectory rejected: {e}"),
    }
}

fn grouping_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_groups");
    for &n in &[1_000usize, 10_000, 50_000] {
        let trajectory = sample(n);
        let frame = &trajectory.frames()[0];
        let _ = group.bench_with_input(BenchmarkId::from_parameter(n), frame, |b, frame| {
            b.iter(|| black_box(compute_groups(black_box(frame))));
        });
    }
    group.finish();
}

fn packing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack_frame");
    for &n in &[1_000usize, 10_000, 50_000] {
        let trajectory = sample(n);
        let frame = &trajectory.frames()[0];
        let _ = group.bench_with_input(BenchmarkId::from_parameter(n), frame, |b, frame| {
            b.iter(|| black_box(pack_frame(black_box(frame), 0.25)));
        });
    }
    group.finish();
}

fn playback_json_benchmark(c: &mut Criterion) {
    let json = match serde_json::to_string(&synth::helix(20, 50)) {
        Ok(json) => json,
        Err(e) => panic!("sample serialization failed: {e}"),
    };
    let _ = c.bench_function("decode_helix_50_frames", |b| {
        b.iter(|| black_box(Trajectory::from_json(black_box(&json)).is_ok()));
    });
}

criterion_group!(
    benches,
    grouping_benchmark,
    packing_benchmark,
    playback_json_benchmark
);
criterion_main!(benches);
