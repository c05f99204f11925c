//! Benchmarks for field encoding and CPU-side particle maths.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;

use windtrail::field::{FieldDataset, FieldEncoder};
use windtrail::gpu::{draw_shader, update_shader};
use windtrail::kernel::{self, StepParams};
use windtrail::timeline::{FieldTimeline, LoopMode};

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for (width, height) in [(64, 32), (360, 181), (1440, 721)] {
        let samples = FieldDataset::double_gyre(width, height, 2).samples().unwrap();
        group.bench_with_input(
            BenchmarkId::new("two_layers", format!("{width}x{height}")),
            &samples,
            |b, samples| b.iter(|| black_box(FieldEncoder::encode(samples).unwrap())),
        );
    }

    let series = FieldDataset::double_gyre(360, 181, 8).samples().unwrap();
    group.bench_function("series_8", |b| {
        b.iter(|| black_box(FieldEncoder::encode_series(&series).unwrap()))
    });

    group.finish();
}

fn bench_advect(c: &mut Criterion) {
    let mut group = c.benchmark_group("advect");

    let fields = FieldEncoder::encode_series(&FieldDataset::double_gyre(360, 181, 2).samples().unwrap()).unwrap();
    let mut timeline = FieldTimeline::new(fields, 10.0, LoopMode::Loop);
    timeline.advance(3.0);
    let params = StepParams {
        speed_factor: 0.8,
        drop_rate: 0.005,
        drop_rate_bump: 0.02,
        dt: 1.0 / 60.0,
        rand_seed: 0.42,
    };

    for count in [1_000u32, 65_536] {
        group.bench_with_input(BenchmarkId::new("particles", count), &count, |b, &count| {
            let pair = timeline.current_pair();
            let side = (count as f32).sqrt().ceil();
            b.iter(|| {
                for i in 0..count {
                    let tex_pos = Vec2::new((i as f32 % side + 0.5) / side, ((i as f32 / side).floor() + 0.5) / side);
                    black_box(kernel::advect(tex_pos, tex_pos, &pair, &params));
                }
            })
        });
    }

    group.finish();
}

fn bench_shader_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("shader_assembly");
    group.bench_function("update", |b| b.iter(|| black_box(update_shader())));
    group.bench_function("draw", |b| b.iter(|| black_box(draw_shader())));
    group.finish();
}

criterion_group!(benches, bench_encode, bench_advect, bench_shader_assembly);
criterion_main!(benches);
