//! Border cropping benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use figexport::{crop_transparent, BorderCropper, CropAmounts, CropOptions, Padding};
use image::{Rgb, RgbImage, Rgba, RgbaImage};

/// White canvas with a centered block covering half of each dimension
fn figure(size: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(size, size, Rgb([255, 255, 255]));
    for y in size / 4..size * 3 / 4 {
        for x in size / 4..size * 3 / 4 {
            img.put_pixel(x, y, Rgb([20, 40, 200]));
        }
    }
    img
}

fn transparent_figure(size: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
    for y in size / 4..size * 3 / 4 {
        for x in size / 4..size * 3 / 4 {
            img.put_pixel(x, y, Rgba([20, 40, 200, 180]));
        }
    }
    img
}

fn bench_crop_borders(c: &mut Criterion) {
    let mut group = c.benchmark_group("crop_borders");
    for size in [256u32, 1024, 2048] {
        let frames = vec![figure(size)];
        let options = CropOptions::builder()
            .background(Rgb([255, 255, 255]))
            .padding(Padding::absolute(10))
            .build();
        group.bench_with_input(BenchmarkId::from_parameter(size), &frames, |b, frames| {
            b.iter(|| BorderCropper::crop_borders(black_box(frames.as_slice()), &options).unwrap())
        });
    }
    group.finish();
}

fn bench_crop_sampled(c: &mut Criterion) {
    let frames = vec![figure(1024)];
    let options = CropOptions::builder().padding(Padding::fraction(0.05)).build();
    c.bench_function("crop_borders_sampled_1024", |b| {
        b.iter(|| BorderCropper::crop_borders(black_box(frames.as_slice()), &options).unwrap())
    });
}

fn bench_crop_transparent(c: &mut Criterion) {
    let img = transparent_figure(1024);
    c.bench_function("crop_transparent_1024", |b| {
        b.iter(|| crop_transparent(black_box(img.clone()), Padding::NONE, CropAmounts::auto()).unwrap())
    });
}

criterion_group!(
    benches,
    bench_crop_borders,
    bench_crop_sampled,
    bench_crop_transparent
);
criterion_main!(benches);
