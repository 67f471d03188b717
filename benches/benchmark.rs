use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, Rgba, RgbaImage};
use lazy_canvas::engine::{
    encode, fit_within, rank_colors, resize_rgba, ColorAnalyzerConfig, GridLayout, ImagePipeline,
    ImageResource, Size,
};
use lazy_canvas::ops::MimeType;
use std::hint::black_box;

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

fn planner(c: &mut Criterion) {
    c.bench_function("fit_within 4000x3000", |b| {
        b.iter(|| fit_within(black_box(Size::new(4000, 3000)), 1920, 1080))
    });

    let mut group = c.benchmark_group("grid_layout");
    for count in [1usize, 9, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let grid = GridLayout::plan(count, Size::new(800, 600), 10).unwrap();
                for index in 0..count {
                    black_box(grid.place(index, Size::new(640, 480)));
                }
            })
        });
    }
    group.finish();
}

fn resize(c: &mut Criterion) {
    let src = gradient(1024, 768);
    c.bench_function("resize_rgba 1024x768 -> 512x384", |b| {
        b.iter(|| resize_rgba(black_box(src.clone()), 512, 384).unwrap())
    });
}

fn colors(c: &mut Criterion) {
    let config = ColorAnalyzerConfig::default();
    let sample = gradient(100, 100);
    c.bench_function("rank_colors 100x100", |b| {
        b.iter(|| rank_colors(black_box(&sample), &config, 5))
    });

    let pipeline = ImagePipeline::new();
    let png = encode(&DynamicImage::ImageRgba8(gradient(640, 480)), MimeType::Png, 1.0).unwrap();
    let resource = ImageResource::new(png, "image/png", "bench.png");
    c.bench_function("dominant_colors 640x480 png", |b| {
        b.iter(|| pipeline.dominant_colors(black_box(&resource), 5).unwrap())
    });
}

criterion_group!(benches, planner, resize, colors);
criterion_main!(benches);
