use criterion::{criterion_group, criterion_main, Criterion};

use image::imageops::FilterType;
use sketch_export::rendering::{paint, raster};
use sketch_export::surface::memory::rasterize_strokes;
use sketch_export::surface::Stroke;
use sketch_export::{BrushSettings, Color, Compression, DisplayDimensions};

fn scribble(n: usize) -> Vec<Stroke> {
    (0..n)
        .map(|i| {
            let y = 20.0 + (i as f32 * 37.0) % 1000.0;
            Stroke::new(
                BrushSettings::new(Color::rgb(0, 0, 0), 4 + (i as u32 % 12)),
                (0..40).map(|k| (k as f32 * 40.0, y + (k as f32).sin() * 30.0)).collect(),
            )
        })
        .collect()
}

fn bench_composite(c: &mut Criterion) {
    let dims = DisplayDimensions::new(1280, 720).expect("dims");
    let strokes = image::DynamicImage::ImageRgba8(rasterize_strokes(1600, 1000, &scribble(20)));
    let background = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        2048,
        1536,
        image::Rgba([120, 160, 200, 255]),
    ));

    c.bench_function("rasterize_strokes_1600x1000", |b| {
        let s = scribble(20);
        b.iter(|| rasterize_strokes(1600, 1000, &s))
    });

    c.bench_function("composite_1280x720", |b| {
        b.iter(|| {
            let cmds = paint::plan(dims, Color::WHITE, Some(&background), Some(&strokes));
            raster::rasterize(dims, &cmds, FilterType::Triangle)
        })
    });

    c.bench_function("encode_png_best_1280x720", |b| {
        let cmds = paint::plan(dims, Color::WHITE, Some(&background), Some(&strokes));
        let canvas = raster::rasterize(dims, &cmds, FilterType::Triangle);
        b.iter(|| canvas.encode_png(Compression::Best).expect("encode"))
    });
}

criterion_group!(benches, bench_composite);
criterion_main!(benches);
