use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{ImageFormat, Rgb, RgbImage};
use padcount_vision::detectors::{HoughDetector, PadDetector};
use padcount_vision::fusion::{non_max_suppression, ScoredBox};
use padcount_vision::preprocess::preprocess;
use padcount_vision::{DetectionParameters, PadCounter, RadiusBounds};

fn pads_fixture(w: u32, h: u32, step: u32, r: i32) -> RgbImage {
    let mut img = RgbImage::from_pixel(w, h, Rgb([230, 225, 215]));
    for cy in (step / 2..h).step_by(step as usize) {
        for cx in (step / 2..w).step_by(step as usize) {
            for y in cy as i32 - r..=cy as i32 + r {
                for x in cx as i32 - r..=cx as i32 + r {
                    let (dx, dy) = (x - cx as i32, y - cy as i32);
                    if dx * dx + dy * dy <= r * r && x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
                        img.put_pixel(x as u32, y as u32, Rgb([140, 70, 35]));
                    }
                }
            }
        }
    }
    img
}

fn bench_preprocess(c: &mut Criterion) {
    let img = pads_fixture(1280, 960, 160, 30);
    c.bench_function("preprocess_1280x960", |b| {
        b.iter(|| black_box(preprocess(black_box(&img), 7)))
    });
}

fn bench_hough(c: &mut Criterion) {
    let params = DetectionParameters::default();
    let gray = preprocess(&pads_fixture(1280, 960, 160, 30), params.blur_kernel);
    let bounds = RadiusBounds::manual(&params);
    c.bench_function("hough_1280x960_r10_60", |b| {
        b.iter(|| {
            let found = HoughDetector.detect(black_box(&gray), &bounds, &params);
            black_box(found.map(|v| v.len()).unwrap_or_default())
        })
    });
}

fn bench_nms(c: &mut Criterion) {
    let boxes: Vec<ScoredBox> = (0..600)
        .map(|i| ScoredBox::from_circle((i % 40) * 25, (i / 40) * 25, 20, 0.5 + (i % 7) as f32 * 0.05))
        .collect();
    c.bench_function("nms_600_boxes", |b| {
        b.iter(|| black_box(non_max_suppression(black_box(&boxes), 0.35).len()))
    });
}

fn bench_count(c: &mut Criterion) {
    let mut bytes = Cursor::new(Vec::new());
    pads_fixture(1280, 960, 160, 30)
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode fixture");
    let bytes = bytes.into_inner();
    let counter = PadCounter::new(DetectionParameters {
        use_fiducial: false,
        ..Default::default()
    })
    .expect("params");

    let mut group = c.benchmark_group("count");
    group.sample_size(10);
    group.bench_function("count_1280x960_48pads", |b| {
        b.iter(|| black_box(counter.count(black_box(&bytes)).map(|r| r.count).unwrap_or_default()))
    });
    group.finish();
}

criterion_group!(pipeline, bench_preprocess, bench_hough, bench_nms, bench_count);
criterion_main!(pipeline);
