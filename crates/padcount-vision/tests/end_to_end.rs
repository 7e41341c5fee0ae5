use std::io::Cursor;
use std::sync::Arc;
use std::thread;

use image::{ImageFormat, Rgb, RgbImage};
use padcount_fiducial::{builtins::DICT_4X4_50, render_marker};
use padcount_vision::{
    count_pads, Backend, DetectionParameters, PadCounter, RadiusSource,
};

fn fill_disc(img: &mut RgbImage, cx: i32, cy: i32, r: i32, color: Rgb<u8>) {
    for y in (cy - r).max(0)..=(cy + r).min(img.height() as i32 - 1) {
        for x in (cx - r).max(0)..=(cx + r).min(img.width() as i32 - 1) {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy <= r * r {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

fn paste_marker(img: &mut RgbImage, id: u32, side: usize, x0: u32, y0: u32) {
    let marker = render_marker(&DICT_4X4_50, id, side, 0).expect("render marker");
    for y in 0..side {
        for x in 0..side {
            let v = marker.data[y * side + x];
            img.put_pixel(x0 + x as u32, y0 + y as u32, Rgb([v, v, v]));
        }
    }
}

fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
    buf.into_inner()
}

const PAD_CENTRES: [(i32, i32); 6] = [
    (300, 400),
    (700, 900),
    (1100, 500),
    (500, 1500),
    (1300, 1400),
    (1800, 1800),
];

fn pads_canvas() -> RgbImage {
    let mut img = RgbImage::from_pixel(2048, 2048, Rgb([255, 255, 255]));
    for (x, y) in PAD_CENTRES {
        fill_disc(&mut img, x, y, 30, Rgb([0, 0, 0]));
    }
    img
}

#[cfg(feature = "full")]
#[test]
fn six_discs_without_marker() {
    let bytes = encode_png(&pads_canvas());
    let params = DetectionParameters {
        min_radius_px: 10,
        max_radius_px: 60,
        ..Default::default()
    };
    let result = count_pads(&bytes, &params).expect("count");

    assert!(!result.calibration.found);
    assert_eq!(result.calibration.px_per_mm, None);
    assert_eq!(result.radius_bounds.source, RadiusSource::Manual);
    assert_eq!(result.backend, Backend::Full);
    assert_eq!(result.method_counts.hough, 6, "{:?}", result.method_counts);
    assert_eq!(result.method_counts.contour, 6, "{:?}", result.method_counts);
    assert_eq!(result.count, 6);
    assert_eq!(result.count, result.detections.len());

    for (x, y) in PAD_CENTRES {
        assert!(
            result
                .detections
                .iter()
                .any(|d| (d.x - x).abs() <= 4 && (d.y - y).abs() <= 4),
            "no detection near ({x}, {y}): {:?}",
            result.detections
        );
    }
    assert!(image::load_from_memory(&result.preview_image).is_ok());
}

#[cfg(feature = "full")]
#[test]
fn marker_sets_scale_and_radius_bounds() {
    let mut img = pads_canvas();
    paste_marker(&mut img, 7, 400, 1500, 150);
    let bytes = encode_png(&img);

    let params = DetectionParameters {
        marker_size_mm: 50.0,
        pad_diameter_mm: 7.5,
        ..Default::default()
    };
    let result = count_pads(&bytes, &params).expect("count");

    assert!(result.calibration.found);
    assert_eq!(result.calibration.marker_id, Some(7));
    let ppm = result.calibration.px_per_mm.expect("scale");
    assert!((ppm - 8.0).abs() < 0.05, "px_per_mm = {ppm}");
    assert_eq!(result.radius_bounds.source, RadiusSource::Calibrated);
    assert_eq!(
        (result.radius_bounds.min_radius_px, result.radius_bounds.max_radius_px),
        (22, 37)
    );
    let counts = result.method_counts;
    assert_eq!(
        (counts.hough, counts.contour, counts.template),
        (6, 6, 6),
        "{counts:?}"
    );
    assert_eq!(result.count, 6);

    // Nothing inside the marker square counts as a pad.
    let corners = result.calibration.corners.expect("corners");
    let (x0, x1) = corners
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
    let (y0, y1) = corners
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    assert!(x1 - x0 > 390.0 && y1 - y0 > 390.0);
    for d in &result.detections {
        let (x, y) = (d.x as f32, d.y as f32);
        assert!(
            !(x0..=x1).contains(&x) || !(y0..=y1).contains(&y),
            "detection inside the marker: {d:?}"
        );
    }
    for (x, y) in PAD_CENTRES {
        assert!(
            result
                .detections
                .iter()
                .any(|d| (d.x - x).abs() <= 4 && (d.y - y).abs() <= 4),
            "no detection near ({x}, {y}): {:?}",
            result.detections
        );
    }
}

#[test]
fn fallback_backend_estimates_from_area() {
    let bytes = encode_png(&pads_canvas());
    let params = DetectionParameters {
        use_fiducial: false,
        ..Default::default()
    };
    let result = PadCounter::new(params)
        .expect("params")
        .with_backend(Backend::Fallback)
        .count(&bytes)
        .expect("count");

    assert_eq!(result.backend, Backend::Fallback);
    assert!(result.detections.is_empty());
    assert_eq!(result.method_counts.total(), 0);
    // six r=30 discs over the area of one r=35 disc
    assert_eq!(result.count, 4);

    let json: serde_json::Value =
        serde_json::from_str(&result.to_json_pretty().expect("json")).expect("parse");
    assert_eq!(json["backend"], "fallback");
    assert!(json.get("preview_image").is_none());
}

#[test]
fn shared_counter_matches_sequential_runs() {
    let frames: Vec<Vec<u8>> = (0..4)
        .map(|i| {
            let mut img = RgbImage::from_pixel(640, 480, Rgb([235, 230, 220]));
            for k in 0..=i {
                fill_disc(&mut img, 80 + 140 * k, 240, 28, Rgb([150, 70, 30]));
            }
            encode_png(&img)
        })
        .collect();

    let params = DetectionParameters {
        use_fiducial: false,
        min_radius_px: 15,
        max_radius_px: 40,
        ..Default::default()
    };
    let counter = Arc::new(PadCounter::new(params).expect("params"));
    let sequential: Vec<_> = frames
        .iter()
        .map(|f| counter.count(f).expect("count"))
        .collect();

    let handles: Vec<_> = frames
        .into_iter()
        .map(|f| {
            let counter = Arc::clone(&counter);
            thread::spawn(move || counter.count(&f).expect("count"))
        })
        .collect();
    for (handle, expected) in handles.into_iter().zip(&sequential) {
        let got = handle.join().expect("thread");
        assert_eq!(got.count, expected.count);
        assert_eq!(got.detections, expected.detections);
        assert_eq!(got.method_counts, expected.method_counts);
    }
}
